//! Everything specific to the target site, kept together as declarative
//! data: the recorded purchase flow, the consent popups it trips over,
//! the skip markers, the card-field bindings and the login probe. The
//! runner itself never hardcodes any of this.

use std::time::Duration;

use crate::login::LoginProbe;
use crate::runner::{FieldMarkers, RunnerConfig};
use crate::types::{Locator, Step};

/// Landing page that exposes whether the profile is signed in.
pub const ACCOUNT_URL: &str = "https://www.flipkart.com/account/?rd=0&link=home_account";

/// Either of these on the account page means the session is signed in.
pub fn login_markers() -> Vec<Locator> {
    vec![
        Locator::parse("xpath=//*[contains(text(), 'Profile Information')]"),
        Locator::parse("css=.PbekyG.xrBehW"),
    ]
}

/// Consent/continuation dialogs that interpose themselves mid-flow.
pub fn popup_locators() -> Vec<Locator> {
    vec![
        Locator::parse("xpath=//*[@id=\"container\"]/div/div[1]/div/div/button"),
        Locator::parse("xpath=//button[contains(text(), \"Accept\") and contains(text(), \"Continue\")]"),
        Locator::parse("xpath=//button[contains(text(), \"Accept & Continue\")]"),
        Locator::parse("xpath=//button[contains(text(), \"ACCEPT\") and contains(text(), \"CONTINUE\")]"),
    ]
}

pub fn login_probe() -> LoginProbe {
    LoginProbe {
        account_url: ACCOUNT_URL.to_string(),
        markers: login_markers(),
        popups: popup_locators(),
        settle: Duration::from_secs(3),
        poll: Duration::from_secs(5),
        max_attempts: 120,
    }
}

/// Runner knobs tuned for the recorded flow.
pub fn runner_config() -> RunnerConfig {
    RunnerConfig {
        popup_locators: popup_locators(),
        volatile_url_markers: vec!["token=".to_string(), "payments?".to_string()],
        // One recorded confirmation control never resolves reliably and
        // stalls the flow; the page works without it.
        flaky_control_markers: vec!["container\"]/div/div/div/div/button".to_string()],
        bindings: FieldMarkers {
            card_number: vec!["cc-input".to_string()],
            expiry: vec!["cards".to_string(), "div[2]/div/input".to_string()],
            cvv: vec!["cvv-input".to_string()],
        },
        ..RunnerConfig::default()
    }
}

/// The recorded purchase flow, versioned here in code. Template data: the
/// bind pass fills the product URL and the card values before a run, and
/// empty values stay empty so those fields are left for manual entry.
pub fn purchase_steps() -> Vec<Step> {
    vec![
        Step::navigate("", "Opening product page"),
        Step::click(
            "xpath=//*[@id=\"container\"]/div/div[3]/div/div/div[2]/div/ul/li[2]/form/button",
            &[
                "xpath=//button[@type='button']",
                "xpath=//form/button",
                "css=#container > div > div._39kFie.N3De93.JxFEK3._48O0EI > div.DOjaWF.YJG4Cf > div.DOjaWF.gdgoEp.col-5-12.MfqIAz > div:nth-child(2) > div > ul > li.col.col-6-12.flex > form > button",
            ],
            "Clicking Buy Now button",
        ),
        Step::click(
            "xpath=//*[@id=\"CNTCTC3B8D4BCB4674CB8855B4905E\"]/button",
            &[
                "xpath=//div[2]/div/div/button",
                "css=#CNTCTC3B8D4BCB4674CB8855B4905E > button",
            ],
            "Clicking contact button",
        ),
        Step::click(
            "xpath=//*[@id=\"to-payment\"]/button",
            &["xpath=//span[2]/button", "css=#to-payment > button"],
            "Proceeding to payment",
        ),
        Step::click_and_wait(
            "xpath=//*[@id=\"container\"]/div/div/div/div/button",
            &[
                "xpath=//div/div/div/div/div/button",
                "css=#container > div > div._1TWLMK.icF5zO > div > div > button",
            ],
            "Handling payment page (Accept & Continue)",
        ),
        Step::click(
            "xpath=//*[@id=\"container\"]/div[2]/div/section/div/div/div/section/div/div[2]/div/div/div/div/div/div/span",
            &[
                "xpath=//div[2]/div/div/div/div/div/div/span",
                "css=#container > div.Wr52Y1 > div > section.iGRJtT > div > div > div > section.RMFVQw > div > div:nth-child(2) > div:nth-child(1) > div > div > div > div > div.eZcpWE.rC9zAr > span",
            ],
            "Selecting credit card payment method",
        ),
        Step::click(
            "id=cc-input",
            &[
                "xpath=//*[@id=\"cc-input\"]",
                "xpath=//input[@id='cc-input']",
                "xpath=//input",
                "css=#cc-input",
            ],
            "Clicking card number field",
        ),
        Step::type_text(
            "id=cc-input",
            &[
                "xpath=//*[@id=\"cc-input\"]",
                "xpath=//input[@id='cc-input']",
                "xpath=//input",
                "css=#cc-input",
            ],
            "",
            "Entering card number",
        ),
        Step::click(
            "xpath=//*[@id=\"cards\"]/div/div[2]/div/input",
            &[
                "xpath=//input[@value='']",
                "xpath=//div[2]/div/input",
                "css=#cards > div > div.aTGip4 > div._1GKNyd.chD0T3 > input",
            ],
            "Clicking expiry date field",
        ),
        Step::type_text(
            "xpath=//*[@id=\"cards\"]/div/div[2]/div/input",
            &[
                "xpath=//div[2]/div/input",
                "css=#cards > div > div.aTGip4 > div._1GKNyd.chD0T3 > input",
            ],
            "",
            "Entering expiry date",
        ),
        Step::type_text(
            "id=cvv-input",
            &[
                "xpath=//*[@id=\"cvv-input\"]",
                "xpath=//input[@id='cvv-input']",
                "xpath=//div[2]/div[2]/div/input",
                "css=#cvv-input",
            ],
            "",
            "Entering CVV",
        ),
        Step::click(
            "xpath=//*[@id=\"cards\"]/div/button",
            &["xpath=//div/button", "css=#cards > div > button"],
            "Clicking final payment button",
        ),
    ]
}
