use std::thread;
use std::time::Duration;

use url::Url;

use crate::driver::{Driver, ElementHandle};
use crate::types::{Command, Locator, ResolvedInputs, RunReport, Step, StepOutcome, StepReport};

/// Markers that pick the card fields out of the script during the bind
/// pass. A step matches when its target expression contains every listed
/// fragment; an empty list matches nothing.
#[derive(Debug, Clone, Default)]
pub struct FieldMarkers {
    pub card_number: Vec<String>,
    pub expiry: Vec<String>,
    pub cvv: Vec<String>,
}

impl FieldMarkers {
    fn matches(markers: &[String], locator: &Locator) -> bool {
        !markers.is_empty() && markers.iter().all(|m| locator.expression().contains(m))
    }
}

/// Runner knobs. Everything page-specific - popup buttons, skip markers,
/// field bindings, pacing - lives here so the runner logic itself stays
/// site-agnostic.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Bounded wait per locator attempt, primary and fallbacks alike.
    pub element_timeout: Duration,
    /// Consent/continuation buttons probed before risky interactions.
    pub popup_locators: Vec<Locator>,
    /// Navigate targets containing any of these were captured from an
    /// earlier session and are never safe to load again.
    pub volatile_url_markers: Vec<String>,
    /// Click-and-wait targets containing any of these are skipped outright.
    pub flaky_control_markers: Vec<String>,
    pub bindings: FieldMarkers,
    pub post_navigate_pause: Duration,
    pub post_click_pause: Duration,
    pub click_and_wait_pause: Duration,
    pub post_type_pause: Duration,
    pub popup_pause: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            element_timeout: Duration::from_secs(5),
            popup_locators: Vec::new(),
            volatile_url_markers: Vec::new(),
            flaky_control_markers: Vec::new(),
            bindings: FieldMarkers::default(),
            post_navigate_pause: Duration::from_millis(1500),
            post_click_pause: Duration::from_millis(500),
            click_and_wait_pause: Duration::from_secs(2),
            post_type_pause: Duration::from_millis(500),
            popup_pause: Duration::from_millis(1500),
        }
    }
}

/// One-time substitution pass: the user's destination URL into the first
/// navigate step, the card inputs into the matching type steps. Template
/// steps carry placeholders until this runs.
pub fn bind_inputs(steps: &mut [Step], inputs: &ResolvedInputs, bindings: &FieldMarkers) {
    if let Some(Command::Navigate { url }) = steps
        .iter_mut()
        .map(|s| &mut s.command)
        .find(|c| matches!(c, Command::Navigate { .. }))
    {
        *url = inputs.target_url.clone();
    }

    for step in steps.iter_mut() {
        if let Command::Type { target, value, .. } = &mut step.command {
            if FieldMarkers::matches(&bindings.card_number, target) {
                *value = inputs.card_number.clone();
            } else if FieldMarkers::matches(&bindings.expiry, target) {
                *value = inputs.expiry.clone();
            } else if FieldMarkers::matches(&bindings.cvv, target) {
                *value = inputs.cvv.clone();
            }
        }
    }
}

/// Probe the configured consent buttons and dismiss the first one that is
/// actually on screen. At most one popup is handled per call; no match is
/// the normal case, not an error.
pub fn suppress_popups<D: Driver>(driver: &D, locators: &[Locator], pause: Duration) {
    for locator in locators {
        let Ok(element) = driver.find_element(locator, Duration::ZERO) else {
            continue;
        };
        if driver.click(&element).is_ok() {
            eprintln!("[Runner] Dismissed popup via {locator}");
            if !pause.is_zero() {
                thread::sleep(pause);
            }
            return;
        }
    }
}

/// Executes the scripted steps against a live session, with selector
/// fallback and transient-popup suppression.
pub struct StepRunner<'a, D: Driver> {
    driver: &'a D,
    config: RunnerConfig,
}

impl<'a, D: Driver> StepRunner<'a, D> {
    pub fn new(driver: &'a D, config: RunnerConfig) -> Self {
        Self { driver, config }
    }

    /// Run the whole script. Every step yields an outcome and the sequence
    /// always reaches the end; a failed step is left for the user to
    /// finish by hand rather than aborting mid-purchase.
    pub fn run(&self, mut steps: Vec<Step>, inputs: &ResolvedInputs) -> RunReport {
        bind_inputs(&mut steps, inputs, &self.config.bindings);

        let mut report = RunReport::default();
        for (index, step) in steps.iter().enumerate() {
            println!("{}. {}", index + 1, step.description);
            let outcome = self.execute(step);
            match &outcome {
                StepOutcome::Success => println!("   done"),
                StepOutcome::Skipped(reason) => println!("   skipped: {reason}"),
                StepOutcome::ValidationError(reason) => println!("   failed: {reason} (continuing)"),
                StepOutcome::Timeout => println!("   failed: element not found (continuing)"),
                StepOutcome::InteractionError(reason) => println!("   failed: {reason} (continuing)"),
            }
            report.steps.push(StepReport {
                index,
                description: step.description.clone(),
                outcome,
            });
        }
        report
    }

    fn execute(&self, step: &Step) -> StepOutcome {
        if let Some(reason) = self.skip_reason(&step.command) {
            return StepOutcome::Skipped(reason);
        }
        match &step.command {
            Command::Navigate { url } => self.navigate(url),
            Command::Click { target, fallbacks } => self.click(target, fallbacks, false),
            Command::ClickAndWait { target, fallbacks } => self.click(target, fallbacks, true),
            Command::Type {
                target,
                fallbacks,
                value,
            } => self.type_into(target, fallbacks, value),
        }
    }

    fn skip_reason(&self, command: &Command) -> Option<String> {
        match command {
            Command::Navigate { url } => self
                .config
                .volatile_url_markers
                .iter()
                .any(|m| url.contains(m.as_str()))
                .then(|| "session-specific URL from an earlier run".to_string()),
            Command::ClickAndWait { target, .. } => self
                .config
                .flaky_control_markers
                .iter()
                .any(|m| target.expression().contains(m.as_str()))
                .then(|| "known-unreliable confirmation control".to_string()),
            _ => None,
        }
    }

    fn navigate(&self, url: &str) -> StepOutcome {
        let url = match validate_url(url) {
            Ok(url) => url,
            Err(reason) => return StepOutcome::ValidationError(reason),
        };
        if let Err(e) = self.driver.navigate(&url) {
            return StepOutcome::InteractionError(format!("{e:#}"));
        }
        self.pause(self.config.post_navigate_pause);
        self.suppress_popups();
        StepOutcome::Success
    }

    fn click(&self, target: &Locator, fallbacks: &[Locator], and_wait: bool) -> StepOutcome {
        self.suppress_popups();
        let Some(element) = self.resolve(target, fallbacks) else {
            return StepOutcome::Timeout;
        };
        if let Err(e) = self.driver.click(&element) {
            return StepOutcome::InteractionError(format!("{e:#}"));
        }
        if and_wait {
            self.pause(self.config.click_and_wait_pause);
            // Page transitions can surface fresh consent dialogs.
            self.suppress_popups();
        } else {
            self.pause(self.config.post_click_pause);
        }
        StepOutcome::Success
    }

    fn type_into(&self, target: &Locator, fallbacks: &[Locator], value: &str) -> StepOutcome {
        if value.is_empty() {
            // Never touch the field; whatever is in it stays for the user.
            return StepOutcome::Skipped("field left for manual entry".to_string());
        }
        let Some(element) = self.resolve(target, fallbacks) else {
            return StepOutcome::Timeout;
        };
        if let Err(e) = self.driver.clear_and_type(&element, value) {
            return StepOutcome::InteractionError(format!("{e:#}"));
        }
        self.pause(self.config.post_type_pause);
        StepOutcome::Success
    }

    /// Primary first, then each fallback in order, each with its own
    /// bounded wait. The recorded markup drifts between sessions, so a
    /// single selector is not enough.
    fn resolve(&self, target: &Locator, fallbacks: &[Locator]) -> Option<ElementHandle> {
        std::iter::once(target)
            .chain(fallbacks.iter())
            .find_map(|locator| {
                self.driver
                    .find_element(locator, self.config.element_timeout)
                    .ok()
            })
    }

    fn suppress_popups(&self) {
        suppress_popups(self.driver, &self.config.popup_locators, self.config.popup_pause);
    }

    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Non-empty, http(s), and a real host.
fn validate_url(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty URL".to_string());
    }
    if !raw.starts_with("http://") && !raw.starts_with("https://") {
        return Err(format!("unsupported URL scheme: {}", clip(raw, 50)));
    }
    let parsed = Url::parse(raw).map_err(|e| format!("invalid URL: {e}"))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(raw.to_string())
}

fn clip(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{Call, FakeDriver};

    fn quiet_config() -> RunnerConfig {
        RunnerConfig {
            post_navigate_pause: Duration::ZERO,
            post_click_pause: Duration::ZERO,
            click_and_wait_pause: Duration::ZERO,
            post_type_pause: Duration::ZERO,
            popup_pause: Duration::ZERO,
            ..RunnerConfig::default()
        }
    }

    fn card_bindings() -> FieldMarkers {
        FieldMarkers {
            card_number: vec!["cc-input".to_string()],
            expiry: vec!["cards".to_string(), "div[2]/div/input".to_string()],
            cvv: vec!["cvv-input".to_string()],
        }
    }

    #[test]
    fn fallbacks_are_tried_in_order_and_first_match_wins() {
        let driver = FakeDriver::new()
            .without("id=buy")
            .without("xpath=//form/button");
        let runner = StepRunner::new(&driver, quiet_config());
        let steps = vec![Step::click(
            "id=buy",
            &["xpath=//form/button", "css=#buy", "xpath=//button"],
            "Clicking Buy Now button",
        )];

        let report = runner.run(steps, &ResolvedInputs::default());

        assert!(report.steps[0].outcome.succeeded());
        assert_eq!(
            driver.finds(),
            vec!["id=buy", "xpath=//form/button", "css=#buy"]
        );
        assert_eq!(driver.clicks(), vec!["css=#buy"]);
    }

    #[test]
    fn exhausted_fallbacks_report_timeout_and_run_continues() {
        let driver = FakeDriver::new()
            .without("id=buy")
            .without("xpath=//button");
        let runner = StepRunner::new(&driver, quiet_config());
        let steps = vec![
            Step::click("id=buy", &["xpath=//button"], "Clicking Buy Now button"),
            Step::click("id=next", &[], "Proceeding to payment"),
        ];

        let report = runner.run(steps, &ResolvedInputs::default());

        assert_eq!(report.steps[0].outcome, StepOutcome::Timeout);
        assert!(report.steps[1].outcome.succeeded());
        assert_eq!(driver.clicks(), vec!["id=next"]);
    }

    #[test]
    fn empty_type_value_is_a_no_op_success() {
        let driver = FakeDriver::new();
        let runner = StepRunner::new(&driver, quiet_config());
        let steps = vec![Step::type_text("id=cc-input", &[], "", "Entering card number")];

        let report = runner.run(steps, &ResolvedInputs::default());

        assert!(report.steps[0].outcome.succeeded());
        assert_eq!(driver.interactions(), 0);
        assert!(driver.finds().is_empty());
    }

    #[test]
    fn volatile_navigate_targets_are_skipped_without_navigation() {
        let driver = FakeDriver::new();
        let config = RunnerConfig {
            volatile_url_markers: vec!["token=".to_string(), "payments?".to_string()],
            ..quiet_config()
        };
        let runner = StepRunner::new(&driver, config);
        let steps = vec![
            Step::navigate(
                "https://shop.example/checkout?token=abc123",
                "Opening checkout",
            ),
            Step::navigate("https://shop.example/payments?flow=1", "Opening payment"),
        ];
        // The bind pass rewrites the first navigate target, so the inputs
        // must carry the volatile URL for it to stay skippable.
        let inputs = ResolvedInputs {
            target_url: "https://shop.example/checkout?token=abc123".to_string(),
            ..Default::default()
        };

        let report = runner.run(steps, &inputs);

        assert!(report.steps.iter().all(|s| s.outcome.succeeded()));
        assert_eq!(driver.interactions(), 0);
    }

    #[test]
    fn flaky_click_and_wait_control_is_skipped() {
        let driver = FakeDriver::new();
        let config = RunnerConfig {
            flaky_control_markers: vec!["container\"]/div/div/div/div/button".to_string()],
            ..quiet_config()
        };
        let runner = StepRunner::new(&driver, config);
        let steps = vec![Step::click_and_wait(
            "xpath=//*[@id=\"container\"]/div/div/div/div/button",
            &[],
            "Handling payment page",
        )];

        let report = runner.run(steps, &ResolvedInputs::default());

        assert!(matches!(report.steps[0].outcome, StepOutcome::Skipped(_)));
        assert_eq!(driver.interactions(), 0);
    }

    #[test]
    fn malformed_urls_fail_validation_without_navigating() {
        let driver = FakeDriver::new();
        let runner = StepRunner::new(&driver, quiet_config());
        for bad in ["", "ftp://shop.example/item", "https://"] {
            let steps = vec![Step::navigate(bad, "Opening product page")];
            let report = runner.run(
                steps,
                &ResolvedInputs {
                    target_url: bad.to_string(),
                    ..Default::default()
                },
            );
            assert!(
                matches!(report.steps[0].outcome, StepOutcome::ValidationError(_)),
                "{bad:?} should fail validation"
            );
        }
        assert_eq!(driver.interactions(), 0);
    }

    #[test]
    fn bind_pass_fills_url_and_card_fields() {
        let mut steps = vec![
            Step::navigate("", "Opening product page"),
            Step::type_text("id=cc-input", &[], "", "Entering card number"),
            Step::type_text(
                "xpath=//*[@id=\"cards\"]/div/div[2]/div/input",
                &[],
                "",
                "Entering expiry date",
            ),
            Step::type_text("id=cvv-input", &[], "", "Entering CVV"),
        ];
        let inputs = ResolvedInputs {
            target_url: "https://shop.example/item".to_string(),
            card_number: "4111111111111111".to_string(),
            expiry: "03 / 34".to_string(),
            cvv: "111".to_string(),
        };

        bind_inputs(&mut steps, &inputs, &card_bindings());

        assert!(matches!(
            &steps[0].command,
            Command::Navigate { url } if url == "https://shop.example/item"
        ));
        assert!(matches!(
            &steps[1].command,
            Command::Type { value, .. } if value == "4111111111111111"
        ));
        assert!(matches!(
            &steps[2].command,
            Command::Type { value, .. } if value == "03 / 34"
        ));
        assert!(matches!(
            &steps[3].command,
            Command::Type { value, .. } if value == "111"
        ));
    }

    #[test]
    fn popup_suppression_dismisses_only_the_first_match() {
        let driver = FakeDriver::new().without("xpath=//button[text()='Accept']");
        let popups = vec![
            Locator::parse("xpath=//button[text()='Accept']"),
            Locator::parse("css=.consent-continue"),
            Locator::parse("css=.consent-later"),
        ];

        suppress_popups(&driver, &popups, Duration::ZERO);

        assert_eq!(driver.clicks(), vec!["css=.consent-continue"]);
        // The scan stopped after the first dismissal.
        assert_eq!(driver.finds().len(), 2);
    }

    #[test]
    fn scenario_fallback_click_completes_all_steps() {
        let driver = FakeDriver::new().without("id=buy");
        let config = RunnerConfig {
            bindings: card_bindings(),
            ..quiet_config()
        };
        let runner = StepRunner::new(&driver, config);
        let steps = vec![
            Step::navigate("", "Opening product page"),
            Step::click("id=buy", &["xpath=//button"], "Clicking Buy Now button"),
            Step::type_text("id=cc-input", &[], "", "Entering card number"),
        ];
        let inputs = ResolvedInputs {
            target_url: "https://shop.example/item".to_string(),
            card_number: "4111111111111111".to_string(),
            ..Default::default()
        };

        let report = runner.run(steps, &inputs);

        assert!(report.steps.iter().all(|s| s.outcome.succeeded()));
        assert_eq!(report.failure_count(), 0);
        assert_eq!(driver.clicks(), vec!["xpath=//button"]);
        let calls = driver.calls.borrow();
        assert!(calls.contains(&Call::Navigate("https://shop.example/item".to_string())));
        assert!(calls.contains(&Call::Type(
            "id=cc-input".to_string(),
            "4111111111111111".to_string()
        )));
    }

    #[test]
    fn scenario_unbound_card_field_records_zero_interactions() {
        let driver = FakeDriver::new().without("id=buy");
        let config = RunnerConfig {
            bindings: card_bindings(),
            ..quiet_config()
        };
        let runner = StepRunner::new(&driver, config);
        let steps = vec![
            Step::navigate("", "Opening product page"),
            Step::click("id=buy", &["xpath=//button"], "Clicking Buy Now button"),
            Step::type_text("id=cc-input", &[], "", "Entering card number"),
        ];
        let inputs = ResolvedInputs {
            target_url: "https://shop.example/item".to_string(),
            ..Default::default()
        };

        let report = runner.run(steps, &inputs);

        assert!(report.steps.iter().all(|s| s.outcome.succeeded()));
        let calls = driver.calls.borrow();
        assert!(calls.iter().all(|c| !matches!(c, Call::Type(_, _))));
    }

    #[test]
    fn url_validation_accepts_real_product_urls() {
        assert!(validate_url("https://shop.example/item?pid=1").is_ok());
        assert!(validate_url("http://shop.example").is_ok());
        assert!(validate_url("  https://shop.example/item  ").is_ok());
    }
}
