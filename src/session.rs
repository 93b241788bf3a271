use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use headless_chrome::{Browser, Element, LaunchOptions, Tab};

use crate::driver::{Driver, ElementHandle};
use crate::types::Locator;

/// How the Chrome session is launched.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    /// Persistent profile directory; keeps the site login between runs.
    pub profile_dir: PathBuf,
}

/// Persistent browser session. Created once and owned by the caller for
/// the whole run; dropping it closes Chrome.
pub struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch(opts: &SessionOptions) -> Result<Self> {
        if !opts.profile_dir.exists() {
            std::fs::create_dir_all(&opts.profile_dir)
                .with_context(|| format!("creating profile directory {:?}", opts.profile_dir))?;
            eprintln!("[Session] Created profile directory at {:?}", opts.profile_dir);
        }

        let options = LaunchOptions {
            headless: opts.headless,
            path: find_chrome(),
            user_data_dir: Some(opts.profile_dir.clone()),
            args: vec![
                std::ffi::OsStr::new("--no-first-run"),
                std::ffi::OsStr::new("--no-default-browser-check"),
                std::ffi::OsStr::new("--disable-blink-features=AutomationControlled"),
                std::ffi::OsStr::new("--disable-infobars"),
                std::ffi::OsStr::new("--password-store=basic"),
            ],
            // The user may still be typing card details by hand; don't let
            // the connection reap an idle browser mid-purchase.
            idle_browser_timeout: Duration::from_secs(3600),
            ..Default::default()
        };

        eprintln!("[Session] Starting Chrome...");
        let browser = Browser::new(options).map_err(|e| {
            eprintln!("[Session] Browser launch failed: {}", e);
            anyhow::anyhow!("Browser launch failed: {}", e)
        })?;

        let tab = browser.new_tab()?;
        tab.navigate_to("about:blank")?;

        // Make the profile look hand-driven.
        let _ = tab.evaluate(
            "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})",
            false,
        );

        eprintln!("[Session] Chrome ready.");
        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Immediate lookup, no wait.
    fn element(&self, locator: &Locator) -> Result<Element<'_>> {
        let element = match locator {
            Locator::XPath(expr) => self.tab.find_element_by_xpath(expr)?,
            Locator::Id(id) => self.tab.find_element(&format!("#{id}"))?,
            Locator::Css(selector) => self.tab.find_element(selector)?,
        };
        Ok(element)
    }

    fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Element<'_>> {
        let element = match locator {
            Locator::XPath(expr) => self.tab.wait_for_xpath_with_custom_timeout(expr, timeout)?,
            Locator::Id(id) => self
                .tab
                .wait_for_element_with_custom_timeout(&format!("#{id}"), timeout)?,
            Locator::Css(selector) => self
                .tab
                .wait_for_element_with_custom_timeout(selector, timeout)?,
        };
        Ok(element)
    }
}

impl Driver for BrowserSession {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }

    fn find_element(&self, locator: &Locator, timeout: Duration) -> Result<ElementHandle> {
        if timeout.is_zero() {
            // Probe: present right now, and laid out. Hidden elements have
            // no box model.
            let element = self.element(locator)?;
            element.get_box_model()?;
        } else {
            self.wait_for(locator, timeout)?;
        }
        Ok(ElementHandle {
            locator: locator.clone(),
        })
    }

    fn click(&self, element: &ElementHandle) -> Result<()> {
        self.element(&element.locator)?.click()?;
        Ok(())
    }

    fn clear_and_type(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.element(&element.locator)?.click()?;
        self.tab.evaluate(&clear_script(&element.locator), false)?;
        self.tab.type_str(text)?;
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }
}

/// JS that blanks the field's current content before typing. The `|| {}`
/// guard turns a vanished element into a no-op instead of a script error.
fn clear_script(locator: &Locator) -> String {
    match locator {
        Locator::Css(selector) => {
            let selector = selector.replace('\\', "\\\\").replace('\'', "\\'");
            format!("(document.querySelector('{selector}') || {{}}).value = ''")
        }
        Locator::Id(id) => {
            let id = id.replace('\\', "\\\\").replace('\'', "\\'");
            format!("(document.getElementById('{id}') || {{}}).value = ''")
        }
        Locator::XPath(expr) => {
            let expr = expr.replace('\\', "\\\\").replace('\'', "\\'");
            format!(
                "(document.evaluate('{expr}', document, null, \
                 XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue || {{}}).value = ''"
            )
        }
    }
}

/// Well-known install locations, tried before headless_chrome's own
/// detection takes over.
fn find_chrome() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if cfg!(target_os = "windows") {
        candidates.push(PathBuf::from(
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        ));
        candidates.push(PathBuf::from(
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ));
        if let Some(local) = dirs::data_local_dir() {
            candidates.push(
                local
                    .join("Google")
                    .join("Chrome")
                    .join("Application")
                    .join("chrome.exe"),
            );
        }
    } else if cfg!(target_os = "macos") {
        candidates.push(PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ));
    } else {
        candidates.push(PathBuf::from("/usr/bin/google-chrome"));
        candidates.push(PathBuf::from("/usr/bin/chromium"));
        candidates.push(PathBuf::from("/usr/bin/chromium-browser"));
    }
    candidates.into_iter().find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_script_escapes_quotes() {
        let script = clear_script(&Locator::XPath("//input[@id='cc-input']".to_string()));
        assert!(script.contains("\\'cc-input\\'"));
        let script = clear_script(&Locator::Css("#cards > div input".to_string()));
        assert!(script.contains("querySelector('#cards > div input')"));
    }
}
