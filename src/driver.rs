use std::time::Duration;

use anyhow::Result;

use crate::types::Locator;

/// Proof that a locator resolved to an element. Interactions re-resolve
/// through the locator that matched, so the handle stays valid across the
/// trait boundary without borrowing the browser tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub locator: Locator,
}

/// The browser-automation collaborator. `BrowserSession` implements this
/// over a live Chrome tab; tests substitute a recording fake.
pub trait Driver {
    fn navigate(&self, url: &str) -> Result<()>;

    /// Wait up to `timeout` for `locator` to match one element. A zero
    /// timeout is an immediate existence probe that also requires the
    /// element to be visible and interactive.
    fn find_element(&self, locator: &Locator, timeout: Duration) -> Result<ElementHandle>;

    fn click(&self, element: &ElementHandle) -> Result<()>;

    fn clear_and_type(&self, element: &ElementHandle, text: &str) -> Result<()>;

    fn current_url(&self) -> Result<String>;
}
