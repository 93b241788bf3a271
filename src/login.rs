//! The purchase flow assumes a signed-in profile. Before running it,
//! visit the account page and confirm the login markers are present; if
//! not, the user logs in by hand in the visible browser window while we
//! poll for the markers to appear.

use std::thread;
use std::time::Duration;

use crate::driver::Driver;
use crate::interrupt::CancelToken;
use crate::runner::suppress_popups;
use crate::types::Locator;

/// How the signed-in state is detected.
#[derive(Debug, Clone)]
pub struct LoginProbe {
    pub account_url: String,
    /// Any one of these present means signed in.
    pub markers: Vec<Locator>,
    /// Consent dialogs that can cover the account page.
    pub popups: Vec<Locator>,
    /// Render settle time after loading the account page.
    pub settle: Duration,
    /// Gap between detection attempts while waiting for a manual login.
    pub poll: Duration,
    /// Detection attempts before giving up on a manual login.
    pub max_attempts: u32,
}

const MARKER_TIMEOUT: Duration = Duration::from_secs(2);
const POPUP_PAUSE: Duration = Duration::from_millis(1500);

/// Visit the account page and look for a signed-in marker.
pub fn check_login<D: Driver>(driver: &D, probe: &LoginProbe) -> bool {
    eprintln!("[Login] Checking login status...");
    if let Err(e) = driver.navigate(&probe.account_url) {
        eprintln!("[Login] Could not open account page: {e:#}");
        return false;
    }
    if !probe.settle.is_zero() {
        thread::sleep(probe.settle);
    }
    suppress_popups(driver, &probe.popups, POPUP_PAUSE);
    markers_present(driver, probe)
}

/// Poll until the user signs in by hand. Bounded, and abortable with
/// Ctrl+C.
pub fn wait_for_login<D: Driver>(driver: &D, probe: &LoginProbe, cancel: &CancelToken) -> bool {
    println!("Please log in using the browser window; the run continues automatically.");
    for _ in 0..probe.max_attempts {
        if cancel.is_cancelled() {
            println!("Login wait cancelled.");
            return false;
        }
        if !probe.poll.is_zero() {
            thread::sleep(probe.poll);
        }
        suppress_popups(driver, &probe.popups, POPUP_PAUSE);
        if markers_present(driver, probe) {
            println!("Login detected; the profile is saved for next time.");
            return true;
        }
        // The user may have wandered off the login page; steer back to
        // where the markers live.
        if let Ok(url) = driver.current_url() {
            if !url.to_lowercase().contains("login") {
                let _ = driver.navigate(&probe.account_url);
            }
        }
    }
    eprintln!("[Login] Gave up waiting for a login.");
    false
}

fn markers_present<D: Driver>(driver: &D, probe: &LoginProbe) -> bool {
    probe
        .markers
        .iter()
        .any(|marker| driver.find_element(marker, MARKER_TIMEOUT).is_ok())
}
