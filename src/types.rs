use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A tagged selector naming one UI element.
///
/// The textual form carries a strategy prefix: `xpath=`, `id=` or `css=`.
/// Untagged strings parse as XPath, which is what most of the recorded
/// site script uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Locator {
    XPath(String),
    Id(String),
    Css(String),
}

impl Locator {
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("xpath=") {
            Locator::XPath(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("id=") {
            Locator::Id(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("css=") {
            Locator::Css(rest.to_string())
        } else {
            Locator::XPath(raw.to_string())
        }
    }

    /// The selector expression without its strategy tag.
    pub fn expression(&self) -> &str {
        match self {
            Locator::XPath(s) | Locator::Id(s) | Locator::Css(s) => s,
        }
    }
}

impl From<String> for Locator {
    fn from(raw: String) -> Self {
        Locator::parse(&raw)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::XPath(s) => write!(f, "xpath={s}"),
            Locator::Id(s) => write!(f, "id={s}"),
            Locator::Css(s) => write!(f, "css={s}"),
        }
    }
}

/// One declarative UI action against the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Navigate {
        url: String,
    },
    Click {
        target: Locator,
        #[serde(default)]
        fallbacks: Vec<Locator>,
    },
    /// Click that triggers a page transition; the runner pauses longer and
    /// re-checks for consent dialogs afterwards.
    ClickAndWait {
        target: Locator,
        #[serde(default)]
        fallbacks: Vec<Locator>,
    },
    /// An empty `value` means the field is left for manual entry.
    Type {
        target: Locator,
        #[serde(default)]
        fallbacks: Vec<Locator>,
        #[serde(default)]
        value: String,
    },
}

/// A scripted step: the action plus a human-readable label used only for
/// progress reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub command: Command,
    pub description: String,
}

impl Step {
    pub fn navigate(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: Command::Navigate { url: url.into() },
            description: description.into(),
        }
    }

    pub fn click(target: &str, fallbacks: &[&str], description: impl Into<String>) -> Self {
        Self {
            command: Command::Click {
                target: Locator::parse(target),
                fallbacks: fallbacks.iter().map(|f| Locator::parse(f)).collect(),
            },
            description: description.into(),
        }
    }

    pub fn click_and_wait(target: &str, fallbacks: &[&str], description: impl Into<String>) -> Self {
        Self {
            command: Command::ClickAndWait {
                target: Locator::parse(target),
                fallbacks: fallbacks.iter().map(|f| Locator::parse(f)).collect(),
            },
            description: description.into(),
        }
    }

    pub fn type_text(
        target: &str,
        fallbacks: &[&str],
        value: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            command: Command::Type {
                target: Locator::parse(target),
                fallbacks: fallbacks.iter().map(|f| Locator::parse(f)).collect(),
                value: value.to_string(),
            },
            description: description.into(),
        }
    }
}

/// Fully-resolved run inputs. Empty card fields mean "fill manually".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInputs {
    pub target_url: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvv: String,
}

/// A deferred execution request. At most one persists at a time; no
/// `scheduled_at` means "execute immediately".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    #[serde(flatten)]
    pub inputs: ResolvedInputs,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Local>>,
}

/// What happened to one step. The runner never aborts on failure: every
/// step produces exactly one outcome and the sequence runs to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Intentionally not executed; counts as success.
    Skipped(String),
    ValidationError(String),
    /// Primary and all fallback locators exhausted.
    Timeout,
    InteractionError(String),
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, StepOutcome::Success | StepOutcome::Skipped(_))
    }
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub index: usize,
    pub description: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.outcome.succeeded())
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }
}
