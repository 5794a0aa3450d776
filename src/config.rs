use crate::browser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 600;
const DEFAULT_SETTLE_DELAY_MS: u64 = 5_000;
const DEFAULT_SCROLL_STEPS: u32 = 3;
const DEFAULT_SCROLL_SETTLE_MS: u64 = 1_000;

pub const ENV_USER_AGENT: &str = "PICSAVE_USER_AGENT";
pub const ENV_TIMEOUT_SECS: &str = "PICSAVE_TIMEOUT_SECS";
pub const ENV_BROWSER: &str = "PICSAVE_BROWSER";

/// Whether pages can be rendered with their scripts executed before extraction.
///
/// Resolved once at startup; the fetcher never searches for a browser on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptCapability {
    Unavailable,
    Browser { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Wait after the initial page load when scripts run.
    pub settle_delay_ms: u64,
    pub scroll_steps: u32,
    /// Wait after each scroll increment, and once more back at the top.
    pub scroll_settle_ms: u64,
    /// Explicit browser executable; when unset, well-known names are searched on `PATH`.
    pub browser_path: Option<PathBuf>,
    pub script: ScriptCapability,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            scroll_steps: DEFAULT_SCROLL_STEPS,
            scroll_settle_ms: DEFAULT_SCROLL_SETTLE_MS,
            browser_path: None,
            script: ScriptCapability::Unavailable,
        }
    }
}

impl ClientConfig {
    /// Defaults with `PICSAVE_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(agent) = read(ENV_USER_AGENT) {
            self.user_agent = agent;
        }
        if let Some(secs) = read(ENV_TIMEOUT_SECS).and_then(|v| v.parse::<u64>().ok()) {
            self.timeout_secs = secs.clamp(1, MAX_TIMEOUT_SECS);
        }
        if let Some(path) = read(ENV_BROWSER) {
            self.browser_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Settles the script-execution capability for the rest of the run.
    pub fn resolve_script_capability(mut self, enabled: bool) -> Self {
        self.script = if enabled {
            browser::detect(self.browser_path.as_deref())
        } else {
            ScriptCapability::Unavailable
        };
        self
    }

    pub fn script_execution_available(&self) -> bool {
        matches!(self.script, ScriptCapability::Browser { .. })
    }
}
