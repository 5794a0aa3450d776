use crate::cmd;
use crate::config::{ClientConfig, ScriptCapability};
use crate::{EngineError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const BROWSER_TOOL: &str = "headless-browser";
const VIEWPORT_WIDTH: u32 = 1920;
const VIEWPORT_HEIGHT: u32 = 1080;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0)";

const BROWSER_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "msedge",
];

const WINDOWS_BROWSER_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
];

/// Finds a Chromium-family browser that can render pages headless.
pub fn detect(explicit: Option<&Path>) -> ScriptCapability {
    match find_browser(explicit) {
        Some(path) => ScriptCapability::Browser { path },
        None => ScriptCapability::Unavailable,
    }
}

fn find_browser(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        return path.to_str().and_then(cmd::find_on_path);
    }

    if let Some(found) = BROWSER_NAMES.iter().find_map(|name| cmd::find_on_path(name)) {
        return Some(found);
    }

    if cfg!(windows) {
        return WINDOWS_BROWSER_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file());
    }
    None
}

/// One action on the loaded page: an optional script, then a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStep {
    pub script: Option<&'static str>,
    pub wait_ms: u64,
}

/// What happens between page load and DOM capture.
///
/// Always one settle delay. With scrolling, the page is then scrolled to the bottom once per
/// increment and finally back to the top, each followed by the scroll settle delay, so content
/// loaded by scroll handlers is present in the captured DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub steps: Vec<RenderStep>,
}

impl RenderPlan {
    pub fn new(config: &ClientConfig, scroll: bool) -> Self {
        let mut steps = vec![RenderStep {
            script: None,
            wait_ms: config.settle_delay_ms,
        }];
        if scroll {
            for _ in 0..config.scroll_steps {
                steps.push(RenderStep {
                    script: Some(SCROLL_TO_BOTTOM),
                    wait_ms: config.scroll_settle_ms,
                });
            }
            steps.push(RenderStep {
                script: Some(SCROLL_TO_TOP),
                wait_ms: config.scroll_settle_ms,
            });
        }
        Self { steps }
    }

    pub fn total_wait_ms(&self) -> u64 {
        self.steps.iter().map(|step| step.wait_ms).sum()
    }

    /// Upper bound for launch, load, scripted steps and capture together.
    pub fn deadline(&self, config: &ClientConfig) -> Duration {
        Duration::from_secs(config.timeout_secs.max(1)) + Duration::from_millis(self.total_wait_ms())
    }
}

/// Loads `url` in a headless browser over the DevTools protocol, runs the render plan and
/// returns the serialized DOM.
pub fn render_page(browser: &Path, config: &ClientConfig, url: &str, scroll: bool) -> Result<String> {
    if !browser.is_file() {
        return Err(EngineError::ExternalToolMissing {
            tool: BROWSER_TOOL.to_string(),
        });
    }

    let plan = RenderPlan::new(config, scroll);
    let deadline = plan.deadline(config);
    let mut builder = BrowserConfig::builder()
        .chrome_executable(browser)
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .request_timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .no_sandbox();
    for arg in launch_args(config) {
        builder = builder.arg(arg);
    }
    let browser_config = builder.build().map_err(tool_failed)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let rendered = runtime.block_on(async {
        let (mut browser, mut handler) =
            match tokio::time::timeout(deadline, Browser::launch(browser_config)).await {
                Ok(launched) => launched?,
                Err(_) => return Err(timed_out(deadline)),
            };
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let captured = tokio::time::timeout(deadline, capture(&browser, url, &plan)).await;
        let _ = browser.kill().await;
        events.abort();

        match captured {
            Ok(html) => html,
            Err(_) => Err(timed_out(deadline)),
        }
    });
    // A launch abandoned at the deadline may leave blocking readers behind.
    runtime.shutdown_background();
    let html = rendered?;

    if html.trim().is_empty() {
        return Err(tool_failed("browser produced an empty document".to_string()));
    }
    Ok(html)
}

async fn capture(browser: &Browser, url: &str, plan: &RenderPlan) -> Result<String> {
    let page = browser.new_page(url).await?;
    page.wait_for_navigation().await?;
    for step in &plan.steps {
        if let Some(script) = step.script {
            page.evaluate(script).await?;
        }
        tokio::time::sleep(Duration::from_millis(step.wait_ms)).await;
    }
    Ok(page.content().await?)
}

fn launch_args(config: &ClientConfig) -> Vec<String> {
    vec![
        "--disable-gpu".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--hide-scrollbars".to_string(),
        format!("--user-agent={}", config.user_agent),
    ]
}

fn tool_failed(stderr: String) -> EngineError {
    EngineError::ExternalToolFailed {
        tool: BROWSER_TOOL.to_string(),
        code: None,
        stderr,
    }
}

fn timed_out(deadline: Duration) -> EngineError {
    tool_failed(format!("timed out after {}s", deadline.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_render_waits_one_settle_delay() {
        let cfg = ClientConfig::default();
        let plan = RenderPlan::new(&cfg, false);
        assert_eq!(
            plan.steps,
            vec![RenderStep {
                script: None,
                wait_ms: 5_000
            }]
        );
        assert_eq!(plan.deadline(&cfg), Duration::from_secs(35));
    }

    #[test]
    fn scroll_render_walks_to_bottom_then_returns_to_top() {
        let cfg = ClientConfig::default();
        let plan = RenderPlan::new(&cfg, true);
        let scripts: Vec<Option<&str>> = plan.steps.iter().map(|s| s.script).collect();
        assert_eq!(
            scripts,
            vec![
                None,
                Some(SCROLL_TO_BOTTOM),
                Some(SCROLL_TO_BOTTOM),
                Some(SCROLL_TO_BOTTOM),
                Some(SCROLL_TO_TOP),
            ]
        );
        assert!(plan.steps[1..].iter().all(|s| s.wait_ms == 1_000));
        // 5s load + 3 scroll steps + return to top, 1s each.
        assert_eq!(plan.total_wait_ms(), 9_000);
    }

    #[test]
    fn scroll_step_count_follows_config() {
        let cfg = ClientConfig {
            scroll_steps: 1,
            scroll_settle_ms: 250,
            settle_delay_ms: 0,
            ..ClientConfig::default()
        };
        let plan = RenderPlan::new(&cfg, true);
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.total_wait_ms(), 500);
    }

    #[test]
    fn launch_args_carry_user_agent() {
        let cfg = ClientConfig {
            user_agent: "ua-test".to_string(),
            ..ClientConfig::default()
        };
        assert!(launch_args(&cfg).contains(&"--user-agent=ua-test".to_string()));
    }

    #[test]
    fn explicit_browser_file_is_used_as_is() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exe = dir.path().join("my-chrome");
        std::fs::write(&exe, b"").expect("write");
        assert_eq!(
            detect(Some(exe.as_path())),
            ScriptCapability::Browser { path: exe.clone() }
        );
    }

    #[test]
    fn missing_explicit_browser_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope").join("chrome-does-not-exist");
        assert_eq!(detect(Some(missing.as_path())), ScriptCapability::Unavailable);
    }

    #[test]
    fn render_reports_missing_tool() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("no-such-browser");
        let err = render_page(&missing, &ClientConfig::default(), "https://example.com", false)
            .expect_err("missing browser");
        assert!(matches!(err, EngineError::ExternalToolMissing { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn hung_browser_is_abandoned_at_deadline() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let exe = dir.path().join("hung-browser");
        std::fs::write(&exe, b"#!/bin/sh\nsleep 60\n").expect("write");
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let cfg = ClientConfig {
            timeout_secs: 1,
            settle_delay_ms: 0,
            ..ClientConfig::default()
        };
        let started = std::time::Instant::now();
        let result = render_page(&exe, &cfg, "https://example.com", false);
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(15), "{:?}", started.elapsed());
    }
}
