use crate::browser;
use crate::config::{ClientConfig, ScriptCapability};
use crate::{EngineError, Result};
use serde::Serialize;
use std::io::Read;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    pub url: String,
    pub needs_script_execution: bool,
    pub needs_scroll: bool,
}

impl FetchRequest {
    /// Scrolling only makes sense with scripts running, so `needs_scroll` forces script execution.
    pub fn new(url: impl Into<String>, needs_script_execution: bool, needs_scroll: bool) -> Self {
        Self {
            url: url.into(),
            needs_script_execution: needs_script_execution || needs_scroll,
            needs_scroll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Http,
    Browser,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub mode: FetchMode,
    /// Why a requested browser render fell back to a plain GET.
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Network side of a run. One instance serves the page fetch and every image download.
pub trait Transport {
    fn fetch_page(&self, request: &FetchRequest) -> Result<FetchedPage>;

    /// Fetches image bytes. Non-success statuses are returned, not raised.
    fn fetch_image(&self, url: &str) -> Result<ImageResponse>;
}

pub struct HttpTransport {
    agent: ureq::Agent,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Self {
        let mut builder = ureq::Agent::config_builder();
        builder = builder
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs.max(1))))
            .user_agent(config.user_agent.as_str());
        let agent: ureq::Agent = builder.build().into();
        Self { agent, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get_html(&self, url: &str) -> Result<String> {
        let mut response = self.agent.get(&request_target(url)).call()?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(EngineError::FetchFailed {
                url: url.to_string(),
                status,
            });
        }
        let mut buf = Vec::new();
        response.body_mut().as_reader().read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Transport for HttpTransport {
    fn fetch_page(&self, request: &FetchRequest) -> Result<FetchedPage> {
        let mut fallback_reason = None;
        if request.needs_script_execution {
            match &self.config.script {
                ScriptCapability::Browser { path } => {
                    match browser::render_page(path, &self.config, &request.url, request.needs_scroll)
                    {
                        Ok(html) => {
                            return Ok(FetchedPage {
                                html,
                                mode: FetchMode::Browser,
                                fallback_reason: None,
                            });
                        }
                        Err(err) => fallback_reason = Some(format!("browser render failed: {err}")),
                    }
                }
                ScriptCapability::Unavailable => {
                    fallback_reason = Some("no headless browser available".to_string());
                }
            }
        }

        let html = self.get_html(&request.url)?;
        Ok(FetchedPage {
            html,
            mode: FetchMode::Http,
            fallback_reason,
        })
    }

    fn fetch_image(&self, url: &str) -> Result<ImageResponse> {
        let mut response = self.agent.get(&request_target(url)).call()?;
        let status = response.status().as_u16();
        let mut body = Vec::new();
        if status == 200 {
            response.body_mut().as_reader().read_to_end(&mut body)?;
        }
        Ok(ImageResponse { status, body })
    }
}

/// Wire form of `url`: non-ASCII and spaces percent-encoded. Unparseable input is sent as is
/// and left for the agent to reject.
fn request_target(url: &str) -> String {
    Url::parse(url)
        .map(String::from)
        .unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_implies_script_execution() {
        let req = FetchRequest::new("https://weverse.io/a/media/1", false, true);
        assert!(req.needs_script_execution);
        assert!(req.needs_scroll);

        let req = FetchRequest::new("https://sbskpop.kr/a", false, false);
        assert!(!req.needs_script_execution);
    }

    #[test]
    fn transport_keeps_config() {
        let cfg = ClientConfig {
            timeout_secs: 7,
            ..ClientConfig::default()
        };
        let transport = HttpTransport::new(cfg);
        assert_eq!(transport.config().timeout_secs, 7);
        assert!(!transport.config().script_execution_available());
    }

    #[test]
    fn request_target_encodes_raw_identifiers() {
        assert_eq!(
            request_target("https://sbskpop.kr/뉴진스"),
            "https://sbskpop.kr/%EB%89%B4%EC%A7%84%EC%8A%A4"
        );
        assert_eq!(
            request_target("https://blog.naver.com/PostView.naver?blogId=a b&logNo=1"),
            "https://blog.naver.com/PostView.naver?blogId=a%20b&logNo=1"
        );
        assert_eq!(request_target("not a url"), "not a url");
    }
}
