//! # 规则源拉取
//!
//! 远程 URL 用阻塞 HTTP 客户端拉取（超时 + 有限次重试 + 指数退避），
//! 本地路径直接读取。失败只向上报告“该来源没有内容”，不会中断整个流程。

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::config::FetchSettings;
use crate::error::{Result, RuleError};

/// 退避倍数上限：base * 2^6
const MAX_BACKOFF_SHIFT: u32 = 6;

// ========================================
// 规则源位置
// ========================================

/// 规则源：远程 URL 或本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(String),
    Local(PathBuf),
}

impl SourceLocation {
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceLocation::Remote(location.to_string())
        } else {
            SourceLocation::Local(PathBuf::from(location))
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Remote(url) => f.write_str(url),
            SourceLocation::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 第 `attempt` 次失败后的等待时间（从 0 开始计数）
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1 << attempt.min(MAX_BACKOFF_SHIFT))
}

// ========================================
// 拉取器
// ========================================

pub struct Fetcher {
    client: Client,
    /// 首次请求之外的重试次数
    retries: u32,
    backoff_base: Duration,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| RuleError::Fetch {
                url: "<client>".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            retries: settings.retries,
            backoff_base: Duration::from_millis(settings.backoff_base_ms),
        })
    }

    /// 拉取单个来源的完整文本
    pub fn fetch(&self, location: &str) -> Result<String> {
        match SourceLocation::parse(location) {
            SourceLocation::Remote(url) => self.fetch_remote(&url),
            SourceLocation::Local(path) => {
                fs::read_to_string(&path).map_err(|e| RuleError::Fetch {
                    url: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// 并发拉取多个来源，结果顺序与输入一致；失败的来源为 `None`
    pub fn fetch_many(&self, locations: &[String]) -> Vec<Option<String>> {
        locations
            .par_iter()
            .map(|location| match self.fetch(location) {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!("skipping source: {}", e);
                    None
                }
            })
            .collect()
    }

    fn fetch_remote(&self, url: &str) -> Result<String> {
        let mut last_error = String::new();

        for attempt in 0..=self.retries {
            match self.get_text(url) {
                Ok(text) => {
                    info!(url, bytes = text.len(), "fetched");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(url, attempt = attempt + 1, total = self.retries + 1, "fetch failed: {}", e);
                    last_error = e.to_string();
                    if attempt < self.retries {
                        let delay = backoff_delay(self.backoff_base, attempt);
                        debug!(url, ?delay, "backing off");
                        thread::sleep(delay);
                    }
                }
            }
        }

        Err(RuleError::Fetch {
            url: url.to_string(),
            reason: last_error,
        })
    }

    fn get_text(&self, url: &str) -> std::result::Result<String, reqwest::Error> {
        self.client.get(url).send()?.error_for_status()?.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> FetchSettings {
        FetchSettings {
            timeout_secs: 1,
            retries: 0,
            backoff_base_ms: 1,
            ..FetchSettings::default()
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 30), Duration::from_secs(64));
    }

    #[test]
    fn locations_are_classified() {
        assert_eq!(
            SourceLocation::parse("https://example.com/a.list"),
            SourceLocation::Remote("https://example.com/a.list".to_string())
        );
        assert_eq!(
            SourceLocation::parse(" HTTP://example.com/a.list "),
            SourceLocation::Remote("HTTP://example.com/a.list".to_string())
        );
        assert_eq!(
            SourceLocation::parse("mirror/direct.module"),
            SourceLocation::Local(PathBuf::from("mirror/direct.module"))
        );
    }

    #[test]
    fn local_sources_are_read_and_failures_become_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.list");
        fs::write(&path, "DOMAIN,a.example\n").unwrap();

        let fetcher = Fetcher::new(&settings()).unwrap();
        let locations = vec![
            path.display().to_string(),
            dir.path().join("missing.list").display().to_string(),
        ];
        let contents = fetcher.fetch_many(&locations);
        assert_eq!(contents, vec![Some("DOMAIN,a.example\n".to_string()), None]);
        assert!(matches!(
            fetcher.fetch(&locations[1]),
            Err(RuleError::Fetch { .. })
        ));
    }
}
