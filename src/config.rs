//! # 配置
//!
//! 可选的 JSON 配置文件，所有字段都有默认值：
//!
//! ```json
//! {
//!   "baseline": { "direct": "https://.../sr_direct_list.module" },
//!   "custom_dir": "custom",
//!   "output_dir": ".",
//!   "fetch": { "timeout_secs": 60, "retries": 2, "backoff_base_ms": 1000 }
//! }
//! ```
//!
//! 未在 `baseline` 中出现的分类使用内置地址。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::rule::RulePolicy;

/// 内置的基础规则模块地址
const DEFAULT_BASELINE_BASE: &str =
    "https://raw.githubusercontent.com/GMOogway/shadowrocket-rules/master";

/// 默认 User-Agent
const DEFAULT_USER_AGENT: &str = concat!("proxy-rules/", env!("CARGO_PKG_VERSION"));

/// 内置基础规则模块地址
pub fn default_baseline(policy: RulePolicy) -> String {
    format!("{}/sr_{}_list.module", DEFAULT_BASELINE_BASE, policy.as_str())
}

/// 网络拉取参数
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// 单次请求超时
    pub timeout_secs: u64,
    /// 首次请求失败后的重试次数
    pub retries: u32,
    /// 指数退避的基准间隔
    pub backoff_base_ms: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            retries: 2,
            backoff_base_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每个分类的基础规则源（URL 或本地路径）
    pub baseline: BTreeMap<RulePolicy, String>,
    /// 自定义列表目录
    pub custom_dir: PathBuf,
    /// 输出根目录，其下生成 shadowrocket/ 与 mihomo/
    pub output_dir: PathBuf,
    pub fetch: FetchSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baseline: RulePolicy::ALL
                .iter()
                .map(|&p| (p, default_baseline(p)))
                .collect(),
            custom_dir: PathBuf::from("custom"),
            output_dir: PathBuf::from("."),
            fetch: FetchSettings::default(),
        }
    }
}

impl Config {
    /// 读取配置文件；未指定时使用默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json(&fs::read_to_string(path)?),
            None => Ok(Self::default()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(content)?;
        for policy in RulePolicy::ALL {
            config
                .baseline
                .entry(policy)
                .or_insert_with(|| default_baseline(policy));
        }
        Ok(config)
    }

    /// 某个分类的基础规则源
    pub fn baseline_for(&self, policy: RulePolicy) -> String {
        self.baseline
            .get(&policy)
            .cloned()
            .unwrap_or_else(|| default_baseline(policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;

    #[test]
    fn defaults_cover_every_category() {
        let config = Config::default();
        assert_eq!(
            config.baseline_for(RulePolicy::Reject),
            "https://raw.githubusercontent.com/GMOogway/shadowrocket-rules/master/sr_reject_list.module"
        );
        assert_eq!(config.custom_dir, PathBuf::from("custom"));
        assert_eq!(config.fetch.retries, 2);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = Config::from_json(
            r#"{ "baseline": { "direct": "mirror/direct.module" }, "fetch": { "timeout_secs": 5 } }"#,
        )
        .unwrap();
        assert_eq!(config.baseline_for(RulePolicy::Direct), "mirror/direct.module");
        assert_eq!(config.baseline_for(RulePolicy::Proxy), default_baseline(RulePolicy::Proxy));
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.fetch.backoff_base_ms, 1000);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        assert!(matches!(Config::from_json("{ nope"), Err(RuleError::Config(_))));
        assert!(matches!(
            Config::from_json(r#"{ "baseline": { "bogus": "x" } }"#),
            Err(RuleError::Config(_))
        ));
    }
}
