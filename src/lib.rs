//! # proxy-rules
//!
//! 合并、去重并转换分流规则集：
//! - 拉取基础模块与补充规则源
//! - 去掉完全重复、跨类型重复以及被更宽规则覆盖的条目
//! - 应用本地追加/排除
//! - 输出 Shadowrocket 与 Mihomo 两种格式

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod rule;
pub mod source;

pub use config::Config;
pub use error::{Result, RuleError};
pub use pipeline::{build_category, CategoryInput, CategoryOutput, CategoryStatus, Pipeline, RunSummary};
