//! # 错误类型
//!
//! 规则处理过程中的错误分类：
//! - `Parse`: 单行规则无法解析（记录、计数，不中断）
//! - `SourceUnavailable`: 某个分类的基础规则源无法获取（跳过该分类）
//! - `PatternCompile`: URL-REGEX 编译失败（规则保留，不参与覆盖判定）
//! - 其余为外部协作者（网络、文件、配置）的错误

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    /// 单行规则解析失败
    #[error("unparseable rule line `{line}`: {reason}")]
    Parse { line: String, reason: &'static str },

    /// 基础规则源不可用，整个分类被跳过
    #[error("baseline source for `{category}` unavailable: {reason}")]
    SourceUnavailable { category: String, reason: String },

    /// 正则编译失败
    #[error("pattern `{pattern}` failed to compile: {reason}")]
    PatternCompile { pattern: String, reason: String },

    /// 网络请求失败
    #[error("fetch {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// 配置文件无效
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
