//! # 规则源
//!
//! 拉取远程/本地文本，并切分成交给引擎的候选规则行。

pub mod feed;
pub mod fetch;

pub use feed::{extract_module_rules, filter_supplemental, read_list_lines};
pub use fetch::{Fetcher, SourceLocation};
