//! # 去重引擎
//!
//! 纯内存、单线程、无 I/O：输入原始规则行，输出排序后的规范规则集。

pub mod custom;
pub mod dedup;
pub mod index;

pub use custom::{CustomReport, Customizations};
pub use dedup::{deduplicate, DedupOptions, DedupOutcome, DedupReport, Deduplicator, RuleInput};
pub use index::{PatternSet, SuffixIndex};
