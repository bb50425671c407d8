//! # 规则模块
//!
//! 此模块负责：
//! 1. 规则数据模型与单行解析
//! 2. 类型优先级表
//! 3. 多格式输出（Shadowrocket, Mihomo）
//! 4. 自定义列表读取与规则文件写入

pub mod formatter;
pub mod manager;
pub mod model;
pub mod parser;
pub mod priority;

pub use formatter::{create_formatter, Dialect, Formatter};
pub use manager::{CustomList, RuleFileManager};
pub use model::{Origin, Rule, RuleKind, RulePolicy};
pub use parser::{parse_line, parse_rule};
pub use priority::PriorityTable;
