//! # 规则格式化器
//!
//! 把规范规则集写成两种输出格式。转换是纯函数：逐行改写、不改变顺序、
//! 不重新判定语义。

use std::fmt;

use super::model::{Rule, RuleKind, NO_RESOLVE};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Dialect {
    /// Shadowrocket（源格式）
    Shadowrocket,
    /// Mihomo / Clash Meta
    Mihomo,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Shadowrocket, Dialect::Mihomo];

    /// 输出子目录名
    pub fn dir_name(&self) -> &'static str {
        match self {
            Dialect::Shadowrocket => "shadowrocket",
            Dialect::Mihomo => "mihomo",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// 规则格式化 trait
pub trait Formatter {
    /// 该格式中的类型名
    fn kind_name<'a>(&self, kind: &'a RuleKind) -> &'a str;

    /// 格式化单条规则，IP 类规则保证恰好带一个 no-resolve
    fn format_rule(&self, rule: &Rule) -> String {
        let mut line = format!("{},{}", self.kind_name(&rule.kind), rule.value);
        for modifier in &rule.modifiers {
            line.push(',');
            line.push_str(modifier);
        }
        if rule.kind.is_ip() && !rule.has_modifier(NO_RESOLVE) {
            line.push(',');
            line.push_str(NO_RESOLVE);
        }
        line
    }

    /// 格式化多条规则，保持顺序
    fn format_rules(&self, rules: &[Rule]) -> Vec<String> {
        rules.iter().map(|r| self.format_rule(r)).collect()
    }

    /// 获取规则文件扩展名
    fn file_extension(&self) -> &'static str {
        "list"
    }

    /// 生成规则文件内容：每行一条，以换行结尾
    fn generate_file_content(&self, rules: &[Rule]) -> String {
        let mut content = String::new();
        for line in self.format_rules(rules) {
            content.push_str(&line);
            content.push('\n');
        }
        content
    }
}

// ========================================
// Shadowrocket 格式化器
// ========================================

pub struct ShadowrocketFormatter;

impl Formatter for ShadowrocketFormatter {
    fn kind_name<'a>(&self, kind: &'a RuleKind) -> &'a str {
        kind.name()
    }
}

// ========================================
// Mihomo 格式化器
// ========================================

pub struct MihomoFormatter;

impl Formatter for MihomoFormatter {
    fn kind_name<'a>(&self, kind: &'a RuleKind) -> &'a str {
        match kind {
            RuleKind::UrlRegex => "DOMAIN-REGEX",
            other => other.name(),
        }
    }
}

/// 根据格式类型创建格式化器
pub fn create_formatter(dialect: Dialect) -> Box<dyn Formatter + Send + Sync> {
    match dialect {
        Dialect::Shadowrocket => Box::new(ShadowrocketFormatter),
        Dialect::Mihomo => Box::new(MihomoFormatter),
    }
}
