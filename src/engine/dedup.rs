//! # 去重引擎
//!
//! 两阶段：
//! 1. 解析并折叠完全重复的规则（同类型同值保留先出现的；同值跨类型保留优先级最高的类型）
//! 2. 用后缀树和正则集合剔除被更宽规则覆盖的规则（只做一轮，不传递）
//!
//! 结果按 `sort_rules` 排序，相同输入总是得到逐字节相同的输出。

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::index::{PatternSet, SuffixIndex};
use crate::rule::model::{sort_rules, Origin, Rule, RuleKind};
use crate::rule::parser::parse_line;
use crate::rule::priority::PriorityTable;

// ========================================
// 输入
// ========================================

/// 合并后的原始规则行，保持首次出现的顺序
#[derive(Debug, Clone, Default)]
pub struct RuleInput {
    lines: Vec<(Origin, String)>,
}

impl RuleInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个来源的全部行
    pub fn push_lines<I, S>(&mut self, origin: Origin, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines
            .extend(lines.into_iter().map(|line| (origin, line.into())));
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ========================================
// 输出
// ========================================

/// 单次去重的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    /// 输入行数
    pub input_lines: usize,
    /// 空行和注释
    pub comments: usize,
    /// 成功解析的规则数
    pub parsed: usize,
    /// 无法解析而被跳过的行
    pub rejected: usize,
    /// 同类型同值的重复
    pub exact_duplicates: usize,
    /// 同值但被更高优先级类型替代
    pub priority_replaced: usize,
    /// 被域名后缀覆盖
    pub suffix_covered: usize,
    /// 被正则覆盖
    pub pattern_covered: usize,
    /// 编译失败的正则
    pub pattern_errors: usize,
    /// 最终保留
    pub kept: usize,
}

/// 去重结果
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    /// 排序后的规则
    pub rules: Vec<Rule>,
    pub report: DedupReport,
}

/// 去重参数，显式传入，不依赖全局状态
#[derive(Debug, Clone, Default)]
pub struct DedupOptions {
    pub priority: PriorityTable,
}

/// 覆盖某条规则的更宽规则
enum Coverage<'a> {
    Suffix(&'a str),
    Pattern(&'a str),
}

// ========================================
// 去重器
// ========================================

pub struct Deduplicator {
    options: DedupOptions,
}

impl Deduplicator {
    pub fn new(options: DedupOptions) -> Self {
        Self { options }
    }

    /// 执行完整的去重流程
    pub fn run(&self, input: &RuleInput) -> DedupOutcome {
        let mut report = DedupReport {
            input_lines: input.len(),
            ..Default::default()
        };

        // 1. 解析 + 折叠重复
        let survivors = self.collapse(input, &mut report);

        // 2. 构建覆盖索引
        let mut suffixes = SuffixIndex::new();
        for rule in survivors.iter().filter(|r| r.kind == RuleKind::DomainSuffix) {
            suffixes.insert(&rule.normalized_value());
        }
        let patterns = PatternSet::compile(
            survivors
                .iter()
                .filter(|r| r.kind == RuleKind::UrlRegex)
                .map(|r| r.value.as_str()),
        );
        for err in patterns.errors() {
            warn!("{}; rule kept but excluded from coverage", err);
        }
        report.pattern_errors = patterns.errors().len();
        debug!(suffixes = suffixes.len(), patterns = patterns.len(), "coverage index built");

        // 3. 剔除被覆盖的规则
        let mut rules = Vec::with_capacity(survivors.len());
        for rule in survivors {
            match covering_rule(&rule, &suffixes, &patterns) {
                Some(Coverage::Suffix(by)) => {
                    debug!(rule = %rule, origin = %rule.origin, suffix = by, "covered by suffix");
                    report.suffix_covered += 1;
                }
                Some(Coverage::Pattern(by)) => {
                    debug!(rule = %rule, origin = %rule.origin, pattern = by, "covered by pattern");
                    report.pattern_covered += 1;
                }
                None => rules.push(rule),
            }
        }

        // 4. 排序
        sort_rules(&mut rules);
        report.kept = rules.len();

        info!(
            input = report.input_lines,
            parsed = report.parsed,
            rejected = report.rejected,
            duplicates = report.exact_duplicates + report.priority_replaced,
            covered = report.suffix_covered + report.pattern_covered,
            kept = report.kept,
            "deduplication finished"
        );

        DedupOutcome { rules, report }
    }

    /// 解析所有行，同键保留首次出现，同值跨类型只保留最高优先级的类型
    fn collapse(&self, input: &RuleInput, report: &mut DedupReport) -> Vec<Rule> {
        let mut seen = HashSet::new();
        let mut rules = Vec::new();

        for (origin, line) in &input.lines {
            match parse_line(line, *origin) {
                Ok(Some(rule)) => {
                    report.parsed += 1;
                    if seen.insert(rule.key()) {
                        rules.push(rule);
                    } else {
                        report.exact_duplicates += 1;
                    }
                }
                Ok(None) => report.comments += 1,
                Err(e) => {
                    debug!(origin = %origin, "{}", e);
                    report.rejected += 1;
                }
            }
        }

        let priority = &self.options.priority;
        let mut best: HashMap<String, u8> = HashMap::new();
        for rule in &rules {
            if let Some(rank) = priority.rank(&rule.kind) {
                let entry = best.entry(rule.normalized_value().into_owned()).or_insert(rank);
                *entry = (*entry).max(rank);
            }
        }

        rules.retain(|rule| {
            let Some(rank) = priority.rank(&rule.kind) else {
                return true;
            };
            let value = rule.normalized_value();
            let keep = best.get(&*value).map_or(true, |&top| rank >= top);
            if !keep {
                debug!(rule = %rule, "replaced by a higher-priority kind with the same value");
                report.priority_replaced += 1;
            }
            keep
        });

        rules
    }
}

/// 覆盖关系：
/// - DOMAIN 被祖先或同值 DOMAIN-SUFFIX 覆盖
/// - DOMAIN-SUFFIX 被严格祖先 DOMAIN-SUFFIX 覆盖
/// - DOMAIN / DOMAIN-SUFFIX 被能匹配它（或探测串）的 URL-REGEX 覆盖
fn covering_rule<'a>(
    rule: &Rule,
    suffixes: &'a SuffixIndex,
    patterns: &'a PatternSet,
) -> Option<Coverage<'a>> {
    if suffixes.is_empty() && patterns.is_empty() {
        return None;
    }
    let value = rule.normalized_value();
    match rule.kind {
        RuleKind::Domain => suffixes
            .find_covering(&value)
            .map(Coverage::Suffix)
            .or_else(|| patterns.find_domain_match(&value).map(Coverage::Pattern)),
        RuleKind::DomainSuffix => suffixes
            .find_strict_ancestor(&value)
            .map(Coverage::Suffix)
            .or_else(|| patterns.find_suffix_match(&value).map(Coverage::Pattern)),
        _ => None,
    }
}

/// 便捷入口：默认参数下对若干行去重
pub fn deduplicate<I, S>(lines: I) -> DedupOutcome
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut input = RuleInput::new();
    input.push_lines(Origin::Baseline, lines);
    Deduplicator::new(DedupOptions::default()).run(&input)
}
