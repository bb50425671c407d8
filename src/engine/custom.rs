//! # 自定义追加 / 排除
//!
//! 在去重之后应用，优先级高于任何覆盖判定：
//! 1. 追加列表无条件并入（即使会被更宽的规则覆盖）
//! 2. 排除列表按规范化值删除，不区分类型（排除优先于追加）
//! 3. 重新排序

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::rule::model::{sort_rules, Origin, Rule};
use crate::rule::parser::parse_line;

/// 自定义应用统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomReport {
    /// 新增的规则数（已存在的不计）
    pub appended: usize,
    /// 被排除的规则数
    pub excluded: usize,
    /// 无法解析的自定义行
    pub rejected: usize,
}

/// 解析后的追加与排除列表
#[derive(Debug, Clone, Default)]
pub struct Customizations {
    append: Vec<Rule>,
    exclude: HashSet<String>,
    rejected: usize,
}

impl Customizations {
    /// 从本地列表的行构建，允许裸值（如 `example.com`）
    pub fn from_lines<A, E>(append: A, exclude: E) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut custom = Self::default();
        for line in append {
            if let Some(rule) = custom.parse_append(line.as_ref()) {
                custom.append.push(rule);
            }
        }
        for line in exclude {
            let line = line.as_ref().trim();
            match parse_line(line, Origin::LocalCustom) {
                Ok(Some(rule)) => {
                    custom.exclude.insert(rule.normalized_value().into_owned());
                }
                Ok(None) => {}
                // `CN`、`13335` 这类裸值无法推断类型，按原文匹配
                Err(_) => {
                    custom.exclude.insert(line.to_string());
                }
            }
        }
        custom
    }

    /// 去重结果 ∪ 追加 − 排除，然后排序
    pub fn apply(&self, mut rules: Vec<Rule>) -> (Vec<Rule>, CustomReport) {
        let mut report = CustomReport {
            rejected: self.rejected,
            ..Default::default()
        };

        let mut seen: HashSet<_> = rules.iter().map(Rule::key).collect();
        for rule in &self.append {
            if seen.insert(rule.key()) {
                rules.push(rule.clone());
                report.appended += 1;
            }
        }

        rules.retain(|rule| {
            let excluded = self.exclude.contains(&*rule.normalized_value());
            if excluded {
                debug!(rule = %rule, "excluded by custom list");
                report.excluded += 1;
            }
            !excluded
        });

        sort_rules(&mut rules);
        (rules, report)
    }

    fn parse_append(&mut self, line: &str) -> Option<Rule> {
        match parse_line(line, Origin::LocalCustom) {
            Ok(rule) => rule,
            Err(e) => {
                warn!("skipping custom entry: {}", e);
                self.rejected += 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dedup::deduplicate;

    fn lines(rules: &[Rule]) -> Vec<String> {
        rules.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn append_bypasses_coverage_and_exclude_removes() {
        let deduped = deduplicate([
            "DOMAIN-SUFFIX,example.com",
            "DOMAIN,foo.example.com",
            "DOMAIN,other.net",
        ]);
        let custom = Customizations::from_lines(["DOMAIN,special.example.com"], ["DOMAIN,other.net"]);
        let (rules, report) = custom.apply(deduped.rules);
        assert_eq!(
            lines(&rules),
            vec!["DOMAIN,special.example.com", "DOMAIN-SUFFIX,example.com"]
        );
        assert_eq!(report.appended, 1);
        assert_eq!(report.excluded, 1);
    }

    #[test]
    fn exclude_ignores_kind_and_case() {
        let deduped = deduplicate(["DOMAIN-SUFFIX,Tracker.net", "DOMAIN,keep.example"]);
        let custom = Customizations::from_lines(Vec::<String>::new(), ["tracker.NET"]);
        let (rules, _) = custom.apply(deduped.rules);
        assert_eq!(lines(&rules), vec!["DOMAIN,keep.example"]);
    }

    #[test]
    fn exclude_wins_over_append() {
        let custom = Customizations::from_lines(["DOMAIN,a.example"], ["a.example"]);
        let (rules, report) = custom.apply(Vec::new());
        assert!(rules.is_empty());
        assert_eq!(report.appended, 1);
        assert_eq!(report.excluded, 1);
    }

    #[test]
    fn append_does_not_duplicate_existing_rules() {
        let deduped = deduplicate(["IP-CIDR,10.0.0.0/8,no-resolve"]);
        let custom = Customizations::from_lines(["IP-CIDR,10.0.0.0/8", "# comment"], Vec::<&str>::new());
        let (rules, report) = custom.apply(deduped.rules);
        assert_eq!(lines(&rules), vec!["IP-CIDR,10.0.0.0/8,no-resolve"]);
        assert_eq!(report.appended, 0);
    }

    #[test]
    fn unparseable_append_entries_are_counted() {
        let custom = Customizations::from_lines(["not a rule", "nodot"], Vec::<&str>::new());
        let (rules, report) = custom.apply(Vec::new());
        assert!(rules.is_empty());
        assert_eq!(report.rejected, 2);
    }

    #[test]
    fn bare_excludes_match_network_and_unknown_values() {
        let deduped = deduplicate([
            "GEOIP,CN",
            "IP-ASN,13335,no-resolve",
            "PROCESS-NAME,telegram",
            "DOMAIN,keep.example",
        ]);
        let custom = Customizations::from_lines(Vec::<&str>::new(), ["CN", " 13335 ", "telegram"]);
        let (rules, report) = custom.apply(deduped.rules);
        assert_eq!(lines(&rules), vec!["DOMAIN,keep.example"]);
        assert_eq!(report.excluded, 3);
        assert_eq!(report.rejected, 0);
    }
}
