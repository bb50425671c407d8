//! # 规则行解析
//!
//! 每行独立解析，无状态。`[Rule]` 等段落标记由 `source::feed` 处理。

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{Origin, Rule, RuleKind, NO_RESOLVE};
use crate::error::{Result, RuleError};

/// 注释前缀
const COMMENT_MARKERS: [&str; 4] = ["#", ";", "//", "!"];

/// 行尾策略标记，解析时去掉
const POLICY_TOKENS: [&str; 3] = ["DIRECT", "PROXY", "REJECT"];

static IPV4_CIDR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}(?:\.\d{1,3}){3}(?:/\d{1,2})?$").unwrap());

/// 空行或注释行
pub fn is_comment(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || COMMENT_MARKERS.iter().any(|m| line.starts_with(m))
}

/// 解析一行规则
///
/// ## 返回
/// - `Ok(Some(rule))`: 解析成功
/// - `Ok(None)`: 空行或注释
/// - `Err(RuleError::Parse)`: 无法识别的行，由调用方计数后跳过
pub fn parse_line(line: &str, origin: Origin) -> Result<Option<Rule>> {
    let line = line.trim();
    if is_comment(line) {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let rule = if fields.len() >= 2 {
        parse_fields(line, &fields)?
    } else {
        classify_bare_value(line)?
    };

    Ok(Some(rule.with_origin(origin)))
}

/// 只关心成功与否的简化接口
pub fn parse_rule(line: &str) -> Option<Rule> {
    parse_line(line, Origin::Baseline).ok().flatten()
}

/// `KIND,value[,modifier...][,POLICY]`
fn parse_fields(line: &str, fields: &[&str]) -> Result<Rule> {
    if fields[0].is_empty() {
        return Err(reject(line, "empty rule kind"));
    }
    if fields[1].is_empty() {
        return Err(reject(line, "empty rule value"));
    }

    let kind = RuleKind::from_token(fields[0]);
    let (value, extras) = if kind == RuleKind::UrlRegex || matches!(kind, RuleKind::Unknown(_)) {
        // 正则和未知类型（如 AND/OR 逻辑规则）的值本身可能含逗号，
        // 只从尾部剥离策略和修饰符，其余原样保留
        let mut end = fields.len();
        while end > 2 && is_trailing_flag(fields[end - 1]) {
            end -= 1;
        }
        let raw: Vec<&str> = line.split(',').collect();
        (raw[1..end].join(",").trim().to_string(), &fields[end..])
    } else {
        (fields[1].to_string(), &fields[2..])
    };

    let mut rule = Rule::new(kind, value);
    for field in extras {
        if field.is_empty() || is_policy(field) {
            continue;
        }
        if field.eq_ignore_ascii_case(NO_RESOLVE) {
            rule = rule.with_modifier(NO_RESOLVE);
        } else {
            rule = rule.with_modifier(field);
        }
    }
    Ok(rule)
}

/// 只有一个字段时按形状推断类型
fn classify_bare_value(value: &str) -> Result<Rule> {
    if IPV4_CIDR.is_match(value) {
        return Ok(Rule::new(RuleKind::IpCidr, value));
    }
    if value.contains(':') && value.contains('/') {
        return Ok(Rule::new(RuleKind::IpCidr6, value));
    }
    if value.contains('.') && value.chars().all(is_hostname_char) {
        return Ok(Rule::new(RuleKind::Domain, value));
    }
    Err(reject(value, "cannot infer rule kind"))
}

fn is_policy(field: &str) -> bool {
    POLICY_TOKENS.iter().any(|p| field.eq_ignore_ascii_case(p))
}

fn is_trailing_flag(field: &str) -> bool {
    field.is_empty() || is_policy(field) || field.eq_ignore_ascii_case(NO_RESOLVE)
}

fn is_hostname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn reject(line: &str, reason: &'static str) -> RuleError {
    RuleError::Parse {
        line: line.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blank_and_comment_lines() {
        for line in ["", "   ", "# note", "; note", "// note", "! note", "  # indented"] {
            assert!(matches!(parse_line(line, Origin::Baseline), Ok(None)), "{line:?}");
        }
    }

    #[test]
    fn parses_kind_value_and_strips_policy() {
        let rule = parse_rule("domain-suffix, Example.com , DIRECT").unwrap();
        assert_eq!(rule.kind, RuleKind::DomainSuffix);
        assert_eq!(rule.value, "Example.com");
        assert!(rule.modifiers.is_empty());
    }

    #[test]
    fn keeps_no_resolve_as_modifier() {
        let rule = parse_rule("IP-CIDR,10.0.0.0/8,PROXY,No-Resolve").unwrap();
        assert_eq!(rule.kind, RuleKind::IpCidr);
        assert_eq!(rule.modifiers, vec![NO_RESOLVE.to_string()]);

        let rule = parse_rule("IP-CIDR,10.0.0.0/8,no-resolve,no-resolve").unwrap();
        assert_eq!(rule.to_string(), "IP-CIDR,10.0.0.0/8,no-resolve");
    }

    #[test]
    fn regex_values_keep_everything_after_kind() {
        let rule = parse_rule(r"URL-REGEX,^https?:\/\/ads\.example\.com,REJECT").unwrap();
        assert_eq!(rule.kind, RuleKind::UrlRegex);
        assert_eq!(rule.value, r"^https?:\/\/ads\.example\.com");
    }

    #[test]
    fn regex_values_may_contain_commas() {
        let rule = parse_rule(r"URL-REGEX,^ad[0-9]{1,3}\.example\.com,REJECT").unwrap();
        assert_eq!(rule.value, r"^ad[0-9]{1,3}\.example\.com");
    }

    #[test]
    fn infers_kind_of_bare_values() {
        assert_eq!(parse_rule("192.168.1.0/24").unwrap().kind, RuleKind::IpCidr);
        assert_eq!(parse_rule("1.1.1.1").unwrap().kind, RuleKind::IpCidr);
        assert_eq!(parse_rule("2001:db8::/32").unwrap().kind, RuleKind::IpCidr6);
        assert_eq!(parse_rule("ads.example.com").unwrap().kind, RuleKind::Domain);
    }

    #[test]
    fn rejects_unrecognized_lines() {
        for line in ["localhost", "payload:", "a b.c", "DOMAIN,", ",example.com"] {
            assert!(
                matches!(parse_line(line, Origin::Baseline), Err(RuleError::Parse { .. })),
                "{line:?}"
            );
        }
    }

    #[test]
    fn unknown_kinds_are_preserved() {
        let rule = parse_rule("PROCESS-NAME,Telegram,DIRECT").unwrap();
        assert_eq!(rule.kind, RuleKind::Unknown("PROCESS-NAME".to_string()));
        assert_eq!(rule.to_string(), "PROCESS-NAME,Telegram");
    }

    #[test]
    fn logical_rules_keep_their_payload() {
        let rule = parse_rule("OR,((DOMAIN,a.com),(DOMAIN,b.com),(DOMAIN,c.com)),REJECT").unwrap();
        assert_eq!(rule.kind, RuleKind::Unknown("OR".to_string()));
        assert_eq!(rule.value, "((DOMAIN,a.com),(DOMAIN,b.com),(DOMAIN,c.com))");
        assert!(rule.modifiers.is_empty());
        assert_eq!(rule.to_string(), "OR,((DOMAIN,a.com),(DOMAIN,b.com),(DOMAIN,c.com))");

        let rule = parse_rule("AND,((DST-PORT,443), (PROTOCOL,UDP)),REJECT,no-resolve").unwrap();
        assert_eq!(rule.value, "((DST-PORT,443), (PROTOCOL,UDP))");
        assert_eq!(rule.modifiers, vec![NO_RESOLVE.to_string()]);
    }

    #[test]
    fn origin_is_attached() {
        let rule = parse_line("DOMAIN,a.com", Origin::Supplemental).unwrap().unwrap();
        assert_eq!(rule.origin, Origin::Supplemental);
    }
}
