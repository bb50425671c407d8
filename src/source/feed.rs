//! # 规则源文本预处理
//!
//! 把抓取到的原始文本切成候选规则行，交给去重引擎：
//! - 基础模块：跳过 `[Rule]` 之前的元数据
//! - 补充规则：按形状粗筛
//! - 本地列表：去掉空行与注释

/// 基础模块中规则段的起始标记
pub const RULE_SECTION: &str = "[Rule]";

/// 补充规则中视为结构/元数据的行首
const STRUCTURAL_MARKERS: [&str; 7] = ["#", ";", "//", "[", "!", "{", "}"];

/// 本地列表中的注释前缀
const LIST_COMMENT_MARKERS: [&str; 3] = ["#", ";", "//"];

/// 提取基础模块 `[Rule]` 段之后的候选行
///
/// 没有 `[Rule]` 段时返回 `None`，调用方应视为规则源不可用。
pub fn extract_module_rules(content: &str) -> Option<Vec<String>> {
    let mut lines = content.lines().map(str::trim);
    lines.find(|line| line.eq_ignore_ascii_case(RULE_SECTION))?;

    Some(
        lines
            .filter(|line| {
                !line.is_empty()
                    && !line.starts_with('[')
                    && !LIST_COMMENT_MARKERS.iter().any(|m| line.starts_with(m))
            })
            .map(str::to_string)
            .collect(),
    )
}

/// 补充规则：保留看起来像规则的行（含 `,` `.` `:`，且不以结构标记开头）
pub fn filter_supplemental(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !STRUCTURAL_MARKERS.iter().any(|m| line.starts_with(m))
                && (line.contains(',') || line.contains('.') || line.contains(':'))
        })
        .map(str::to_string)
        .collect()
}

/// 本地列表：每行一条，忽略空行与注释
pub fn read_list_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !LIST_COMMENT_MARKERS.iter().any(|m| line.starts_with(m)))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_header_is_skipped() {
        let content = "#!name=Direct\n#!desc=demo\nDOMAIN,before.example\n[Rule]\n# comment\nDOMAIN-SUFFIX,example.com,DIRECT\n\n  DOMAIN,foo.example.com,DIRECT  \n";
        assert_eq!(
            extract_module_rules(content).unwrap(),
            vec!["DOMAIN-SUFFIX,example.com,DIRECT", "DOMAIN,foo.example.com,DIRECT"]
        );
    }

    #[test]
    fn later_section_headers_are_not_rules() {
        let content = "[Rule]\nDOMAIN,a.example\n[URL Rewrite]\nDOMAIN,b.example";
        assert_eq!(
            extract_module_rules(content).unwrap(),
            vec!["DOMAIN,a.example", "DOMAIN,b.example"]
        );
    }

    #[test]
    fn missing_rule_section_is_reported() {
        assert_eq!(extract_module_rules("DOMAIN,a.example\n"), None);
        assert_eq!(extract_module_rules(""), None);
        assert_eq!(extract_module_rules("[Rule]\n"), Some(Vec::new()));
    }

    #[test]
    fn supplemental_lines_are_filtered_by_shape() {
        let content = "payload\n# c\n[meta]\n{\n}\n! adblock\nDOMAIN,a.example\nexample.org\n2001:db8::/32\nlocalhost\n";
        assert_eq!(
            filter_supplemental(content),
            vec!["DOMAIN,a.example", "example.org", "2001:db8::/32"]
        );
    }

    #[test]
    fn list_comments_are_ignored() {
        let content = "# note\n; note\n// note\n\nDOMAIN,a.example\n  example.org  \n";
        assert_eq!(read_list_lines(content), vec!["DOMAIN,a.example", "example.org"]);
    }
}
