//! # 覆盖索引
//!
//! - `SuffixIndex`: 按反转的域名标签建树，查询代价只与候选域名的标签数有关
//! - `PatternSet`: 预编译的 URL-REGEX 列表，逐条测试（正则规则数量通常很少）

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::error::RuleError;

/// 单个正则编译后的大小上限，防止恶意规则耗尽内存
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

// ========================================
// 域名后缀树
// ========================================

/// 反转标签树：`com -> example -> mail`
#[derive(Debug, Default)]
pub struct SuffixIndex {
    root: Node,
    len: usize,
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    /// 该路径本身是一条已接受的后缀规则
    terminal: Option<String>,
}

impl SuffixIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一个已规范化（小写）的后缀，返回是否为新条目
    pub fn insert(&mut self, suffix: &str) -> bool {
        let suffix = suffix.trim_matches('.');
        if suffix.is_empty() {
            return false;
        }

        let mut node = &mut self.root;
        for label in suffix.rsplit('.') {
            node = node.children.entry(label.to_string()).or_default();
        }
        if node.terminal.is_some() {
            return false;
        }
        node.terminal = Some(suffix.to_string());
        self.len += 1;
        true
    }

    /// 查找覆盖该域名的后缀（祖先或自身）
    pub fn find_covering(&self, domain: &str) -> Option<&str> {
        self.walk(domain, true)
    }

    /// 查找严格祖先后缀（不含自身）
    pub fn find_strict_ancestor(&self, suffix: &str) -> Option<&str> {
        self.walk(suffix, false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 从顶级域开始逐级下行，遇到第一个终止标记即返回
    fn walk(&self, domain: &str, include_self: bool) -> Option<&str> {
        let domain = domain.trim_matches('.');
        if domain.is_empty() {
            return None;
        }

        let mut node = &self.root;
        let mut labels = domain.rsplit('.').peekable();
        while let Some(label) = labels.next() {
            node = node.children.get(label)?;
            let is_last = labels.peek().is_none();
            if let Some(suffix) = &node.terminal {
                if include_self || !is_last {
                    return Some(suffix.as_str());
                }
            }
        }
        None
    }
}

// ========================================
// 正则集合
// ========================================

/// 预编译的正则规则
#[derive(Debug, Default)]
pub struct PatternSet {
    patterns: Vec<(String, Regex)>,
    /// 编译失败的正则，规则保留但不参与覆盖判定
    errors: Vec<RuleError>,
}

impl PatternSet {
    /// 每个正则只编译一次
    pub fn compile<'a>(sources: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::default();
        for source in sources {
            match RegexBuilder::new(source)
                .size_limit(PATTERN_SIZE_LIMIT)
                .build()
            {
                Ok(regex) => set.patterns.push((source.to_string(), regex)),
                Err(e) => set.errors.push(RuleError::PatternCompile {
                    pattern: source.to_string(),
                    reason: e.to_string(),
                }),
            }
        }
        set
    }

    /// 域名本身能被某个正则匹配
    pub fn find_domain_match(&self, domain: &str) -> Option<&str> {
        self.find_match(domain)
    }

    /// 用探测串 `x.<suffix>` 近似“匹配所有以 .suffix 结尾的域名”
    pub fn find_suffix_match(&self, suffix: &str) -> Option<&str> {
        self.find_match(&format!("x.{}", suffix))
    }

    pub fn errors(&self) -> &[RuleError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn find_match(&self, probe: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(probe))
            .map(|(source, _)| source.as_str())
    }
}
