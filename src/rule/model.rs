//! # 规则数据模型
//!
//! 定义规则类型、单条规则、来源标记和规则分类（策略）。

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 无需 DNS 解析的修饰符，IP 类规则在输出时必须携带
pub const NO_RESOLVE: &str = "no-resolve";

// ========================================
// 规则分类（策略）
// ========================================

/// 规则策略，同时也是一次独立处理的分类
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RulePolicy {
    /// 直连（不走代理）
    Direct,
    /// 走代理
    Proxy,
    /// 拒绝连接
    Reject,
}

impl RulePolicy {
    /// 全部分类，按固定顺序处理
    pub const ALL: [RulePolicy; 3] = [RulePolicy::Direct, RulePolicy::Proxy, RulePolicy::Reject];

    /// 文件名中使用的小写名称
    pub fn as_str(&self) -> &'static str {
        match self {
            RulePolicy::Direct => "direct",
            RulePolicy::Proxy => "proxy",
            RulePolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for RulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ========================================
// 规则类型
// ========================================

/// 规则类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKind {
    /// 精确域名
    Domain,
    /// 域名后缀
    DomainSuffix,
    /// 正则规则（Mihomo 中为 DOMAIN-REGEX）
    UrlRegex,
    /// IPv4 网段
    IpCidr,
    /// IPv6 网段
    IpCidr6,
    /// 自治系统号
    IpAsn,
    /// 国家/地区
    GeoIp,
    /// 未识别的类型，原样保留（大写后的类型名）
    Unknown(String),
}

impl RuleKind {
    /// 从类型标记解析，`_` 视同 `-`，不区分大小写
    pub fn from_token(token: &str) -> Self {
        let token = token.trim().to_ascii_uppercase().replace('_', "-");
        match token.as_str() {
            "DOMAIN" => RuleKind::Domain,
            "DOMAIN-SUFFIX" => RuleKind::DomainSuffix,
            "URL-REGEX" | "DOMAIN-REGEX" => RuleKind::UrlRegex,
            "IP-CIDR" => RuleKind::IpCidr,
            "IP-CIDR6" => RuleKind::IpCidr6,
            "IP-ASN" => RuleKind::IpAsn,
            "GEOIP" => RuleKind::GeoIp,
            _ => RuleKind::Unknown(token),
        }
    }

    /// Shadowrocket（源格式）中的类型名
    pub fn name(&self) -> &str {
        match self {
            RuleKind::Domain => "DOMAIN",
            RuleKind::DomainSuffix => "DOMAIN-SUFFIX",
            RuleKind::UrlRegex => "URL-REGEX",
            RuleKind::IpCidr => "IP-CIDR",
            RuleKind::IpCidr6 => "IP-CIDR6",
            RuleKind::IpAsn => "IP-ASN",
            RuleKind::GeoIp => "GEOIP",
            RuleKind::Unknown(token) => token,
        }
    }

    /// 值按域名处理（小写比较）
    pub fn is_domain(&self) -> bool {
        matches!(self, RuleKind::Domain | RuleKind::DomainSuffix)
    }

    /// 输出时需要 no-resolve 的 IP 类规则
    pub fn is_ip(&self) -> bool {
        matches!(self, RuleKind::IpCidr | RuleKind::IpCidr6 | RuleKind::IpAsn)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ========================================
// 规则来源
// ========================================

/// 规则来源，仅用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// 基础规则模块
    Baseline,
    /// 远程补充规则
    Supplemental,
    /// 本地自定义规则
    LocalCustom,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Baseline => write!(f, "baseline"),
            Origin::Supplemental => write!(f, "remote-supplemental"),
            Origin::LocalCustom => write!(f, "local-custom"),
        }
    }
}

// ========================================
// 单条规则
// ========================================

/// 规则的身份键：类型 + 规范化后的值
pub type RuleKey = (RuleKind, String);

/// 单条分流规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// 规则类型 (DOMAIN-SUFFIX, IP-CIDR 等)
    pub kind: RuleKind,
    /// 规则值，保留原始大小写
    pub value: String,
    /// 修饰符（有序、无重复）
    pub modifiers: Vec<String>,
    /// 来源
    pub origin: Origin,
}

impl Rule {
    pub fn new(kind: RuleKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            modifiers: Vec::new(),
            origin: Origin::Baseline,
        }
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// 追加修饰符，已存在（不区分大小写）时忽略
    pub fn with_modifier(mut self, modifier: &str) -> Self {
        if !self.has_modifier(modifier) {
            self.modifiers.push(modifier.to_string());
        }
        self
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m.eq_ignore_ascii_case(modifier))
    }

    /// 比较用的值：域名类去掉首尾的 `.` 并小写，其余原样
    pub fn normalized_value(&self) -> Cow<'_, str> {
        if self.kind.is_domain() {
            Cow::Owned(self.value.trim_matches('.').to_ascii_lowercase())
        } else {
            Cow::Borrowed(self.value.as_str())
        }
    }

    pub fn key(&self) -> RuleKey {
        (self.kind.clone(), self.normalized_value().into_owned())
    }
}

impl fmt::Display for Rule {
    /// 源格式的规范行：`KIND,value[,modifier...]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.kind, self.value)?;
        for modifier in &self.modifiers {
            write!(f, ",{}", modifier)?;
        }
        Ok(())
    }
}

/// 确定性排序：类型名、规范化值、原始值
///
/// 类型名中只出现字母、数字和 `-`，均大于 `,`，所以该顺序与规范行的字典序一致。
pub fn sort_rules(rules: &mut [Rule]) {
    rules.sort_by(|a, b| {
        a.kind
            .name()
            .cmp(b.kind.name())
            .then_with(|| a.normalized_value().cmp(&b.normalized_value()))
            .then_with(|| a.value.cmp(&b.value))
    });
}
