//! # 规则类型优先级
//!
//! 仅在多个类型共享同一个规范化值时决定保留哪一条，覆盖判定不看优先级。

use super::model::RuleKind;

/// 类型 → 优先级（数值越大意图越具体）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    pub pattern: u8,
    pub domain_suffix: u8,
    pub domain: u8,
    pub network: u8,
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self {
            pattern: 3,
            domain_suffix: 2,
            domain: 1,
            network: 0,
        }
    }
}

impl PriorityTable {
    /// 未知类型没有优先级，不参与跨类型取舍
    pub fn rank(&self, kind: &RuleKind) -> Option<u8> {
        match kind {
            RuleKind::UrlRegex => Some(self.pattern),
            RuleKind::DomainSuffix => Some(self.domain_suffix),
            RuleKind::Domain => Some(self.domain),
            RuleKind::IpCidr | RuleKind::IpCidr6 | RuleKind::IpAsn | RuleKind::GeoIp => {
                Some(self.network)
            }
            RuleKind::Unknown(_) => None,
        }
    }
}
