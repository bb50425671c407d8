//! # 规则文件管理器
//!
//! 负责自定义列表的读取、输出目录的初始化和规则文件的写入。
//!
//! ## 目录结构
//! ```text
//! custom/
//!   direct-url.list        补充规则源（每行一个 URL 或本地路径）
//!   direct.list            本地规则（不去重，直接并入）
//!   direct_append.list     无条件追加
//!   direct_excludes.list   排除
//! <output>/shadowrocket/direct.list
//! <output>/mihomo/direct.list
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::formatter::{create_formatter, Dialect};
use super::model::RulePolicy;
use crate::source::feed::read_list_lines;

/// 自定义列表种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomList {
    /// 补充规则源地址
    SourceUrls,
    /// 本地规则，不参与去重
    Local,
    /// 无条件追加
    Append,
    /// 排除
    Excludes,
}

impl CustomList {
    fn file_name(&self, policy: RulePolicy) -> String {
        match self {
            CustomList::SourceUrls => format!("{}-url.list", policy),
            CustomList::Local => format!("{}.list", policy),
            CustomList::Append => format!("{}_append.list", policy),
            CustomList::Excludes => format!("{}_excludes.list", policy),
        }
    }
}

/// 规则文件管理器
#[derive(Debug, Clone)]
pub struct RuleFileManager {
    /// 自定义列表目录
    custom_dir: PathBuf,
    /// 输出根目录
    output_dir: PathBuf,
}

impl RuleFileManager {
    /// 创建新的管理器实例
    pub fn new(custom_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            custom_dir: custom_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// 自定义列表路径
    pub fn custom_list_path(&self, policy: RulePolicy, list: CustomList) -> PathBuf {
        self.custom_dir.join(list.file_name(policy))
    }

    /// 获取指定格式和分类的规则文件路径
    pub fn rule_file_path(&self, dialect: Dialect, policy: RulePolicy) -> PathBuf {
        self.output_dir
            .join(dialect.dir_name())
            .join(format!("{}.{}", policy, create_formatter(dialect).file_extension()))
    }

    /// 读取自定义列表，文件不存在时视为空
    pub fn read_custom_list(&self, policy: RulePolicy, list: CustomList) -> Result<Vec<String>> {
        let path = self.custom_list_path(policy, list);
        if !path.is_file() {
            info!("custom list not found (optional): {}", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read custom list {}", path.display()))?;
        let lines = read_list_lines(&content);
        info!("read {} entries from {}", lines.len(), path.display());
        Ok(lines)
    }

    /// 确保所有输出目录存在
    pub fn init(&self) -> Result<()> {
        for dialect in Dialect::ALL {
            let dir = self.output_dir.join(dialect.dir_name());
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// 写入规则文件（整体覆盖），返回写入的路径
    pub fn write_rules(&self, dialect: Dialect, policy: RulePolicy, content: &str) -> Result<PathBuf> {
        let path = self.rule_file_path(dialect, policy);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("wrote {} rules to {}", content.lines().count(), path.display());
        Ok(path)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_layout() {
        let manager = RuleFileManager::new("custom", "out");
        assert_eq!(
            manager.custom_list_path(RulePolicy::Direct, CustomList::SourceUrls),
            PathBuf::from("custom/direct-url.list")
        );
        assert_eq!(
            manager.custom_list_path(RulePolicy::Proxy, CustomList::Local),
            PathBuf::from("custom/proxy.list")
        );
        assert_eq!(
            manager.custom_list_path(RulePolicy::Reject, CustomList::Append),
            PathBuf::from("custom/reject_append.list")
        );
        assert_eq!(
            manager.custom_list_path(RulePolicy::Reject, CustomList::Excludes),
            PathBuf::from("custom/reject_excludes.list")
        );
        assert_eq!(
            manager.rule_file_path(Dialect::Mihomo, RulePolicy::Proxy),
            PathBuf::from("out/mihomo/proxy.list")
        );
    }

    #[test]
    fn missing_custom_list_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RuleFileManager::new(dir.path(), dir.path());
        let lines = manager
            .read_custom_list(RulePolicy::Direct, CustomList::Append)
            .unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn custom_list_comments_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("direct_excludes.list"),
            "# excluded\nDOMAIN,other.net\n\n// more\nexample.org\n",
        )
        .unwrap();
        let manager = RuleFileManager::new(dir.path(), dir.path());
        let lines = manager
            .read_custom_list(RulePolicy::Direct, CustomList::Excludes)
            .unwrap();
        assert_eq!(lines, vec!["DOMAIN,other.net", "example.org"]);
    }

    #[test]
    fn writes_create_directories_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let manager = RuleFileManager::new(dir.path(), dir.path().join("out"));
        manager.init().unwrap();
        assert!(dir.path().join("out/shadowrocket").is_dir());
        assert!(dir.path().join("out/mihomo").is_dir());

        manager
            .write_rules(Dialect::Shadowrocket, RulePolicy::Direct, "DOMAIN,a.example\n")
            .unwrap();
        let path = manager
            .write_rules(Dialect::Shadowrocket, RulePolicy::Direct, "DOMAIN,b.example\n")
            .unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "DOMAIN,b.example\n");
    }
}
