//! # 规则生成流程
//!
//! 每个分类（direct / proxy / reject）独立处理，互不共享索引或中间结果：
//! 1. 拉取基础模块，失败则跳过该分类（不覆盖已有输出）
//! 2. 拉取补充规则源、读取本地列表
//! 3. 去重 → 本地规则与追加列表并入、排除 → 两种格式
//! 4. 写入 shadowrocket/ 与 mihomo/
//!
//! `build_category` 是不含 I/O 的纯函数，`Pipeline` 负责外部协作者。

use std::path::PathBuf;

use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, info_span, warn};

use crate::config::Config;
use crate::engine::{CustomReport, Customizations, DedupOptions, DedupReport, Deduplicator, RuleInput};
use crate::error::RuleError;
use crate::rule::formatter::{create_formatter, Dialect};
use crate::rule::manager::{CustomList, RuleFileManager};
use crate::rule::model::{Origin, Rule, RulePolicy};
use crate::source::feed::{extract_module_rules, filter_supplemental};
use crate::source::fetch::Fetcher;

// ========================================
// 纯计算部分
// ========================================

/// 一个分类已完全就绪的输入
#[derive(Debug, Clone, Default)]
pub struct CategoryInput {
    /// 基础模块原文，`None` 表示拉取失败
    pub baseline: Option<String>,
    /// 拉取成功的补充规则原文
    pub supplemental: Vec<String>,
    /// 本地规则行，与追加列表一样不参与去重
    pub local: Vec<String>,
    /// 无条件追加
    pub append: Vec<String>,
    /// 排除
    pub exclude: Vec<String>,
}

/// 一个分类的生成结果
#[derive(Debug, Clone)]
pub struct CategoryOutput {
    /// 规范规则集（已应用自定义，已排序）
    pub rules: Vec<Rule>,
    /// 每种格式的文件内容
    pub files: Vec<(Dialect, String)>,
    pub dedup: DedupReport,
    pub custom: CustomReport,
}

impl CategoryOutput {
    pub fn content(&self, dialect: Dialect) -> Option<&str> {
        self.files
            .iter()
            .find(|(d, _)| *d == dialect)
            .map(|(_, content)| content.as_str())
    }
}

/// 合并 → 去重 → 自定义 → 格式化
pub fn build_category(
    policy: RulePolicy,
    input: &CategoryInput,
    options: &DedupOptions,
) -> std::result::Result<CategoryOutput, RuleError> {
    let unavailable = |reason: &str| RuleError::SourceUnavailable {
        category: policy.to_string(),
        reason: reason.to_string(),
    };

    let baseline = match input.baseline.as_deref() {
        Some(content) if !content.trim().is_empty() => content,
        Some(_) => return Err(unavailable("baseline content is empty")),
        None => return Err(unavailable("baseline could not be fetched")),
    };
    let baseline_lines =
        extract_module_rules(baseline).ok_or_else(|| unavailable("baseline has no [Rule] section"))?;
    if baseline_lines.is_empty() {
        return Err(unavailable("baseline [Rule] section has no rules"));
    }
    info!("processed {} baseline lines", baseline_lines.len());

    let mut merged = RuleInput::new();
    merged.push_lines(Origin::Baseline, baseline_lines);
    for content in &input.supplemental {
        let lines = filter_supplemental(content);
        info!("added {} supplemental lines", lines.len());
        merged.push_lines(Origin::Supplemental, lines);
    }

    let outcome = Deduplicator::new(options.clone()).run(&merged);
    let custom = Customizations::from_lines(input.local.iter().chain(&input.append), &input.exclude);
    let (rules, custom_report) = custom.apply(outcome.rules);

    let files = Dialect::ALL
        .iter()
        .map(|&dialect| (dialect, create_formatter(dialect).generate_file_content(&rules)))
        .collect();

    Ok(CategoryOutput {
        rules,
        files,
        dedup: outcome.report,
        custom: custom_report,
    })
}

// ========================================
// 运行结果
// ========================================

/// 单个分类的处理状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CategoryStatus {
    /// 两种格式均已写入
    Completed,
    /// 基础规则源不可用，输出保持不变
    Skipped { reason: String },
    /// 读写本地文件失败
    Failed { reason: String },
}

/// 单个分类的处理摘要
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub category: RulePolicy,
    #[serde(flatten)]
    pub status: CategoryStatus,
    /// 最终写入的规则条数
    pub rules: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup: Option<DedupReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
}

impl CategorySummary {
    fn new(category: RulePolicy, status: CategoryStatus) -> Self {
        Self {
            category,
            status,
            rules: 0,
            dedup: None,
            custom: None,
            files: Vec::new(),
        }
    }
}

/// 一次运行的全部结果
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub categories: Vec<CategorySummary>,
}

impl RunSummary {
    /// 所有分类都已完成
    pub fn success(&self) -> bool {
        self.categories
            .iter()
            .all(|c| c.status == CategoryStatus::Completed)
    }
}

// ========================================
// 带 I/O 的流程
// ========================================

pub struct Pipeline {
    config: Config,
    manager: RuleFileManager,
    fetcher: Fetcher,
    options: DedupOptions,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let manager = RuleFileManager::new(&config.custom_dir, &config.output_dir);
        manager.init()?;
        let fetcher = Fetcher::new(&config.fetch)?;
        Ok(Self {
            config,
            manager,
            fetcher,
            options: DedupOptions::default(),
        })
    }

    /// 处理所选分类；`parallel` 时各分类并行执行
    pub fn run(&self, policies: &[RulePolicy], parallel: bool) -> RunSummary {
        let categories = if parallel {
            policies.par_iter().map(|&p| self.run_category(p)).collect()
        } else {
            policies.iter().map(|&p| self.run_category(p)).collect()
        };
        RunSummary { categories }
    }

    /// 处理单个分类，任何失败都只影响该分类
    pub fn run_category(&self, policy: RulePolicy) -> CategorySummary {
        let span = info_span!("category", name = %policy);
        let _guard = span.enter();
        info!("processing");

        let input = match self.gather_input(policy) {
            Ok(input) => input,
            Err(e) => {
                error!("{:#}", e);
                return CategorySummary::new(policy, CategoryStatus::Failed { reason: format!("{:#}", e) });
            }
        };

        let output = match build_category(policy, &input, &self.options) {
            Ok(output) => output,
            Err(e) => {
                error!("{}; skipping this category", e);
                return CategorySummary::new(policy, CategoryStatus::Skipped { reason: e.to_string() });
            }
        };

        let mut summary = CategorySummary::new(policy, CategoryStatus::Completed);
        summary.rules = output.rules.len();
        summary.dedup = Some(output.dedup.clone());
        summary.custom = Some(output.custom.clone());
        for (dialect, content) in &output.files {
            match self.manager.write_rules(*dialect, policy, content) {
                Ok(path) => summary.files.push(path),
                Err(e) => {
                    error!("{:#}", e);
                    summary.status = CategoryStatus::Failed { reason: format!("{:#}", e) };
                }
            }
        }

        info!(
            rules = output.rules.len(),
            appended = output.custom.appended,
            excluded = output.custom.excluded,
            "category finished"
        );
        summary
    }

    /// 拉取并读取一个分类的全部输入
    ///
    /// 基础模块拉取失败时不再读取其余来源，`baseline` 为 `None`。
    fn gather_input(&self, policy: RulePolicy) -> Result<CategoryInput> {
        let baseline_source = self.config.baseline_for(policy);
        let baseline = match self.fetcher.fetch(&baseline_source) {
            Ok(content) => content,
            Err(e) => {
                warn!("{}", e);
                return Ok(CategoryInput::default());
            }
        };

        let urls = self.manager.read_custom_list(policy, CustomList::SourceUrls)?;
        let supplemental: Vec<String> = self.fetcher.fetch_many(&urls).into_iter().flatten().collect();
        if supplemental.len() < urls.len() {
            warn!("{} of {} supplemental sources failed", urls.len() - supplemental.len(), urls.len());
        }

        Ok(CategoryInput {
            baseline: Some(baseline),
            supplemental,
            local: self.manager.read_custom_list(policy, CustomList::Local)?,
            append: self.manager.read_custom_list(policy, CustomList::Append)?,
            exclude: self.manager.read_custom_list(policy, CustomList::Excludes)?,
        })
    }
}
