//! # proxy-rules
//!
//! 分流规则集生成工具。
//!
//! ## 使用
//! ```bash
//! # 生成全部分类（direct / proxy / reject）
//! proxy-rules generate
//!
//! # 只生成 reject，输出到 dist/，打印 JSON 摘要
//! proxy-rules generate --category reject --out-dir dist --json
//!
//! # 对本地文件去重并以 Mihomo 格式输出到 stdout
//! proxy-rules dedup a.list b.list --dialect mihomo
//! ```

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use proxy_rules::engine::{Customizations, DedupOptions, Deduplicator, RuleInput};
use proxy_rules::pipeline::CategoryStatus;
use proxy_rules::rule::{create_formatter, Dialect, Origin, RulePolicy};
use proxy_rules::{Config, Pipeline};

// ========================================
// CLI 参数定义
// ========================================

/// 分流规则集合并、去重与格式转换工具
#[derive(Parser)]
#[command(name = "proxy-rules")]
#[command(version)]
#[command(about = "Merge, deduplicate and convert Shadowrocket / Mihomo rule sets")]
struct Cli {
    /// 显示调试日志（RUST_LOG 优先）
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 支持的子命令
#[derive(Subcommand)]
enum Commands {
    /// 拉取规则源并生成各分类的规则文件
    Generate {
        /// JSON 配置文件 (可选)
        #[arg(long, short = 'c', value_name = "PATH")]
        config: Option<PathBuf>,

        /// 自定义列表目录 (覆盖配置)
        #[arg(long, value_name = "DIR")]
        custom_dir: Option<PathBuf>,

        /// 输出根目录 (覆盖配置)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// 只处理指定分类 (可多次指定，默认全部)
        #[arg(long, value_enum)]
        category: Vec<RulePolicy>,

        /// 逐个处理分类 (默认并行)
        #[arg(long)]
        sequential: bool,

        /// 以 JSON 输出运行摘要
        #[arg(long)]
        json: bool,
    },
    /// 对本地规则文件去重并输出到 stdout
    Dedup {
        /// 输入文件，按顺序合并
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 输出格式
        #[arg(long, value_enum, default_value_t = Dialect::Shadowrocket)]
        dialect: Dialect,

        /// 追加列表 (可选)
        #[arg(long, value_name = "PATH")]
        append: Option<PathBuf>,

        /// 排除列表 (可选)
        #[arg(long, value_name = "PATH")]
        exclude: Option<PathBuf>,
    },
}

// ========================================
// 主函数
// ========================================

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            config,
            custom_dir,
            out_dir,
            category,
            sequential,
            json,
        } => run_generate(config, custom_dir, out_dir, category, sequential, json),
        Commands::Dedup {
            files,
            dialect,
            append,
            exclude,
        } => run_dedup(&files, dialect, append, exclude).map(|_| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// 日志输出到 stderr，stdout 留给规则/摘要
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ========================================
// generate
// ========================================

/// 返回值表示是否所有分类都已完成
fn run_generate(
    config_path: Option<PathBuf>,
    custom_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    categories: Vec<RulePolicy>,
    sequential: bool,
    json_output: bool,
) -> Result<bool> {
    let mut config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(dir) = custom_dir {
        config.custom_dir = dir;
    }
    if let Some(dir) = out_dir {
        config.output_dir = dir;
    }

    let categories = if categories.is_empty() {
        RulePolicy::ALL.to_vec()
    } else {
        categories
    };

    let pipeline = Pipeline::new(config)?;
    let summary = pipeline.run(&categories, !sequential);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for category in &summary.categories {
            match &category.status {
                CategoryStatus::Completed => {
                    println!("{:<8}\tcompleted\t{} rules", category.category, category.rules);
                }
                CategoryStatus::Skipped { reason } => {
                    println!("{:<8}\tskipped\t{}", category.category, reason);
                }
                CategoryStatus::Failed { reason } => {
                    println!("{:<8}\tfailed\t{}", category.category, reason);
                }
            }
        }
    }

    if !summary.success() {
        warn!("not all categories were generated");
    }
    Ok(summary.success())
}

// ========================================
// dedup
// ========================================

fn run_dedup(
    files: &[PathBuf],
    dialect: Dialect,
    append: Option<PathBuf>,
    exclude: Option<PathBuf>,
) -> Result<()> {
    let mut input = RuleInput::new();
    for path in files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        input.push_lines(Origin::LocalCustom, content.lines());
    }

    let outcome = Deduplicator::new(DedupOptions::default()).run(&input);
    let append = read_optional_list(append)?;
    let exclude = read_optional_list(exclude)?;
    let (rules, report) = Customizations::from_lines(&append, &exclude).apply(outcome.rules);
    info!(appended = report.appended, excluded = report.excluded, "customizations applied");

    print!("{}", create_formatter(dialect).generate_file_content(&rules));
    Ok(())
}

fn read_optional_list(path: Option<PathBuf>) -> Result<Vec<String>> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(proxy_rules::source::read_list_lines(&content))
        }
        None => Ok(Vec::new()),
    }
}
