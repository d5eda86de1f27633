//! 日志工具模块
//!
//! - `init`：安装 tracing 订阅者
//! - `RunLog`：一次批量评分的运行日志，进度输出到 tracing，
//!   批次结果、失败答题卡和最终统计同时追加到日志文件

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RULE: usize = 60;

/// 初始化 tracing 订阅者
///
/// 级别由 `RUST_LOG` 控制，默认 `info`；重复调用不会报错
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 一次批量评分的运行日志
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    path: Option<PathBuf>,
}

impl RunLog {
    /// 不写文件，只输出到 tracing
    pub fn disabled() -> Self {
        Self::default()
    }

    /// 创建日志文件并写入带时间的标题（覆盖旧文件）
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let header = format!(
            "{}\n答题卡评分日志 - {}\n{}\n",
            "=".repeat(RULE),
            now(),
            "=".repeat(RULE)
        );
        fs::write(&path, header)
            .with_context(|| format!("无法写入日志文件: {}", path.display()))?;
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn startup(&self, max_concurrent: usize) {
        info!("🚀 评分启动，最大并发数: {}", max_concurrent);
        self.append(&format!("最大并发数: {}", max_concurrent));
    }

    pub fn papers_loaded(&self, total: usize, per_batch: usize) {
        info!("✓ 共 {} 份待评分的答题卡，每批 {} 份", total, per_batch);
    }

    pub fn batch_start(
        &self,
        batch_num: usize,
        total_batches: usize,
        first: usize,
        last: usize,
        total: usize,
    ) {
        info!("\n{}", "=".repeat(RULE));
        info!(
            "📦 第 {}/{} 批：答题卡 {}-{} / 共 {} 份",
            batch_num, total_batches, first, last, total
        );
    }

    pub fn batch_complete(&self, batch_num: usize, success: usize, total: usize) {
        info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
        self.append(&format!("[{}] 第 {} 批: 成功 {}/{}", now(), batch_num, success, total));
    }

    pub fn paper_failed(&self, submission_id: &str, reason: &str) {
        self.append(&format!("  ❌ {}: {}", submission_id, reason));
    }

    /// 汇总统计，写入 tracing 和日志文件
    pub fn final_stats(&self, success: usize, failed: usize, total: usize) {
        info!("\n{}", "=".repeat(RULE));
        info!("📊 全部评分完成 ({})", now());
        info!("✅ 成功: {}/{}", success, total);
        info!("❌ 失败: {}", failed);
        if let Some(path) = &self.path {
            info!("日志文件: {}", path.display());
        }
        self.append(&format!(
            "[{}] 完成: 成功 {}/{}, 失败 {}",
            now(),
            success,
            total,
            failed
        ));
    }

    fn append(&self, line: &str) {
        let Some(path) = &self.path else {
            return;
        };
        let written = OpenOptions::new()
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{}", line));
        if let Err(e) = written {
            warn!("⚠️ 写入日志文件失败 ({}): {}", path.display(), e);
        }
    }
}

/// 截断长文本用于日志显示（按字符计数）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
