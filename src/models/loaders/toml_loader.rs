use crate::models::template::PaperTemplate;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// 从 TOML 文件加载试卷模板并校验
pub async fn load_toml_to_template(toml_file_path: &Path) -> Result<PaperTemplate> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let mut template: PaperTemplate = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    template
        .validate()
        .with_context(|| format!("模板校验失败: {}", toml_file_path.display()))?;

    // 设置文件路径
    template.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(template)
}

/// 从文件夹中加载所有模板，按作业 ID 索引
///
/// 单个文件加载失败只记录警告，不影响其他模板
pub async fn load_all_templates(folder_path: &str) -> Result<HashMap<String, Arc<PaperTemplate>>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut templates = HashMap::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            tracing::info!(
                "正在加载模板: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_toml_to_template(&path).await {
                Ok(template) => {
                    tracing::info!(
                        "成功加载 {} 个作答区域, {} 道题目",
                        template.rois.len(),
                        template.questions.len()
                    );
                    if let Some(previous) =
                        templates.insert(template.assignment_id.clone(), Arc::new(template))
                    {
                        tracing::warn!(
                            "作业 {} 存在多个模板，后加载的覆盖了 {:?}",
                            previous.assignment_id,
                            previous.file_path
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(templates)
}
