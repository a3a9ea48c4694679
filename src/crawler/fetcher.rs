use std::path::{Path, PathBuf};
use tracing::info;

use super::{Paper, PaperSource};
use crate::utils::{safe_id, HarvestError, HarvestResult};

/// 创建输出目录（含父目录），已存在时不报错
pub async fn ensure_dir(dir: &Path) -> HarvestResult<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// 下载论文PDF到 `<dir>/<id>.pdf`，返回写入路径
pub async fn download_pdf<S: PaperSource>(source: &S, paper: &Paper, dir: &Path) -> HarvestResult<PathBuf> {
    let url = paper
        .pdf_url
        .as_deref()
        .ok_or_else(|| HarvestError::MissingResource(format!("论文 {} 没有PDF链接", paper.id)))?;

    ensure_dir(dir).await?;
    info!("下载PDF: {} -> {}", url, dir.display());

    // 先取完整响应体，失败时不留下半截文件
    let bytes = source.fetch_bytes(url).await?;
    let pdf_path = dir.join(format!("{}.pdf", safe_id(&paper.id)));
    tokio::fs::write(&pdf_path, bytes).await?;

    info!("PDF下载完成: {}", pdf_path.display());
    Ok(pdf_path)
}

/// 下载源码压缩包到 dir，返回 dir
pub async fn download_source<S: PaperSource>(source: &S, paper: &Paper, dir: &Path) -> HarvestResult<PathBuf> {
    ensure_dir(dir).await?;
    let archive = source.download_source(paper, dir).await?;
    info!("源码下载完成: {}", archive.display());
    Ok(dir.to_path_buf())
}
