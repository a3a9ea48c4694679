use flate2::read::GzDecoder;
use serde::Serialize;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::utils::{HarvestError, HarvestResult};

pub const TEX_DIR_NAME: &str = "tex_files";

#[derive(Debug, Clone, Serialize)]
pub struct UnpackOutcome {
    pub archive: PathBuf,
    pub tex_dir: PathBuf,
    pub extracted: usize,
    /// 路径越界等被拒绝写入的条目
    pub skipped: usize,
}

pub struct ArchiveUnpacker {
    suffix: String,
}

impl ArchiveUnpacker {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
        }
    }

    /// 在目录树中找第一个以压缩包后缀结尾的文件
    pub fn find_archive(&self, source_dir: &Path) -> HarvestResult<PathBuf> {
        if !source_dir.is_dir() {
            return Err(HarvestError::NotFound(format!(
                "源码目录不存在: {}",
                source_dir.display()
            )));
        }

        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file()
                && entry.file_name().to_string_lossy().ends_with(&self.suffix)
            {
                return Ok(entry.into_path());
            }
        }

        Err(HarvestError::NotFound(format!(
            "{} 中没有 {} 文件",
            source_dir.display(),
            self.suffix
        )))
    }

    /// 解压到 `<output_dir>/tex_files`；找不到压缩包时不创建该目录
    pub fn unpack(&self, source_dir: &Path, output_dir: &Path) -> HarvestResult<UnpackOutcome> {
        let archive = self.find_archive(source_dir)?;
        info!("解压: {}", archive.display());

        let mut payload = Vec::new();
        GzDecoder::new(std::fs::File::open(&archive)?)
            .read_to_end(&mut payload)
            .map_err(|e| HarvestError::Parse(format!("无法解压 {}: {}", archive.display(), e)))?;

        let tex_dir = output_dir.join(TEX_DIR_NAME);
        std::fs::create_dir_all(&tex_dir)?;

        let (extracted, skipped) = if is_tar(&payload) {
            unpack_tar(&payload, &tex_dir)?
        } else {
            // 单文件投稿：gzip 里直接是 .tex
            let target = tex_dir.join(format!("{}.tex", self.archive_stem(&archive)));
            warn!("{} 不是 tar 包，按单个TeX文件写入 {}", archive.display(), target.display());
            std::fs::write(&target, &payload)?;
            (1, 0)
        };

        info!("解压完成: {} 个条目 -> {}", extracted, tex_dir.display());
        Ok(UnpackOutcome {
            archive,
            tex_dir,
            extracted,
            skipped,
        })
    }

    fn archive_stem(&self, archive: &Path) -> String {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        name.strip_suffix(&self.suffix).unwrap_or(&name).to_string()
    }
}

fn is_tar(payload: &[u8]) -> bool {
    payload.len() >= 262 && &payload[257..262] == b"ustar"
}

/// 只允许普通相对路径，拒绝绝对路径和 `..`
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn unpack_tar(payload: &[u8], tex_dir: &Path) -> HarvestResult<(usize, usize)> {
    let mut archive = tar::Archive::new(Cursor::new(payload));
    let mut extracted = 0;
    let mut skipped = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        if !is_contained(&path) {
            warn!("跳过越界条目: {}", path.display());
            skipped += 1;
            continue;
        }

        if entry.unpack_in(tex_dir)? {
            extracted += 1;
        } else {
            warn!("跳过条目: {}", path.display());
            skipped += 1;
        }
    }

    Ok((extracted, skipped))
}
