pub mod archive;
pub mod encoding;
pub mod tex_extractor;

pub use archive::ArchiveUnpacker;
pub use tex_extractor::TexExtractor;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::utils::HarvestResult;

/// 一篇论文的提取产物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub archive: PathBuf,
    pub tex_dir: PathBuf,
    pub figures_path: PathBuf,
    pub tables_path: PathBuf,
    pub figure_count: usize,
    pub table_count: usize,
    pub skipped_entries: usize,
}

/// 统一提取管道：解压源码包，再扫描 TeX 文件
pub struct ExtractionPipeline {
    unpacker: ArchiveUnpacker,
    extractor: TexExtractor,
}

impl ExtractionPipeline {
    pub fn new(config: &ExtractorConfig) -> HarvestResult<Self> {
        Ok(Self {
            unpacker: ArchiveUnpacker::new(&config.archive_suffix),
            extractor: TexExtractor::new(config)?,
        })
    }

    /// 在 source_dir 中找源码包并解压到 output_dir，输出 figures.txt / tables.txt
    pub fn process(&self, source_dir: &Path, output_dir: &Path) -> HarvestResult<ExtractionOutput> {
        info!("开始提取管道: {}", source_dir.display());

        // 1. 解压
        let unpacked = self.unpacker.unpack(source_dir, output_dir)?;
        debug!("{} -> {} 个条目", unpacked.archive.display(), unpacked.extracted);
        if unpacked.skipped > 0 {
            warn!("{} 中有 {} 个条目未解压", unpacked.archive.display(), unpacked.skipped);
        }

        // 2. 提取 figure / table
        let blocks = self.extractor.extract_dir(&unpacked.tex_dir)?;

        // 3. 写出
        let (figures_path, tables_path) = tex_extractor::write_blocks(&blocks, output_dir)?;
        info!("图: {}", figures_path.display());
        info!("表: {}", tables_path.display());

        Ok(ExtractionOutput {
            archive: unpacked.archive,
            tex_dir: unpacked.tex_dir,
            figures_path,
            tables_path,
            figure_count: blocks.figures.len(),
            table_count: blocks.tables.len(),
            skipped_entries: unpacked.skipped,
        })
    }
}
