use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::encoding::decode_lossy;
use crate::config::ExtractorConfig;
use crate::utils::HarvestResult;

/// 按遍历顺序收集的 figure / table 环境
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBlocks {
    pub figures: Vec<String>,
    pub tables: Vec<String>,
    pub files_scanned: usize,
}

impl ExtractedBlocks {
    fn append(&mut self, other: ExtractedBlocks) {
        self.figures.extend(other.figures);
        self.tables.extend(other.tables);
        self.files_scanned += other.files_scanned;
    }
}

/// 基于正则的 figure / table 提取，不解析 TeX 结构：
/// 不处理嵌套，缺少 \end 的 \begin 不产生匹配
pub struct TexExtractor {
    figure: Regex,
    table: Regex,
    tex_suffix: String,
}

/// (?s) 跨行，.*? 取到最近的结束标记
fn environment_pattern(env: &str, include_starred: bool) -> String {
    let env = regex::escape(env);
    let plain = format!(r"\\begin\{{{0}\}}.*?\\end\{{{0}\}}", env);
    if include_starred {
        format!(r"(?s){plain}|\\begin\{{{0}\*\}}.*?\\end\{{{0}\*\}}", env)
    } else {
        format!("(?s){plain}")
    }
}

impl TexExtractor {
    pub fn new(config: &ExtractorConfig) -> HarvestResult<Self> {
        Ok(Self {
            figure: Regex::new(&environment_pattern("figure", config.include_starred))?,
            table: Regex::new(&environment_pattern("table", config.include_starred))?,
            tex_suffix: config.tex_suffix.clone(),
        })
    }

    /// 从一段 TeX 文本中按文档顺序提取
    pub fn extract(&self, content: &str) -> ExtractedBlocks {
        let figures: Vec<String> = self
            .figure
            .find_iter(content)
            .map(|m| m.as_str().to_string())
            .collect();
        let tables: Vec<String> = self
            .table
            .find_iter(content)
            .map(|m| m.as_str().to_string())
            .collect();

        ExtractedBlocks {
            figures,
            tables,
            files_scanned: 0,
        }
    }

    pub fn extract_file(&self, path: &Path) -> HarvestResult<ExtractedBlocks> {
        let raw = std::fs::read(path)?;
        let (content, encoding) = decode_lossy(&raw);
        debug!("{} 编码: {}", path.display(), encoding.name());

        let mut blocks = self.extract(&content);
        blocks.files_scanned = 1;
        debug!(
            "{}: {} 个图, {} 个表",
            path.display(),
            blocks.figures.len(),
            blocks.tables.len()
        );
        Ok(blocks)
    }

    /// 递归扫描目录下全部 TeX 文件，同级按文件名排序
    pub fn extract_dir(&self, dir: &Path) -> HarvestResult<ExtractedBlocks> {
        let mut all = ExtractedBlocks::default();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if !entry.file_name().to_string_lossy().ends_with(&self.tex_suffix) {
                continue;
            }
            all.append(self.extract_file(entry.path())?);
        }

        info!(
            "扫描 {} 个TeX文件: {} 个图, {} 个表",
            all.files_scanned,
            all.figures.len(),
            all.tables.len()
        );
        Ok(all)
    }
}

/// 写出 figures.txt / tables.txt，条目之间空一行
pub fn write_blocks(blocks: &ExtractedBlocks, output_dir: &Path) -> HarvestResult<(PathBuf, PathBuf)> {
    let figures_path = output_dir.join("figures.txt");
    let tables_path = output_dir.join("tables.txt");

    std::fs::write(&figures_path, blocks.figures.join("\n\n"))?;
    std::fs::write(&tables_path, blocks.tables.join("\n\n"))?;

    Ok((figures_path, tables_path))
}
