pub mod index;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::Result;

pub use index::IndexFile;

pub const CONFIG_PATH: &str = "config/settings.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub batch: BatchConfig,
    pub arxiv: ArxivConfig,
    pub extractor: ExtractorConfig,
}

/// 批处理：索引文件列表与输出根目录
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub index_files: Vec<PathBuf>,
    pub output_root: PathBuf,
    /// 相对于 output_root
    pub report_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArxivConfig {
    pub api_url: String,
    pub source_base_url: String,
    pub user_agent: String,
    /// 整个请求（含响应体）的超时；缺省不限时，慢速链路上的大文件也能下完
    pub timeout_secs: Option<u64>,
    /// 两篇论文之间的间隔，arXiv 要求至少3秒
    pub request_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub archive_suffix: String,
    pub tex_suffix: String,
    /// 同时匹配 figure* / table*
    pub include_starred: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    /// 读取配置文件（可不存在），再叠加 TEXHARVEST_ 前缀的环境变量
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: &Path, env: config::Environment) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(env)
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// TEXHARVEST_BATCH__OUTPUT_ROOT=out；索引文件列表以逗号分隔：
/// TEXHARVEST_BATCH__INDEX_FILES=a.json,b.json
fn environment() -> config::Environment {
    config::Environment::with_prefix("TEXHARVEST")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("batch.index_files")
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            index_files: vec![
                PathBuf::from("test-A/SPIQA_testA.json"),
                PathBuf::from("test-B/SPIQA_testB.json"),
                PathBuf::from("test-C/SPIQA_testC.json"),
            ],
            output_root: PathBuf::from("dataset"),
            report_file: PathBuf::from("batch_report.json"),
        }
    }
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            api_url: "https://export.arxiv.org/api/query".to_string(),
            source_base_url: "https://arxiv.org/e-print".to_string(),
            user_agent: "texharvest/0.1 (academic research)".to_string(),
            timeout_secs: None,
            request_delay_ms: 3000,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            archive_suffix: ".tar.gz".to_string(),
            tex_suffix: ".tex".to_string(),
            include_starred: false,
        }
    }
}
