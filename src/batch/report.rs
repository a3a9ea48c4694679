use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::parser::ExtractionOutput;
use crate::utils::HarvestResult;

/// 单篇论文的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolving,
    Fetching,
    Extracting,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperArtifacts {
    pub paper_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub output_dir: PathBuf,
    pub pdf_path: PathBuf,
    pub source_dir: PathBuf,
    pub extraction: ExtractionOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaperResult {
    Succeeded(PaperArtifacts),
    Failed { stage: Stage, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperOutcome {
    pub index_file: Option<PathBuf>,
    /// 论文ID，检索模式下为检索词
    pub identifier: String,
    pub result: PaperResult,
}

impl PaperOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, PaperResult::Succeeded(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFailure {
    pub index_file: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub index_failures: Vec<IndexFailure>,
    pub outcomes: Vec<PaperOutcome>,
}

impl BatchReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            index_failures: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn save(&self, path: &Path) -> HarvestResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
