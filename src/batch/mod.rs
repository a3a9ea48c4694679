pub mod report;

pub use report::{BatchReport, IndexFailure, PaperArtifacts, PaperOutcome, PaperResult, Stage};

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::config::{BatchConfig, IndexFile};
use crate::crawler::{fetcher, resolve, PaperSource, ResolutionRequest};
use crate::parser::ExtractionPipeline;
use crate::utils::{safe_id, HarvestResult};

/// 逐个标识符顺序执行 解析 -> 下载 -> 提取，单篇失败不影响其余
pub struct BatchDriver<S: PaperSource> {
    source: S,
    pipeline: ExtractionPipeline,
    request_delay: Duration,
}

impl<S: PaperSource> BatchDriver<S> {
    pub fn new(source: S, pipeline: ExtractionPipeline, request_delay: Duration) -> Self {
        Self {
            source,
            pipeline,
            request_delay,
        }
    }

    pub async fn run(&self, batch: &BatchConfig) -> BatchReport {
        let mut report = BatchReport::start();
        let mut first = true;

        for index_path in &batch.index_files {
            let index = match IndexFile::load(index_path) {
                Ok(index) => index,
                Err(e) => {
                    error!("索引文件 {} 读取失败: {}", index_path.display(), e);
                    report.index_failures.push(IndexFailure {
                        index_file: index_path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let index_dir = index.output_dir(&batch.output_root);
            for id in &index.identifiers {
                if !first && !self.request_delay.is_zero() {
                    tokio::time::sleep(self.request_delay).await;
                }
                first = false;

                let request = ResolutionRequest::ByIdentifier(id.clone());
                let mut outcome = self.process_paper(&request, &index_dir).await;
                outcome.index_file = Some(index.path.clone());
                report.outcomes.push(outcome);
            }
        }

        report.finish();
        info!(
            "批处理完成: {} 成功, {} 失败, {} 个索引文件无法读取",
            report.succeeded(),
            report.failed(),
            report.index_failures.len()
        );
        report
    }

    /// 处理一篇论文，输出到 `<output_root>/<id>/`
    pub async fn process_paper(&self, request: &ResolutionRequest, output_root: &Path) -> PaperOutcome {
        let identifier = match request {
            ResolutionRequest::ByIdentifier(id) => id.clone(),
            ResolutionRequest::ByQuery { text, .. } => text.clone(),
        };

        let mut stage = Stage::Resolving;
        let result = match self.run_stages(request, output_root, &mut stage).await {
            Ok(artifacts) => {
                info!("[{}] 完成: {}", identifier, artifacts.output_dir.display());
                PaperResult::Succeeded(artifacts)
            }
            Err(e) => {
                error!("[{}] {:?} 阶段失败: {}", identifier, stage, e);
                PaperResult::Failed {
                    stage,
                    reason: e.to_string(),
                }
            }
        };

        PaperOutcome {
            index_file: None,
            identifier,
            result,
        }
    }

    async fn run_stages(
        &self,
        request: &ResolutionRequest,
        output_root: &Path,
        stage: &mut Stage,
    ) -> HarvestResult<PaperArtifacts> {
        // 按ID处理时先建目录，后续阶段失败也会保留
        let planned_dir = match request {
            ResolutionRequest::ByIdentifier(id) => {
                let dir = paper_dir(output_root, id);
                fetcher::ensure_dir(&dir).await?;
                Some(dir)
            }
            ResolutionRequest::ByQuery { .. } => None,
        };

        *stage = Stage::Resolving;
        let paper = resolve(&self.source, request).await?;
        let output_dir = planned_dir.unwrap_or_else(|| paper_dir(output_root, &paper.id));

        *stage = Stage::Fetching;
        let pdf_path = fetcher::download_pdf(&self.source, &paper, &output_dir).await?;
        let source_dir = fetcher::download_source(&self.source, &paper, &output_dir).await?;

        *stage = Stage::Extracting;
        let extraction = self.pipeline.process(&source_dir, &output_dir)?;

        *stage = Stage::Done;
        Ok(PaperArtifacts {
            paper_id: paper.id,
            title: paper.title,
            authors: paper.authors,
            output_dir,
            pdf_path,
            source_dir,
            extraction,
        })
    }
}

fn paper_dir(output_root: &Path, id: &str) -> PathBuf {
    output_root.join(safe_id(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;
    use crate::crawler::testing::FakeSource;

    const TEX: &str = "\\begin{figure}F\\end{figure}\n\\begin{table}T\\end{table}";

    fn driver(source: FakeSource) -> BatchDriver<FakeSource> {
        let pipeline = ExtractionPipeline::new(&ExtractorConfig::default()).unwrap();
        BatchDriver::new(source, pipeline, Duration::ZERO)
    }

    fn write_index(dir: &Path, name: &str, ids: &[&str]) -> PathBuf {
        let map: serde_json::Map<String, serde_json::Value> = ids
            .iter()
            .map(|id| (id.to_string(), serde_json::json!({})))
            .collect();
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(&map).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn failing_identifier_does_not_stop_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let index = write_index(tmp.path(), "index.json", &["1001.0001", "1001.0002", "1001.0003"]);
        let source = FakeSource::default()
            .with_paper("1001.0001", TEX)
            .with_paper("1001.0003", TEX);

        let batch = BatchConfig {
            index_files: vec![index.clone()],
            output_root: tmp.path().join("dataset"),
            report_file: PathBuf::from("batch_report.json"),
        };
        let report = driver(source).run(&batch).await;

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!((report.succeeded(), report.failed()), (2, 1));

        let index_dir = IndexFile::load(&index).unwrap().output_dir(&batch.output_root);
        for id in ["1001.0001", "1001.0003"] {
            let dir = index_dir.join(id);
            assert!(dir.join(format!("{}.pdf", id)).is_file());
            assert!(dir.join(format!("{}.tar.gz", id)).is_file());
            assert!(dir.join("tex_files").join("main.tex").is_file());
            assert_eq!(
                std::fs::read_to_string(dir.join("figures.txt")).unwrap(),
                "\\begin{figure}F\\end{figure}"
            );
            assert_eq!(
                std::fs::read_to_string(dir.join("tables.txt")).unwrap(),
                "\\begin{table}T\\end{table}"
            );
        }

        // 失败的标识符目录同样存在
        assert!(index_dir.join("1001.0002").is_dir());
        let failed = report
            .outcomes
            .iter()
            .find(|o| o.identifier == "1001.0002")
            .unwrap();
        assert!(matches!(
            failed.result,
            PaperResult::Failed { stage: Stage::Resolving, .. }
        ));
        assert_eq!(failed.index_file.as_deref(), Some(index.as_path()));
    }

    #[tokio::test]
    async fn missing_index_file_is_reported_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let good = write_index(tmp.path(), "good.json", &["1001.0001"]);
        let batch = BatchConfig {
            index_files: vec![tmp.path().join("absent.json"), good],
            output_root: tmp.path().join("dataset"),
            report_file: PathBuf::from("batch_report.json"),
        };
        let source = FakeSource::default().with_paper("1001.0001", TEX);

        let report = driver(source).run(&batch).await;
        assert_eq!(report.index_failures.len(), 1);
        assert_eq!(report.succeeded(), 1);
    }

    #[tokio::test]
    async fn missing_pdf_url_fails_in_fetching_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeSource::default().with_paper("1001.0001", TEX);
        if let Some(paper) = source.papers.get_mut("1001.0001") {
            paper.pdf_url = None;
        }

        let request = ResolutionRequest::ByIdentifier("1001.0001".to_string());
        let outcome = driver(source).process_paper(&request, tmp.path()).await;
        assert!(matches!(
            outcome.result,
            PaperResult::Failed { stage: Stage::Fetching, .. }
        ));
        assert!(tmp.path().join("1001.0001").is_dir());
        assert!(!tmp.path().join("1001.0001").join("1001.0001.pdf").exists());
    }

    #[tokio::test]
    async fn query_mode_writes_under_resolved_identifier() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FakeSource::default().with_paper("2404.12720v1", TEX);

        let outcome = driver(source)
            .process_paper(
                &ResolutionRequest::ByQuery {
                    text: "Paper 2404".to_string(),
                    max_results: 1,
                },
                tmp.path(),
            )
            .await;
        match outcome.result {
            PaperResult::Succeeded(artifacts) => {
                assert_eq!(artifacts.output_dir, tmp.path().join("2404.12720v1"));
                assert_eq!(artifacts.extraction.figure_count, 1);
            }
            PaperResult::Failed { reason, .. } => panic!("unexpected failure: {}", reason),
        }
    }

    #[tokio::test]
    async fn unextractable_source_fails_in_extracting_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeSource::default().with_paper("1001.0001", TEX);
        source
            .sources
            .insert("1001.0001".to_string(), b"%PDF-1.5 pdf-only submission".to_vec());

        let request = ResolutionRequest::ByIdentifier("1001.0001".to_string());
        let outcome = driver(source).process_paper(&request, tmp.path()).await;
        assert!(matches!(
            outcome.result,
            PaperResult::Failed { stage: Stage::Extracting, .. }
        ));
        // PDF 保留在磁盘上
        assert!(tmp.path().join("1001.0001").join("1001.0001.pdf").is_file());
    }
}
