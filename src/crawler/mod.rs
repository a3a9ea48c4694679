pub mod arxiv;
pub mod fetcher;

pub use arxiv::ArxivClient;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::utils::{HarvestError, HarvestResult};

/// 论文元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// 短标识符，如 2404.12720v1
    pub id: String,
    /// 条目URL，如 http://arxiv.org/abs/2404.12720v1
    pub entry_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub published: String,
    pub pdf_url: Option<String>,
    pub categories: Vec<String>,
}

/// 远程论文仓库：按ID查询、检索、下载
pub trait PaperSource {
    /// 按标识符精确查询，最多一条
    async fn lookup(&self, id: &str) -> HarvestResult<Option<Paper>>;

    /// 按相关度排序的检索，最多 max_results 条
    async fn search(&self, query: &str, max_results: usize) -> HarvestResult<Vec<Paper>>;

    /// 阻塞式 GET，状态码非成功时返回 Transfer
    async fn fetch_bytes(&self, url: &str) -> HarvestResult<Vec<u8>>;

    /// 将源码压缩包写入 dir，返回压缩包路径
    async fn download_source(&self, paper: &Paper, dir: &Path) -> HarvestResult<PathBuf>;
}

/// 论文定位方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionRequest {
    ByIdentifier(String),
    ByQuery { text: String, max_results: usize },
}

/// 解析出一篇论文；检索模式取排名第一的结果
pub async fn resolve<S: PaperSource>(source: &S, request: &ResolutionRequest) -> HarvestResult<Paper> {
    let paper = match request {
        ResolutionRequest::ByIdentifier(id) => source
            .lookup(id)
            .await?
            .ok_or_else(|| HarvestError::NotFound(format!("arXiv 中没有论文: {}", id)))?,
        ResolutionRequest::ByQuery { text, max_results } => {
            let papers = source.search(text, (*max_results).max(1)).await?;
            if papers.is_empty() {
                warn!("检索无结果: {}", text);
            }
            papers
                .into_iter()
                .next()
                .ok_or_else(|| HarvestError::EmptyResult(text.clone()))?
        }
    };

    info!("找到论文: {} by {}", paper.title, paper.authors.join(", "));
    debug!("{} 发布于 {}, 分类 {:?}", paper.entry_id, paper.published, paper.categories);
    Ok(paper)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    /// 内存中的论文仓库，供测试使用
    #[derive(Default)]
    pub struct FakeSource {
        pub papers: HashMap<String, Paper>,
        /// url -> 内容
        pub files: HashMap<String, Vec<u8>>,
        /// paper id -> 源码压缩包字节
        pub sources: HashMap<String, Vec<u8>>,
    }

    impl FakeSource {
        pub fn with_paper(mut self, id: &str, tex: &str) -> Self {
            let pdf_url = format!("https://arxiv.test/pdf/{}", id);
            self.files.insert(pdf_url.clone(), b"%PDF-1.4 fake".to_vec());
            self.sources
                .insert(id.to_string(), tar_gz(&[("main.tex", tex.as_bytes())]));
            self.papers.insert(id.to_string(), paper(id, Some(pdf_url)));
            self
        }
    }

    pub fn paper(id: &str, pdf_url: Option<String>) -> Paper {
        Paper {
            id: id.to_string(),
            entry_id: format!("http://arxiv.org/abs/{}", id),
            title: format!("Paper {}", id),
            authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
            summary: String::new(),
            published: "2024-04-19T00:00:00Z".to_string(),
            pdf_url,
            categories: vec!["cs.CL".to_string()],
        }
    }

    pub fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    pub fn gz(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    impl PaperSource for FakeSource {
        async fn lookup(&self, id: &str) -> HarvestResult<Option<Paper>> {
            Ok(self.papers.get(id).cloned())
        }

        async fn search(&self, query: &str, max_results: usize) -> HarvestResult<Vec<Paper>> {
            let mut hits: Vec<Paper> = self
                .papers
                .values()
                .filter(|p| p.title.contains(query))
                .cloned()
                .collect();
            hits.sort_by(|a, b| a.id.cmp(&b.id));
            hits.truncate(max_results);
            Ok(hits)
        }

        async fn fetch_bytes(&self, url: &str) -> HarvestResult<Vec<u8>> {
            self.files.get(url).cloned().ok_or(HarvestError::Transfer {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn download_source(&self, paper: &Paper, dir: &Path) -> HarvestResult<PathBuf> {
            let data = self.sources.get(&paper.id).ok_or(HarvestError::Transfer {
                url: format!("https://arxiv.test/e-print/{}", paper.id),
                status: 404,
            })?;
            std::fs::create_dir_all(dir)?;
            let path = dir.join(format!("{}.tar.gz", crate::utils::safe_id(&paper.id)));
            std::fs::write(&path, data)?;
            Ok(path)
        }
    }
}
