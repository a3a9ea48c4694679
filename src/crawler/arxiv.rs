use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Paper, PaperSource};
use crate::config::ArxivConfig;
use crate::utils::{safe_id, HarvestError, HarvestResult};

pub struct ArxivClient {
    client: Client,
    api_url: String,
    source_base_url: String,
}

impl ArxivClient {
    pub fn new(config: &ArxivConfig) -> HarvestResult<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            source_base_url: config.source_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn query(&self, params: &[(&str, String)]) -> HarvestResult<Vec<Paper>> {
        let response = self.client.get(&self.api_url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Transfer {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        debug!("arXiv 响应状态: {}, 内容长度: {} 字节", status, text.len());

        parse_atom(&text)
    }

    fn source_url(&self, id: &str) -> String {
        format!("{}/{}", self.source_base_url, id)
    }
}

impl PaperSource for ArxivClient {
    async fn lookup(&self, id: &str) -> HarvestResult<Option<Paper>> {
        info!("按ID查询 arXiv: {}", id);
        let papers = self
            .query(&[("id_list", id.to_string()), ("max_results", "1".to_string())])
            .await?;
        Ok(papers.into_iter().next())
    }

    async fn search(&self, query: &str, max_results: usize) -> HarvestResult<Vec<Paper>> {
        info!("检索 arXiv: {} (最多 {} 条)", query, max_results);
        let papers = self
            .query(&[
                ("search_query", query.to_string()),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", "relevance".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .await?;
        info!("找到 {} 篇论文", papers.len());
        Ok(papers)
    }

    async fn fetch_bytes(&self, url: &str) -> HarvestResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Transfer {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn download_source(&self, paper: &Paper, dir: &Path) -> HarvestResult<PathBuf> {
        let url = self.source_url(&paper.id);
        info!("下载源码: {} -> {}", url, dir.display());

        let bytes = self.fetch_bytes(&url).await?;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.tar.gz", safe_id(&paper.id)));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

/// 从条目URL取短标识符：http://arxiv.org/abs/2404.12720v1 -> 2404.12720v1
pub fn short_id(entry_id: &str) -> String {
    match entry_id.find("/abs/") {
        Some(pos) => entry_id[pos + "/abs/".len()..].to_string(),
        None => entry_id.rsplit('/').next().unwrap_or(entry_id).to_string(),
    }
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    categories: Vec<String>,
    pdf_url: Option<String>,
    in_author: bool,
    text: String,
}

impl EntryBuilder {
    fn take_attrs(&mut self, e: &BytesStart) {
        match e.local_name().as_ref() {
            b"category" => {
                if let Some(term) = attr(e, b"term") {
                    if !term.trim().is_empty() {
                        self.categories.push(term);
                    }
                }
            }
            b"link" => {
                let is_pdf = attr(e, b"title").as_deref() == Some("pdf")
                    || attr(e, b"type").as_deref() == Some("application/pdf");
                if is_pdf {
                    self.pdf_url = attr(e, b"href");
                }
            }
            _ => {}
        }
    }

    fn build(self) -> Option<Paper> {
        // 未知ID时 arXiv 返回一条 id 指向 api/errors 的条目
        if self.id.is_empty() || self.id.contains("/api/errors") {
            return None;
        }
        Some(Paper {
            id: short_id(&self.id),
            entry_id: self.id,
            title: self.title,
            authors: self.authors,
            summary: self.summary,
            published: self.published,
            pdf_url: self.pdf_url,
            categories: self.categories,
        })
    }
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 解析 arXiv API 返回的 Atom feed
pub fn parse_atom(xml: &str) -> HarvestResult<Vec<Paper>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = e.local_name();
                if name.as_ref() == b"entry" {
                    entry = Some(EntryBuilder::default());
                } else if let Some(cur) = entry.as_mut() {
                    if name.as_ref() == b"author" {
                        cur.in_author = true;
                    }
                    cur.take_attrs(&e);
                    cur.text.clear();
                }
            }
            Event::Empty(e) => {
                if let Some(cur) = entry.as_mut() {
                    cur.take_attrs(&e);
                }
            }
            Event::Text(t) => {
                if let Some(cur) = entry.as_mut() {
                    cur.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) => {
                if let Some(cur) = entry.as_mut() {
                    cur.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                if name.as_ref() == b"entry" {
                    if let Some(paper) = entry.take().and_then(EntryBuilder::build) {
                        papers.push(paper);
                    }
                    continue;
                }
                if let Some(cur) = entry.as_mut() {
                    let text = normalize_ws(&cur.text);
                    match name.as_ref() {
                        b"id" => cur.id = text,
                        b"title" => cur.title = text,
                        b"summary" => cur.summary = text,
                        b"published" => cur.published = text,
                        b"name" if cur.in_author && !text.is_empty() => cur.authors.push(text),
                        b"author" => cur.in_author = false,
                        _ => {}
                    }
                    cur.text.clear();
                }
            }
            _ => {}
        }
    }

    if papers.is_empty() {
        warn!("Atom feed 中没有可用的论文条目");
    }

    Ok(papers)
}
