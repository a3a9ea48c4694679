pub mod logger;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    /// 文件、目录、压缩包或论文不存在
    #[error("未找到: {0}")]
    NotFound(String),

    /// 索引文件格式错误
    #[error("解析错误: {0}")]
    Parse(String),

    #[error("搜索无结果: {0}")]
    EmptyResult(String),

    /// 论文缺少必要的链接
    #[error("缺少资源: {0}")]
    MissingResource(String),

    #[error("下载失败: {url} 返回状态码 {status}")]
    Transfer { url: String, status: u16 },

    #[error("网络请求错误: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("XML错误: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("正则错误: {0}")]
    Regex(#[from] regex::Error),
}

pub type HarvestResult<T> = Result<T, HarvestError>;

/// 将论文标识符转为可用作单个路径段的形式（旧式ID含 `/`）
pub fn safe_id(id: &str) -> String {
    id.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_id_flattens_old_style_identifiers() {
        assert_eq!(safe_id("hep-th/9901001v2"), "hep-th_9901001v2");
        assert_eq!(safe_id("2404.12720v1"), "2404.12720v1");
    }

    #[test]
    fn transfer_error_names_url_and_status() {
        let err = HarvestError::Transfer {
            url: "https://arxiv.org/pdf/x".to_string(),
            status: 404,
        };
        let msg = err.to_string();
        assert!(msg.contains("https://arxiv.org/pdf/x"));
        assert!(msg.contains("404"));
    }
}
