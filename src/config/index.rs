use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::utils::{HarvestError, HarvestResult};

/// 数据集索引文件：顶层为对象，键即论文标识符，值不使用
#[derive(Debug, Clone)]
pub struct IndexFile {
    pub path: PathBuf,
    pub identifiers: Vec<String>,
}

impl IndexFile {
    pub fn load(path: &Path) -> HarvestResult<Self> {
        if !path.is_file() {
            return Err(HarvestError::NotFound(format!(
                "索引文件不存在: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let identifiers = Self::parse_keys(&content)
            .map_err(|e| HarvestError::Parse(format!("{}: {}", path.display(), e)))?;

        info!("读取索引文件 {}: {} 个标识符", path.display(), identifiers.len());

        Ok(Self {
            path: path.to_path_buf(),
            identifiers,
        })
    }

    fn parse_keys(content: &str) -> Result<Vec<String>, String> {
        let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        match value {
            Value::Object(map) => Ok(map.keys().cloned().collect()),
            other => Err(format!("顶层应为 JSON 对象，实际为 {}", json_kind(&other))),
        }
    }

    /// 该索引文件在输出根目录下对应的目录（保留索引文件的相对路径，含文件名）
    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        let mut dir = output_root.to_path_buf();
        for component in self.path.components() {
            if let Component::Normal(part) = component {
                dir.push(part);
            }
        }
        dir
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
