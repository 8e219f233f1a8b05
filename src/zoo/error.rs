use crate::nn::GraphError;
use thiserror::Error;

/// 模型构建/加载错误
#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("模型配置无效：{0}")]
    InvalidConfig(String),
    #[error("读取配置文件失败：{0}")]
    Io(#[from] std::io::Error),
    #[error("解析 JSON 配置失败：{0}")]
    Json(#[from] serde_json::Error),
}
