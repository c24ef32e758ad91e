use flux_watchful::WatchError;
use thiserror::Error;

/// 渲染错误类型
#[derive(Error, Debug)]
pub enum RenderError {
    /// 两个不同路径生成了相同的逻辑 ID
    #[error("Duplicate logical id {logical_id} for {path}")]
    DuplicateLogicalId { logical_id: String, path: String },

    /// 路径中没有可用于逻辑 ID 的字符
    #[error("Cannot derive logical id from path: {0:?}")]
    EmptyLogicalId(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 写文件错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 渲染结果类型
pub type Result<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for WatchError {
    fn from(err: RenderError) -> Self {
        WatchError::sink(err.to_string())
    }
}
