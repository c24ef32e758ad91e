use crate::metric::ResourceKind;
use thiserror::Error;

/// 监控注册错误类型
#[derive(Error, Debug)]
pub enum WatchError {
    /// 没有为该资源类型注册 watcher
    #[error("Unsupported resource kind: {0}")]
    UnsupportedKind(ResourceKind),

    /// 调用方声明的类型与资源句柄不一致
    #[error("Resource kind mismatch for {identity}: requested {requested}, handle is {actual}")]
    KindMismatch {
        identity: String,
        requested: ResourceKind,
        actual: ResourceKind,
    },

    /// 作用域路径已被其他资源占用
    #[error("Scope path already in use: {0}")]
    ScopeConflict(String),

    /// 动态告警动作绑定失败
    #[error("Alarm action binding failed for {alarm}: {source}")]
    Binding {
        alarm: String,
        #[source]
        source: anyhow::Error,
    },

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 配置源读取错误
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// 产物输出错误
    #[error("Artifact sink error: {0}")]
    Sink(String),
}

/// 监控注册结果类型
pub type Result<T> = std::result::Result<T, WatchError>;

impl WatchError {
    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        WatchError::Config(msg.into())
    }

    /// 创建产物输出错误
    pub fn sink(msg: impl Into<String>) -> Self {
        WatchError::Sink(msg.into())
    }

    /// 是否为配置类错误（调用方需要修正定义后重新运行）
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WatchError::UnsupportedKind(_)
                | WatchError::KindMismatch { .. }
                | WatchError::ScopeConflict(_)
                | WatchError::Config(_)
                | WatchError::ConfigSource(_)
        )
    }
}
