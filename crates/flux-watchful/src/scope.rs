use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// 路径分隔符
pub const PATH_SEPARATOR: &str = "/";

/// 定义作用域
///
/// 每个告警、每个 watcher 都挂在一个作用域下，作用域路径由父路径和节点 ID 组成，
/// 例如 `Default/watchful/Table/CapacityAlarm:write`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    path: String,
}

impl Scope {
    /// 创建根作用域
    pub fn root(id: impl Into<String>) -> Self {
        Self {
            path: sanitize_id(&id.into()),
        }
    }

    /// 创建子作用域，节点 ID 中的 `/` 会被替换为 `--`
    pub fn child(&self, id: &str) -> Self {
        let id = sanitize_id(id);
        let path = if self.path.is_empty() {
            id
        } else {
            format!("{}{}{}", self.path, PATH_SEPARATOR, id)
        };
        Self { path }
    }

    /// 完整路径，同时作为该作用域下告警的 ID
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 最后一级节点 ID
    pub fn node_id(&self) -> &str {
        self.path
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(&self.path)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::root("Default")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// 正在构建的告警的上下文，动态动作绑定通过它拿到告警自身的路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmContext {
    /// 告警路径（同时也是告警 ID）
    pub path: String,

    /// 告警节点 ID，例如 `CapacityAlarm:write`
    pub name: String,

    /// 被监控资源的标识
    pub resource_identity: String,

    /// 告警所基于的指标名称
    pub metric_name: String,
}

impl AlarmContext {
    /// 由告警作用域生成上下文
    pub fn new(scope: &Scope, resource_identity: &str, metric_name: &str) -> Self {
        Self {
            path: scope.path().to_string(),
            name: scope.node_id().to_string(),
            resource_identity: resource_identity.to_string(),
            metric_name: metric_name.to_string(),
        }
    }
}

/// 路径摘要：SHA-256 的前 8 位十六进制（大写）
///
/// 同一路径的结果始终相同，用于给重名节点和逻辑 ID 追加后缀。
pub fn path_hash(path: &str) -> String {
    let mut h = Sha256::new();
    h.update(path.as_bytes());
    hex::encode_upper(&h.finalize()[..4])
}

fn sanitize_id(id: &str) -> String {
    id.replace(PATH_SEPARATOR, "--")
}
