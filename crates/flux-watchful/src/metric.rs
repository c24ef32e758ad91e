use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 资源类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// DynamoDB 表
    Table,
    /// SQS 队列
    Queue,
    /// Lambda 函数
    Function,
    /// 自定义类型，需要调用方注册对应的 watcher
    Custom(String),
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Table => f.write_str("table"),
            ResourceKind::Queue => f.write_str("queue"),
            ResourceKind::Function => f.write_str("function"),
            ResourceKind::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// 统计方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Sum,
    Average,
    Minimum,
    Maximum,
    SampleCount,
    /// 百分位，例如 `Percentile(99)` 表示 p99
    Percentile(u8),
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Sum => f.write_str("Sum"),
            Statistic::Average => f.write_str("Average"),
            Statistic::Minimum => f.write_str("Minimum"),
            Statistic::Maximum => f.write_str("Maximum"),
            Statistic::SampleCount => f.write_str("SampleCount"),
            Statistic::Percentile(p) => write!(f, "p{}", p),
        }
    }
}

/// 指标引用：命名空间 + 指标名 + 维度 + 统计方式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRef {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: BTreeMap<String, String>,
    pub statistic: Statistic,
    pub period_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MetricRef {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_statistic(mut self, statistic: Statistic) -> Self {
        self.statistic = statistic;
        self
    }

    pub fn with_period(mut self, period_secs: u32) -> Self {
        self.period_secs = period_secs;
        self
    }
}

/// 被监控资源的句柄
///
/// 对核心来说资源本身是不透明的，只需要稳定的 `identity`、类型，以及生成指标引用的能力
/// （命名空间和维度）。`attributes` 存放 watcher 计算阈值需要的数值属性，
/// 例如表的预置容量、函数超时时间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// 稳定标识（层级路径），例如 `Default/Table`
    pub identity: String,

    /// 资源类型
    pub kind: ResourceKind,

    /// 物理名称，用作指标维度的值
    pub resource_name: String,

    /// 指标命名空间
    pub namespace: String,

    /// 指标维度
    pub dimensions: BTreeMap<String, String>,

    /// 数值属性
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,

    /// 控制台链接
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_url: Option<String>,
}

impl ResourceHandle {
    pub fn new(
        identity: impl Into<String>,
        kind: ResourceKind,
        resource_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            kind,
            resource_name: resource_name.into(),
            namespace: namespace.into(),
            dimensions: BTreeMap::new(),
            attributes: BTreeMap::new(),
            console_url: None,
        }
    }

    /// DynamoDB 表
    pub fn table(identity: impl Into<String>, table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        Self::new(identity, ResourceKind::Table, table_name.clone(), "AWS/DynamoDB")
            .with_dimension("TableName", table_name)
    }

    /// SQS 队列
    pub fn queue(identity: impl Into<String>, queue_name: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        Self::new(identity, ResourceKind::Queue, queue_name.clone(), "AWS/SQS")
            .with_dimension("QueueName", queue_name)
    }

    /// Lambda 函数
    pub fn function(identity: impl Into<String>, function_name: impl Into<String>) -> Self {
        let function_name = function_name.into();
        Self::new(
            identity,
            ResourceKind::Function,
            function_name.clone(),
            "AWS/Lambda",
        )
        .with_dimension("FunctionName", function_name)
    }

    /// 追加指标维度
    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }

    /// 设置数值属性，例如预置容量、超时时间
    pub fn with_attribute(mut self, key: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// 控制台链接，用作分区标题中的按钮
    pub fn with_console_url(mut self, url: impl Into<String>) -> Self {
        self.console_url = Some(url.into());
        self
    }

    /// 读取数值属性，未设置时为 None
    pub fn attribute(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).copied()
    }

    /// 节点 ID：identity 的最后一级
    pub fn node_id(&self) -> &str {
        self.identity
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.identity)
    }

    /// 生成该资源的指标引用
    pub fn metric(&self, metric_name: &str, statistic: Statistic, period_secs: u32) -> MetricRef {
        MetricRef {
            namespace: self.namespace.clone(),
            metric_name: metric_name.to_string(),
            dimensions: self.dimensions.clone(),
            statistic,
            period_secs,
            label: None,
        }
    }
}
