pub mod function;
pub mod queue;
pub mod table;

pub use function::FunctionWatcher;
pub use queue::QueueWatcher;
pub use table::TableWatcher;

use crate::action::DynamicBinding;
use crate::alarm::{AlarmDescriptor, AlarmFactory, MetricSpec, PolicyOverride, ThresholdPolicy};
use crate::config::check_percent;
use crate::dashboard::DashboardSection;
use crate::error::Result;
use crate::metric::{ResourceHandle, ResourceKind};
use std::collections::BTreeMap;

/// 资源 watcher
///
/// 每种资源类型一个实现，负责给出该类型的默认指标与阈值，
/// 并通过 [`WatchContext`] 构建告警和仪表盘分区。新增资源类型只需实现该 trait
/// 并注册到 `Watchful`。
pub trait ResourceWatcher: Send + Sync {
    /// 处理的资源类型
    fn kind(&self) -> ResourceKind;

    /// 构建告警和仪表盘分区
    fn watch(&self, ctx: &WatchContext<'_>, handle: &ResourceHandle) -> Result<WatchOutput>;
}

/// 单次 watch 调用的选项
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// 分区标题，默认为资源节点 ID
    pub title: Option<String>,

    /// 覆盖注册表默认的静态动作（整体替换）
    pub alarm_action_arns: Option<Vec<String>>,

    /// 覆盖注册表默认的动态动作（整体替换）
    pub alarm_actions: Option<Vec<DynamicBinding>>,

    /// 覆盖按百分比计算的阈值（表容量、函数超时）
    pub threshold_percent: Option<f64>,

    /// 按指标名称覆盖阈值策略
    pub overrides: BTreeMap<String, PolicyOverride>,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_alarm_action_arns<I, S>(mut self, arns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alarm_action_arns = Some(arns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_alarm_actions(mut self, actions: Vec<DynamicBinding>) -> Self {
        self.alarm_actions = Some(actions);
        self
    }

    pub fn with_threshold_percent(mut self, percent: f64) -> Self {
        self.threshold_percent = Some(percent);
        self
    }

    pub fn with_override(mut self, metric_name: impl Into<String>, policy: PolicyOverride) -> Self {
        self.overrides.insert(metric_name.into(), policy);
        self
    }

    /// 校验调用方覆盖，规则与注册表配置一致
    pub fn validate(&self) -> Result<()> {
        if let Some(percent) = self.threshold_percent {
            check_percent("threshold_percent", percent)?;
        }
        for (metric_name, policy) in &self.overrides {
            policy.validate(&format!("overrides.{}", metric_name))?;
        }
        Ok(())
    }
}

/// watch 结果
#[derive(Debug, Clone, PartialEq)]
pub struct WatchOutput {
    pub alarms: Vec<AlarmDescriptor>,
    pub section: DashboardSection,
}

/// 传给 watcher 的上下文
///
/// 持有该资源的告警工厂（作用域 + 本次生效的动作来源）以及调用选项。
pub struct WatchContext<'a> {
    factory: AlarmFactory,
    title: String,
    options: &'a WatchOptions,
}

impl<'a> WatchContext<'a> {
    pub fn new(factory: AlarmFactory, title: impl Into<String>, options: &'a WatchOptions) -> Self {
        Self {
            factory,
            title: title.into(),
            options,
        }
    }

    /// 分区标题
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn factory(&self) -> &AlarmFactory {
        &self.factory
    }

    /// 百分比阈值：调用方覆盖优先
    pub fn threshold_percent(&self, default: f64) -> f64 {
        self.options.threshold_percent.unwrap_or(default)
    }

    /// 应用调用方对某个指标的覆盖
    pub fn policy(&self, metric_name: &str, default: ThresholdPolicy) -> ThresholdPolicy {
        match self.options.overrides.get(metric_name) {
            Some(policy_override) => default.apply(policy_override),
            None => default,
        }
    }

    /// 构建告警，默认策略会先经过覆盖
    pub fn build_alarm(
        &self,
        handle: &ResourceHandle,
        spec: &MetricSpec,
        default: ThresholdPolicy,
    ) -> Result<AlarmDescriptor> {
        let policy = self.policy(&spec.metric_name, default);
        self.factory.build(handle, spec, &policy)
    }

    /// 带标题和控制台链接的分区
    pub fn heading(&self, handle: &ResourceHandle, console_label: &str) -> DashboardSection {
        let links = handle
            .console_url
            .iter()
            .map(|url| (console_label.to_string(), url.clone()))
            .collect::<Vec<_>>();
        DashboardSection::with_heading(self.title.clone(), &links).for_resource(&handle.identity)
    }
}
