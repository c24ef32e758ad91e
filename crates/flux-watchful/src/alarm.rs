use crate::action::{ActionResolver, ActionSources};
use crate::error::{Result, WatchError};
use crate::metric::{MetricRef, ResourceHandle, Statistic};
use crate::scope::{AlarmContext, Scope};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 比较方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    GreaterThanOrEqualToThreshold,
    GreaterThanThreshold,
    LessThanThreshold,
    LessThanOrEqualToThreshold,
}

impl ComparisonOperator {
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOperator::GreaterThanOrEqualToThreshold => value >= threshold,
            ComparisonOperator::GreaterThanThreshold => value > threshold,
            ComparisonOperator::LessThanThreshold => value < threshold,
            ComparisonOperator::LessThanOrEqualToThreshold => value <= threshold,
        }
    }
}

/// 阈值策略
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    pub comparison: ComparisonOperator,
    pub threshold: f64,
    pub evaluation_periods: u32,
    pub statistic: Statistic,
    pub period_secs: u32,
}

impl ThresholdPolicy {
    /// `value > threshold`，单周期
    pub fn above(threshold: f64, statistic: Statistic, period_secs: u32) -> Self {
        Self {
            comparison: ComparisonOperator::GreaterThanThreshold,
            threshold,
            evaluation_periods: 1,
            statistic,
            period_secs,
        }
    }

    /// 校验评估周期、统计周期和阈值
    pub fn validate(&self, field: &str) -> Result<()> {
        check_policy(
            field,
            Some(self.threshold),
            Some(self.evaluation_periods),
            Some(self.period_secs),
        )
    }

    pub fn with_evaluation_periods(mut self, evaluation_periods: u32) -> Self {
        self.evaluation_periods = evaluation_periods;
        self
    }

    /// 应用调用方覆盖，未设置的字段保持默认
    pub fn apply(mut self, policy_override: &PolicyOverride) -> Self {
        if let Some(comparison) = policy_override.comparison {
            self.comparison = comparison;
        }
        if let Some(threshold) = policy_override.threshold {
            self.threshold = threshold;
        }
        if let Some(evaluation_periods) = policy_override.evaluation_periods {
            self.evaluation_periods = evaluation_periods;
        }
        if let Some(statistic) = policy_override.statistic {
            self.statistic = statistic;
        }
        if let Some(period_secs) = policy_override.period_secs {
            self.period_secs = period_secs;
        }
        self
    }
}

/// 单个指标的阈值覆盖
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverride {
    pub comparison: Option<ComparisonOperator>,
    pub threshold: Option<f64>,
    pub evaluation_periods: Option<u32>,
    pub statistic: Option<Statistic>,
    pub period_secs: Option<u32>,
}

impl PolicyOverride {
    pub fn threshold(threshold: f64) -> Self {
        Self {
            threshold: Some(threshold),
            ..Default::default()
        }
    }

    /// 校验已设置的字段
    pub fn validate(&self, field: &str) -> Result<()> {
        check_policy(field, self.threshold, self.evaluation_periods, self.period_secs)
    }
}

fn check_policy(
    field: &str,
    threshold: Option<f64>,
    evaluation_periods: Option<u32>,
    period_secs: Option<u32>,
) -> Result<()> {
    if let Some(threshold) = threshold {
        if !threshold.is_finite() {
            return Err(WatchError::config(format!(
                "{}.threshold must be finite, got {}",
                field, threshold
            )));
        }
    }
    if evaluation_periods == Some(0) {
        return Err(WatchError::config(format!(
            "{}.evaluation_periods must be greater than 0",
            field
        )));
    }
    if period_secs == Some(0) {
        return Err(WatchError::config(format!(
            "{}.period_secs must be greater than 0",
            field
        )));
    }
    Ok(())
}

/// 告警所基于的指标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    /// 告警节点 ID，例如 `CapacityAlarm:write`
    pub alarm_name: String,
    /// 指标名称，维度从资源句柄获取
    pub metric_name: String,
    pub description: String,
}

impl MetricSpec {
    pub fn new(
        alarm_name: impl Into<String>,
        metric_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            alarm_name: alarm_name.into(),
            metric_name: metric_name.into(),
            description: description.into(),
        }
    }
}

/// 告警描述，交给渲染后端生成可部署产物
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmDescriptor {
    /// 告警 ID（作用域路径），同一资源同一告警名称重复构建结果一致
    pub id: String,
    pub name: String,
    pub description: String,
    pub resource_identity: String,
    pub metric: MetricRef,
    pub threshold: f64,
    pub comparison: ComparisonOperator,
    pub evaluation_periods: u32,
    /// 已解析的告警动作，可以为空
    pub actions: Vec<String>,
}

impl AlarmDescriptor {
    /// 用单个数据点判断是否越过阈值
    pub fn breaches(&self, value: f64) -> bool {
        self.comparison.evaluate(value, self.threshold)
    }
}

/// 告警工厂
pub struct AlarmFactory {
    scope: Scope,
    actions: ActionSources,
}

impl AlarmFactory {
    /// `scope` 为告警的父作用域，`actions` 为本次生效的动作来源
    pub fn new(scope: Scope, actions: ActionSources) -> Self {
        Self { scope, actions }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn actions(&self) -> &ActionSources {
        &self.actions
    }

    /// 构建告警
    ///
    /// 告警 ID 由父作用域和告警名称决定；动作在挂载前解析完成，
    /// 动态绑定拿到的是该告警自己的作用域和上下文。
    pub fn build(
        &self,
        handle: &ResourceHandle,
        spec: &MetricSpec,
        policy: &ThresholdPolicy,
    ) -> Result<AlarmDescriptor> {
        let alarm_scope = self.scope.child(&spec.alarm_name);
        let context = AlarmContext::new(&alarm_scope, &handle.identity, &spec.metric_name);
        let actions = ActionResolver::resolve_sources(&self.actions, &alarm_scope, &context)?;

        let metric = handle.metric(&spec.metric_name, policy.statistic, policy.period_secs);
        let alarm = AlarmDescriptor {
            id: alarm_scope.path().to_string(),
            name: alarm_scope.node_id().to_string(),
            description: spec.description.clone(),
            resource_identity: handle.identity.clone(),
            metric,
            threshold: policy.threshold,
            comparison: policy.comparison,
            evaluation_periods: policy.evaluation_periods,
            actions,
        };

        info!(
            alarm = %alarm.id,
            metric = %alarm.metric.metric_name,
            threshold = alarm.threshold,
            actions = alarm.actions.len(),
            "Alarm built"
        );
        Ok(alarm)
    }
}
