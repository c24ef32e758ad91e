use crate::error::{RenderError, Result};
use crate::layout::dashboard_body;
use flux_watchful::{path_hash, AlarmDescriptor, ArtifactSink, Dashboard, Statistic};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// 告警资源类型
pub const ALARM_TYPE: &str = "AWS::CloudWatch::Alarm";
/// 仪表盘资源类型
pub const DASHBOARD_TYPE: &str = "AWS::CloudWatch::Dashboard";

/// CloudFormation 风格的模板
///
/// 逻辑 ID 由作用域路径去掉非字母数字字符后拼接得到；与其他路径撞名时追加
/// 路径摘要。同一定义多次渲染结果一致。
#[derive(Debug, Default)]
pub struct CloudFormationTemplate {
    resources: Map<String, Value>,
    /// 逻辑 ID -> 来源路径
    origins: HashMap<String, String>,
}

impl CloudFormationTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加资源
    pub fn add_resource(&mut self, path: &str, resource_type: &str, properties: Value) -> Result<String> {
        let logical_id = self.allocate_id(path)?;

        debug!(logical_id = %logical_id, resource_type, "Template resource added");
        self.origins.insert(logical_id.clone(), path.to_string());
        self.resources.insert(
            logical_id.clone(),
            json!({ "Type": resource_type, "Properties": properties }),
        );
        Ok(logical_id)
    }

    /// 为路径分配逻辑 ID
    ///
    /// 同一路径总是得到同一个 ID；可读 ID 已被其他路径占用时追加摘要。
    fn allocate_id(&self, path: &str) -> Result<String> {
        let readable = logical_id(path)?;
        match self.origins.get(&readable) {
            None => return Ok(readable),
            Some(existing) if existing == path => return Ok(readable),
            Some(_) => {}
        }

        let unique = format!("{}{}", readable, path_hash(path));
        match self.origins.get(&unique) {
            Some(existing) if existing != path => Err(RenderError::DuplicateLogicalId {
                logical_id: unique,
                path: path.to_string(),
            }),
            _ => Ok(unique),
        }
    }

    /// 按逻辑 ID 查找资源
    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    /// 指定类型的全部资源属性
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&Value> {
        self.resources
            .values()
            .filter(|r| r["Type"] == resource_type)
            .map(|r| &r["Properties"])
            .collect()
    }

    /// 是否存在指定类型且包含给定属性（子集匹配）的资源
    pub fn has_resource(&self, resource_type: &str, expected: &Value) -> bool {
        self.resources_of_type(resource_type)
            .into_iter()
            .any(|properties| contains(properties, expected))
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn to_json(&self) -> Value {
        json!({ "Resources": self.resources })
    }

    pub fn to_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_json())?)
    }

    /// 写入文件
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_string_pretty()?)?;
        info!(
            path = %path.as_ref().display(),
            resources = self.resources.len(),
            "Template written"
        );
        Ok(())
    }

    fn add_alarm(&mut self, alarm: &AlarmDescriptor) -> Result<String> {
        let properties = alarm_properties(alarm);
        self.add_resource(&alarm.id, ALARM_TYPE, properties)
    }

    fn add_dashboard(&mut self, dashboard: &Dashboard) -> Result<String> {
        let body = serde_json::to_string(&dashboard_body(dashboard))?;
        let properties = json!({
            "DashboardName": dashboard.name,
            "DashboardBody": body,
        });
        self.add_resource(&format!("{}/Dashboard", dashboard.name), DASHBOARD_TYPE, properties)
    }
}

impl ArtifactSink for CloudFormationTemplate {
    fn emit_dashboard(&mut self, dashboard: &Dashboard) -> flux_watchful::Result<()> {
        self.add_dashboard(dashboard)?;
        Ok(())
    }

    fn emit_alarm(&mut self, alarm: &AlarmDescriptor) -> flux_watchful::Result<()> {
        self.add_alarm(alarm)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "cloudformation"
    }
}

/// 告警资源属性
pub fn alarm_properties(alarm: &AlarmDescriptor) -> Value {
    let dimensions: Vec<Value> = alarm
        .metric
        .dimensions
        .iter()
        .map(|(name, value)| json!({ "Name": name, "Value": value }))
        .collect();

    let mut properties = json!({
        "AlarmDescription": alarm.description,
        "ComparisonOperator": alarm.comparison,
        "EvaluationPeriods": alarm.evaluation_periods,
        "MetricName": alarm.metric.metric_name,
        "Namespace": alarm.metric.namespace,
        "Dimensions": dimensions,
        "Period": alarm.metric.period_secs,
        "Threshold": alarm.threshold,
    });

    // 百分位使用 ExtendedStatistic
    match alarm.metric.statistic {
        Statistic::Percentile(_) => {
            properties["ExtendedStatistic"] = json!(alarm.metric.statistic.to_string());
        }
        statistic => {
            properties["Statistic"] = json!(statistic.to_string());
        }
    }

    if !alarm.actions.is_empty() {
        properties["AlarmActions"] = json!(alarm.actions);
    }

    properties
}

/// 由作用域路径生成逻辑 ID
pub fn logical_id(path: &str) -> Result<String> {
    let id: String = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .flat_map(|segment| segment.chars().filter(|c| c.is_ascii_alphanumeric()))
        .collect();

    if id.is_empty() {
        return Err(RenderError::EmptyLogicalId(path.to_string()));
    }
    Ok(id)
}

/// `actual` 是否包含 `expected` 的全部字段（数组要求完全相等）
fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|a| contains(a, value))),
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_watchful::{ComparisonOperator, ResourceHandle};

    fn alarm(id: &str, statistic: Statistic, actions: Vec<String>) -> AlarmDescriptor {
        let handle = ResourceHandle::function("Default/Handler", "handler");
        AlarmDescriptor {
            id: id.to_string(),
            name: "DurationAlarm".to_string(),
            description: "slow".to_string(),
            resource_identity: handle.identity.clone(),
            metric: handle.metric("Duration", statistic, 300),
            threshold: 2400.0,
            comparison: ComparisonOperator::GreaterThanThreshold,
            evaluation_periods: 1,
            actions,
        }
    }

    #[test]
    fn test_logical_id() {
        assert_eq!(
            logical_id("Default/watchful/Table/CapacityAlarm:write").unwrap(),
            "DefaultwatchfulTableCapacityAlarmwrite"
        );
        assert!(logical_id("/:/").is_err());
    }

    #[test]
    fn test_percentile_uses_extended_statistic() {
        let properties = alarm_properties(&alarm(
            "Default/watchful/Handler/DurationAlarm",
            Statistic::Percentile(99),
            Vec::new(),
        ));

        assert_eq!(properties["ExtendedStatistic"], "p99");
        assert!(properties.get("Statistic").is_none());
        assert!(properties.get("AlarmActions").is_none());
        assert_eq!(properties["ComparisonOperator"], "GreaterThanThreshold");
        assert_eq!(
            properties["Dimensions"],
            json!([{ "Name": "FunctionName", "Value": "handler" }])
        );
    }

    #[test]
    fn test_colliding_paths_get_distinct_ids() {
        let mut template = CloudFormationTemplate::new();
        template
            .emit_alarm(&alarm("Default/a:b", Statistic::Sum, vec!["arn:1".to_string()]))
            .unwrap();

        // 同一路径重复输出覆盖
        template
            .emit_alarm(&alarm("Default/a:b", Statistic::Sum, vec!["arn:1".to_string()]))
            .unwrap();
        assert_eq!(template.resource_count(), 1);

        template
            .emit_alarm(&alarm("Default/ab", Statistic::Sum, Vec::new()))
            .unwrap();
        assert_eq!(template.resource_count(), 2);
        assert!(template.resource("Defaultab").is_some());

        let suffixed = format!("Defaultab{}", path_hash("Default/ab"));
        assert!(template.resource(&suffixed).unwrap()["Properties"]
            .get("AlarmActions")
            .is_none());

        // 再次输出仍落在同一个 ID 上
        template
            .emit_alarm(&alarm("Default/ab", Statistic::Sum, Vec::new()))
            .unwrap();
        assert_eq!(template.resource_count(), 2);
    }

    #[test]
    fn test_has_resource_subset_match() {
        let mut template = CloudFormationTemplate::new();
        template
            .emit_alarm(&alarm(
                "Default/watchful/Handler/DurationAlarm",
                Statistic::Maximum,
                vec!["arn:1".to_string(), "arn:2".to_string()],
            ))
            .unwrap();

        assert!(template.has_resource(ALARM_TYPE, &json!({ "AlarmActions": ["arn:1", "arn:2"] })));
        assert!(!template.has_resource(ALARM_TYPE, &json!({ "AlarmActions": ["arn:1"] })));
        assert!(!template.has_resource(DASHBOARD_TYPE, &json!({})));
    }
}
