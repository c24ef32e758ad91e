use crate::error::{Result, WatchError};
use crate::scope::{AlarmContext, Scope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 绑定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmActionConfig {
    pub alarm_action_arn: String,
}

impl AlarmActionConfig {
    pub fn new(alarm_action_arn: impl Into<String>) -> Self {
        Self {
            alarm_action_arn: alarm_action_arn.into(),
        }
    }
}

type BindFn = dyn Fn(&Scope, &AlarmContext) -> anyhow::Result<AlarmActionConfig> + Send + Sync;

/// 动态告警动作
///
/// 每构建一个告警都会重新调用一次，结果不会跨告警缓存。
#[derive(Clone)]
pub struct DynamicBinding {
    bind: Arc<BindFn>,
}

impl DynamicBinding {
    pub fn new<F>(bind: F) -> Self
    where
        F: Fn(&Scope, &AlarmContext) -> anyhow::Result<AlarmActionConfig> + Send + Sync + 'static,
    {
        Self {
            bind: Arc::new(bind),
        }
    }

    pub fn bind(&self, scope: &Scope, alarm: &AlarmContext) -> anyhow::Result<AlarmActionConfig> {
        (self.bind)(scope, alarm)
    }
}

impl fmt::Debug for DynamicBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DynamicBinding(..)")
    }
}

/// 告警动作来源
#[derive(Debug, Clone)]
pub enum AlarmActionSource {
    /// 固定 ARN
    StaticArn(String),
    /// 构建时绑定
    DynamicBinding(DynamicBinding),
}

impl AlarmActionSource {
    /// 解析为具体 ARN
    pub fn resolve(&self, scope: &Scope, alarm: &AlarmContext) -> Result<String> {
        match self {
            AlarmActionSource::StaticArn(arn) => Ok(arn.clone()),
            AlarmActionSource::DynamicBinding(binding) => binding
                .bind(scope, alarm)
                .map(|config| config.alarm_action_arn)
                .map_err(|source| WatchError::Binding {
                    alarm: alarm.path.clone(),
                    source,
                }),
        }
    }
}

impl From<String> for AlarmActionSource {
    fn from(arn: String) -> Self {
        AlarmActionSource::StaticArn(arn)
    }
}

impl From<&str> for AlarmActionSource {
    fn from(arn: &str) -> Self {
        AlarmActionSource::StaticArn(arn.to_string())
    }
}

impl From<DynamicBinding> for AlarmActionSource {
    fn from(binding: DynamicBinding) -> Self {
        AlarmActionSource::DynamicBinding(binding)
    }
}

/// 两类告警动作输入
#[derive(Debug, Clone, Default)]
pub struct ActionSources {
    pub alarm_action_arns: Vec<String>,
    pub alarm_actions: Vec<DynamicBinding>,
}

impl ActionSources {
    pub fn new(alarm_action_arns: Vec<String>, alarm_actions: Vec<DynamicBinding>) -> Self {
        Self {
            alarm_action_arns,
            alarm_actions,
        }
    }

    /// 单次调用的覆盖：提供了哪一类就整体替换哪一类，不做合并
    pub fn overridden_by(
        &self,
        alarm_action_arns: Option<&Vec<String>>,
        alarm_actions: Option<&Vec<DynamicBinding>>,
    ) -> Self {
        Self {
            alarm_action_arns: alarm_action_arns
                .cloned()
                .unwrap_or_else(|| self.alarm_action_arns.clone()),
            alarm_actions: alarm_actions
                .cloned()
                .unwrap_or_else(|| self.alarm_actions.clone()),
        }
    }

    /// 按解析顺序展开：先全部静态 ARN，再全部动态绑定
    pub fn sources(&self) -> impl Iterator<Item = AlarmActionSource> + '_ {
        ordered_sources(&self.alarm_action_arns, &self.alarm_actions)
    }

    pub fn len(&self) -> usize {
        self.alarm_action_arns.len() + self.alarm_actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 告警动作解析器
pub struct ActionResolver;

impl ActionResolver {
    /// 解析告警动作列表
    ///
    /// 结果为 `static_arns` 原样拼接上每个动态绑定的结果，保持输入顺序，不去重。
    /// 任一绑定失败时整个告警构建失败。
    pub fn resolve(
        static_arns: &[String],
        dynamic_actions: &[DynamicBinding],
        scope: &Scope,
        alarm: &AlarmContext,
    ) -> Result<Vec<String>> {
        let actions = ordered_sources(static_arns, dynamic_actions)
            .map(|source| source.resolve(scope, alarm))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            alarm = %alarm.path,
            statics = static_arns.len(),
            dynamics = dynamic_actions.len(),
            "Alarm actions resolved"
        );
        Ok(actions)
    }

    /// 按 [`ActionSources`] 解析，告警工厂走这条路径
    pub fn resolve_sources(
        sources: &ActionSources,
        scope: &Scope,
        alarm: &AlarmContext,
    ) -> Result<Vec<String>> {
        Self::resolve(&sources.alarm_action_arns, &sources.alarm_actions, scope, alarm)
    }
}

fn ordered_sources<'a>(
    static_arns: &'a [String],
    dynamic_actions: &'a [DynamicBinding],
) -> impl Iterator<Item = AlarmActionSource> + 'a {
    static_arns
        .iter()
        .cloned()
        .map(AlarmActionSource::StaticArn)
        .chain(
            dynamic_actions
                .iter()
                .cloned()
                .map(AlarmActionSource::DynamicBinding),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn alarm_scope(name: &str) -> (Scope, AlarmContext) {
        let scope = Scope::default().child("watchful").child("Table").child(name);
        let ctx = AlarmContext::new(&scope, "Default/Table", "ConsumedWriteCapacityUnits");
        (scope, ctx)
    }

    fn phony() -> DynamicBinding {
        DynamicBinding::new(|scope, alarm| {
            Ok(AlarmActionConfig::new(format!(
                "arn:phony:{}:{}",
                scope.path(),
                alarm.path
            )))
        })
    }

    #[test]
    fn test_static_only() {
        let (scope, ctx) = alarm_scope("CapacityAlarm:write");
        let arns = vec!["arn:a1".to_string(), "arn:a2".to_string()];

        let actions = ActionResolver::resolve(&arns, &[], &scope, &ctx).unwrap();
        assert_eq!(actions, vec!["arn:a1", "arn:a2"]);
    }

    #[test]
    fn test_empty_sources() {
        let (scope, ctx) = alarm_scope("CapacityAlarm:write");
        let actions = ActionResolver::resolve(&[], &[], &scope, &ctx).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_statics_then_dynamics_without_dedup() {
        let (scope, ctx) = alarm_scope("CapacityAlarm:write");
        let arns = vec!["arn:same".to_string(), "arn:same".to_string()];
        let dynamic = vec![
            DynamicBinding::new(|_, _| Ok(AlarmActionConfig::new("arn:same"))),
            phony(),
        ];

        let actions = ActionResolver::resolve(&arns, &dynamic, &scope, &ctx).unwrap();
        assert_eq!(
            actions,
            vec![
                "arn:same",
                "arn:same",
                "arn:same",
                "arn:phony:Default/watchful/Table/CapacityAlarm:write:Default/watchful/Table/CapacityAlarm:write",
            ]
        );
    }

    #[test]
    fn test_binding_invoked_per_alarm() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let binding = DynamicBinding::new(move |_, alarm| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(AlarmActionConfig::new(format!("arn:topic:{}", alarm.name)))
        });

        let (read_scope, read_ctx) = alarm_scope("CapacityAlarm:read");
        let (write_scope, write_ctx) = alarm_scope("CapacityAlarm:write");
        let bindings = vec![binding];

        let read = ActionResolver::resolve(&[], &bindings, &read_scope, &read_ctx).unwrap();
        let write = ActionResolver::resolve(&[], &bindings, &write_scope, &write_ctx).unwrap();

        assert_eq!(read, vec!["arn:topic:CapacityAlarm:read"]);
        assert_eq!(write, vec!["arn:topic:CapacityAlarm:write"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_binding_failure() {
        let (scope, ctx) = alarm_scope("CapacityAlarm:write");
        let failing = vec![DynamicBinding::new(|_, _| {
            Err(anyhow::anyhow!("topic not found"))
        })];

        let err = ActionResolver::resolve(&["arn:a1".to_string()], &failing, &scope, &ctx)
            .unwrap_err();
        match err {
            WatchError::Binding { alarm, source } => {
                assert_eq!(alarm, "Default/watchful/Table/CapacityAlarm:write");
                assert_eq!(source.to_string(), "topic not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_override_replaces_each_list() {
        let defaults = ActionSources::new(vec!["arn:default".to_string()], vec![phony()]);

        let replaced = defaults.overridden_by(Some(&vec!["arn:call".to_string()]), None);
        assert_eq!(replaced.alarm_action_arns, vec!["arn:call"]);
        assert_eq!(replaced.alarm_actions.len(), 1);

        let cleared = defaults.overridden_by(None, Some(&Vec::new()));
        assert_eq!(cleared.alarm_action_arns, vec!["arn:default"]);
        assert!(cleared.alarm_actions.is_empty());
    }

    #[test]
    fn test_sources_order() {
        let sources = ActionSources::new(vec!["arn:1".to_string()], vec![phony()]);
        let kinds: Vec<bool> = sources
            .sources()
            .map(|s| matches!(s, AlarmActionSource::StaticArn(_)))
            .collect();
        assert_eq!(kinds, vec![true, false]);
    }

    #[test]
    fn test_resolve_sources_matches_slices() {
        let (scope, ctx) = alarm_scope("CapacityAlarm:write");
        let sources = ActionSources::new(vec!["arn:1".to_string()], vec![phony()]);

        let from_sources = ActionResolver::resolve_sources(&sources, &scope, &ctx).unwrap();
        let from_slices =
            ActionResolver::resolve(&sources.alarm_action_arns, &sources.alarm_actions, &scope, &ctx)
                .unwrap();
        assert_eq!(from_sources, from_slices);
        assert_eq!(from_sources.len(), 2);
    }
}
