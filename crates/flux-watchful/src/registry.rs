use crate::action::ActionSources;
use crate::alarm::{AlarmDescriptor, AlarmFactory, MetricSpec, ThresholdPolicy};
use crate::config::WatchfulConfig;
use crate::dashboard::{Dashboard, DashboardSection, Widget};
use crate::error::{Result, WatchError};
use crate::metric::{ResourceHandle, ResourceKind};
use crate::scope::{path_hash, Scope, PATH_SEPARATOR};
use crate::sink::ArtifactSink;
use crate::watcher::{
    FunctionWatcher, QueueWatcher, ResourceWatcher, TableWatcher, WatchContext, WatchOptions,
    WatchOutput,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// watch 调用结果
#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    /// 新注册的资源
    Watched(WatchOutput),
    /// 该资源已被监控，本次调用不做任何事
    AlreadyWatched,
}

impl WatchOutcome {
    /// 本次调用是否为空操作
    pub fn is_noop(&self) -> bool {
        matches!(self, WatchOutcome::AlreadyWatched)
    }

    pub fn output(&self) -> Option<&WatchOutput> {
        match self {
            WatchOutcome::Watched(output) => Some(output),
            WatchOutcome::AlreadyWatched => None,
        }
    }
}

/// 监控注册表
///
/// 一次监控定义会话创建一个实例，绑定作用域和默认告警动作。
/// 已监控的资源集合、仪表盘分区和告警只增不减；任何一次失败的 watch 调用都不会改变状态。
pub struct Watchful {
    /// 注册表自身的作用域
    scope: Scope,

    /// 注册表级默认动作
    default_actions: ActionSources,

    /// 资源类型 -> watcher
    watchers: HashMap<ResourceKind, Box<dyn ResourceWatcher>>,

    /// 已监控的资源标识
    watched: HashSet<String>,

    /// 已占用的子作用域路径
    claimed_paths: HashSet<String>,

    /// 仪表盘（关闭时为 None）
    dashboard: Option<Dashboard>,

    /// 已注册的告警，按构建顺序
    alarms: Vec<AlarmDescriptor>,
}

impl Watchful {
    /// 在 `parent` 下创建注册表，并注册内置的表、队列、函数 watcher
    pub fn new(parent: &Scope, id: &str, config: WatchfulConfig) -> Result<Self> {
        config.validate()?;

        let scope = parent.child(id);
        let dashboard = if config.dashboard {
            let name = config
                .dashboard_name
                .clone()
                .unwrap_or_else(|| scope.path().replace(PATH_SEPARATOR, "-"));
            Some(Dashboard::new(name))
        } else {
            None
        };

        let mut watchful = Self {
            default_actions: config.action_sources(),
            scope,
            watchers: HashMap::new(),
            watched: HashSet::new(),
            claimed_paths: HashSet::new(),
            dashboard,
            alarms: Vec::new(),
        };

        watchful.register_watcher(Box::new(TableWatcher::new(config.table)));
        watchful.register_watcher(Box::new(QueueWatcher::new(config.queue)));
        watchful.register_watcher(Box::new(FunctionWatcher::new(config.function)));

        info!(
            scope = %watchful.scope,
            alarm_action_arns = watchful.default_actions.alarm_action_arns.len(),
            alarm_actions = watchful.default_actions.alarm_actions.len(),
            dashboard = watchful.dashboard.is_some(),
            "Watchful created"
        );
        Ok(watchful)
    }

    /// 注册（或替换）某种资源类型的 watcher
    pub fn register_watcher(&mut self, watcher: Box<dyn ResourceWatcher>) {
        let kind = watcher.kind();
        debug!(kind = %kind, "Registering resource watcher");
        self.watchers.insert(kind, watcher);
    }

    /// 是否支持该资源类型
    pub fn supports(&self, kind: &ResourceKind) -> bool {
        self.watchers.contains_key(kind)
    }

    /// 监控一个资源
    ///
    /// # 错误
    /// * `KindMismatch` - `kind` 与句柄类型不一致
    /// * `UnsupportedKind` - 没有该类型的 watcher
    /// * `Config` - 调用方覆盖的百分比、评估周期等不合法
    /// * `ScopeConflict` - 资源节点（含摘要后缀）已被占用
    /// * `Binding` - 动态告警动作绑定失败
    pub fn watch(
        &mut self,
        kind: ResourceKind,
        handle: &ResourceHandle,
        options: WatchOptions,
    ) -> Result<WatchOutcome> {
        if self.watched.contains(&handle.identity) {
            debug!(identity = %handle.identity, "Resource already watched, skipping");
            return Ok(WatchOutcome::AlreadyWatched);
        }

        if kind != handle.kind {
            return Err(WatchError::KindMismatch {
                identity: handle.identity.clone(),
                requested: kind,
                actual: handle.kind.clone(),
            });
        }

        let watcher = self
            .watchers
            .get(&kind)
            .ok_or_else(|| WatchError::UnsupportedKind(kind.clone()))?;

        options.validate()?;
        let resource_scope = self.resource_scope(handle)?;

        // 单次调用的覆盖整体替换默认值
        let actions = self.default_actions.overridden_by(
            options.alarm_action_arns.as_ref(),
            options.alarm_actions.as_ref(),
        );
        let title = options
            .title
            .clone()
            .unwrap_or_else(|| handle.node_id().to_string());
        let factory = AlarmFactory::new(resource_scope.clone(), actions);
        let ctx = WatchContext::new(factory, title, &options);

        let output = watcher.watch(&ctx, handle)?;

        // 构建成功后再提交状态
        self.claimed_paths.insert(resource_scope.path().to_string());
        self.watched.insert(handle.identity.clone());
        self.alarms.extend(output.alarms.iter().cloned());
        if let Some(dashboard) = self.dashboard.as_mut() {
            dashboard.add_section(output.section.clone());
        }

        info!(
            identity = %handle.identity,
            kind = %kind,
            alarms = output.alarms.len(),
            widgets = output.section.widgets.len(),
            "Resource watched"
        );
        Ok(WatchOutcome::Watched(output))
    }

    /// 资源作用域
    ///
    /// 默认使用 identity 的最后一级；该节点已被其他资源占用时，
    /// 追加完整 identity 的摘要，例如 `Default/watchful/Table3F2A9C1B`。
    fn resource_scope(&self, handle: &ResourceHandle) -> Result<Scope> {
        let leaf = self.scope.child(handle.node_id());
        if !self.claimed_paths.contains(leaf.path()) {
            return Ok(leaf);
        }

        let unique = self
            .scope
            .child(&format!("{}{}", handle.node_id(), path_hash(&handle.identity)));
        if self.claimed_paths.contains(unique.path()) {
            return Err(WatchError::ScopeConflict(unique.path().to_string()));
        }

        debug!(
            identity = %handle.identity,
            scope = %unique,
            "Node id already in use, scope disambiguated"
        );
        Ok(unique)
    }

    /// 监控 DynamoDB 表
    pub fn watch_dynamo_table(
        &mut self,
        title: &str,
        table: &ResourceHandle,
        options: WatchOptions,
    ) -> Result<WatchOutcome> {
        self.watch(ResourceKind::Table, table, options.with_title(title))
    }

    /// 监控 SQS 队列
    pub fn watch_queue(
        &mut self,
        title: &str,
        queue: &ResourceHandle,
        options: WatchOptions,
    ) -> Result<WatchOutcome> {
        self.watch(ResourceKind::Queue, queue, options.with_title(title))
    }

    /// 监控 Lambda 函数
    pub fn watch_lambda_function(
        &mut self,
        title: &str,
        function: &ResourceHandle,
        options: WatchOptions,
    ) -> Result<WatchOutcome> {
        self.watch(ResourceKind::Function, function, options.with_title(title))
    }

    /// 监控一组资源中所有受支持的资源
    ///
    /// 不支持的类型和已监控的资源会被跳过；返回本次新监控的资源数。
    /// 遇到错误立即返回，之前已成功的资源保持注册。
    pub fn watch_all<'h, I>(&mut self, handles: I, options: &WatchOptions) -> Result<usize>
    where
        I: IntoIterator<Item = &'h ResourceHandle>,
    {
        let mut count = 0;
        for handle in handles {
            if !self.supports(&handle.kind) {
                debug!(identity = %handle.identity, kind = %handle.kind, "No watcher for resource kind, skipping");
                continue;
            }

            let per_resource = WatchOptions {
                title: None,
                ..options.clone()
            };
            if let WatchOutcome::Watched(_) = self.watch(handle.kind.clone(), handle, per_resource)? {
                count += 1;
            }
        }

        info!(scope = %self.scope, watched = count, "Scope watched");
        Ok(count)
    }

    /// 添加调用方自定义的告警，使用注册表默认动作
    pub fn add_alarm(
        &mut self,
        handle: &ResourceHandle,
        spec: MetricSpec,
        policy: ThresholdPolicy,
    ) -> Result<&AlarmDescriptor> {
        policy.validate(&spec.alarm_name)?;
        let alarm_path = self.scope.child(&spec.alarm_name);
        if self.claimed_paths.contains(alarm_path.path()) {
            return Err(WatchError::ScopeConflict(alarm_path.path().to_string()));
        }

        let factory = AlarmFactory::new(self.scope.clone(), self.default_actions.clone());
        let alarm = factory.build(handle, &spec, &policy)?;

        self.claimed_paths.insert(alarm_path.path().to_string());
        self.alarms.push(alarm);
        Ok(&self.alarms[self.alarms.len() - 1])
    }

    /// 追加自定义分区，仪表盘关闭时忽略
    pub fn add_section(&mut self, section: DashboardSection) {
        match self.dashboard.as_mut() {
            Some(dashboard) => dashboard.add_section(section),
            None => debug!(title = %section.title, "Dashboard disabled, section dropped"),
        }
    }

    /// 在最后一个分区末尾追加组件，没有分区时新建一个
    pub fn add_widgets(&mut self, widgets: Vec<Widget>) {
        let Some(dashboard) = self.dashboard.as_mut() else {
            debug!(widgets = widgets.len(), "Dashboard disabled, widgets dropped");
            return;
        };

        if dashboard.sections.is_empty() {
            dashboard.add_section(DashboardSection::new(String::new()));
        }
        if let Some(section) = dashboard.sections.last_mut() {
            section.widgets.extend(widgets);
        }
    }

    /// 输出仪表盘和全部告警
    pub fn synthesize<S>(&self, sink: &mut S) -> Result<()>
    where
        S: ArtifactSink + ?Sized,
    {
        if let Some(dashboard) = &self.dashboard {
            sink.emit_dashboard(dashboard)?;
        }
        for alarm in &self.alarms {
            sink.emit_alarm(alarm)?;
        }

        info!(
            sink = sink.name(),
            alarms = self.alarms.len(),
            sections = self.section_count(),
            "Artifacts synthesized"
        );
        Ok(())
    }

    /// 注册表作用域
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// 仪表盘，关闭时为 None
    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.dashboard.as_ref()
    }

    /// 已注册的告警，按构建顺序
    pub fn alarms(&self) -> &[AlarmDescriptor] {
        &self.alarms
    }

    /// 该 identity 是否已被监控
    pub fn is_watched(&self, identity: &str) -> bool {
        self.watched.contains(identity)
    }

    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// 仪表盘分区数，仪表盘关闭时为 0
    pub fn section_count(&self) -> usize {
        self.dashboard.as_ref().map_or(0, Dashboard::section_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{AlarmActionConfig, DynamicBinding};
    use crate::alarm::PolicyOverride;
    use crate::metric::Statistic;
    use crate::sink::CollectingSink;
    use crate::watcher::table::WRITE_CAPACITY;

    fn watchful(config: WatchfulConfig) -> Watchful {
        Watchful::new(&Scope::default(), "watchful", config).unwrap()
    }

    fn table(identity: &str) -> ResourceHandle {
        ResourceHandle::table(identity, identity.replace('/', "-")).with_attribute(WRITE_CAPACITY, 5.0)
    }

    #[test]
    fn test_empty_registry() {
        let wf = watchful(WatchfulConfig::default());
        assert_eq!(wf.section_count(), 0);
        assert!(wf.alarms().is_empty());
        assert_eq!(wf.dashboard().unwrap().name, "Default-watchful");
    }

    #[test]
    fn test_duplicate_watch_is_noop() {
        let mut wf = watchful(WatchfulConfig::default());
        let t = table("Default/Table");

        let first = wf.watch(ResourceKind::Table, &t, WatchOptions::new()).unwrap();
        assert!(!first.is_noop());
        let second = wf.watch(ResourceKind::Table, &t, WatchOptions::new()).unwrap();
        assert!(second.is_noop());

        assert_eq!(wf.alarms().len(), 1);
        assert_eq!(wf.section_count(), 1);
        assert_eq!(wf.watched_count(), 1);
    }

    #[test]
    fn test_unsupported_kind() {
        let mut wf = watchful(WatchfulConfig::default());
        let bucket = ResourceHandle::new(
            "Default/Bucket",
            ResourceKind::Custom("bucket".to_string()),
            "assets",
            "AWS/S3",
        );

        let err = wf
            .watch(bucket.kind.clone(), &bucket, WatchOptions::new())
            .unwrap_err();
        assert!(matches!(err, WatchError::UnsupportedKind(_)));
        assert!(err.is_configuration());
        assert!(!wf.is_watched("Default/Bucket"));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut wf = watchful(WatchfulConfig::default());
        let err = wf
            .watch(ResourceKind::Queue, &table("Default/Table"), WatchOptions::new())
            .unwrap_err();
        assert!(matches!(err, WatchError::KindMismatch { .. }));
    }

    #[test]
    fn test_same_leaf_identities_get_distinct_scopes() {
        let mut wf = watchful(WatchfulConfig::default());
        wf.watch(ResourceKind::Table, &table("StackA/Table"), WatchOptions::new())
            .unwrap();
        wf.watch(ResourceKind::Table, &table("StackB/Table"), WatchOptions::new())
            .unwrap();

        assert_eq!(wf.section_count(), 2);
        assert_eq!(wf.watched_count(), 2);
        assert_eq!(wf.alarms()[0].id, "Default/watchful/Table/CapacityAlarm:write");
        assert_eq!(
            wf.alarms()[1].id,
            format!(
                "Default/watchful/Table{}/CapacityAlarm:write",
                path_hash("StackB/Table")
            )
        );
    }

    #[test]
    fn test_invalid_options_leave_state_untouched() {
        let mut wf = watchful(WatchfulConfig::default());
        let t = table("Default/Table");

        let err = wf
            .watch(
                ResourceKind::Table,
                &t,
                WatchOptions::new().with_threshold_percent(-50.0),
            )
            .unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));

        let err = wf
            .watch(
                ResourceKind::Table,
                &t,
                WatchOptions::new().with_override(
                    "ConsumedWriteCapacityUnits",
                    PolicyOverride {
                        evaluation_periods: Some(0),
                        ..Default::default()
                    },
                ),
            )
            .unwrap_err();
        assert!(err.is_configuration());

        assert!(!wf.is_watched("Default/Table"));
        assert_eq!(wf.section_count(), 0);
        assert!(wf.alarms().is_empty());
    }

    #[test]
    fn test_binding_failure_leaves_state_untouched() {
        let failing = DynamicBinding::new(|_, _| Err(anyhow::anyhow!("no topic")));
        let mut wf = watchful(WatchfulConfig::default().with_alarm_actions(vec![failing]));
        let t = table("Default/Table");

        let err = wf.watch(ResourceKind::Table, &t, WatchOptions::new()).unwrap_err();
        assert!(matches!(err, WatchError::Binding { .. }));
        assert!(!wf.is_watched("Default/Table"));
        assert_eq!(wf.section_count(), 0);
        assert!(wf.alarms().is_empty());

        // 覆盖掉失败的绑定后可以重新 watch
        let outcome = wf
            .watch(
                ResourceKind::Table,
                &t,
                WatchOptions::new().with_alarm_actions(Vec::new()),
            )
            .unwrap();
        assert!(!outcome.is_noop());
    }

    #[test]
    fn test_override_replaces_defaults() {
        let binding = DynamicBinding::new(|_, alarm| Ok(AlarmActionConfig::new(format!("arn:{}", alarm.name))));
        let mut wf = watchful(
            WatchfulConfig::default()
                .with_alarm_action_arns(["arn:default"])
                .with_alarm_actions(vec![binding]),
        );

        wf.watch(
            ResourceKind::Table,
            &table("Default/Orders"),
            WatchOptions::new().with_alarm_action_arns(["arn:override"]),
        )
        .unwrap();
        wf.watch(ResourceKind::Table, &table("Default/Users"), WatchOptions::new())
            .unwrap();

        assert_eq!(
            wf.alarms()[0].actions,
            vec!["arn:override", "arn:CapacityAlarm:write"]
        );
        assert_eq!(
            wf.alarms()[1].actions,
            vec!["arn:default", "arn:CapacityAlarm:write"]
        );
    }

    #[test]
    fn test_watch_all_skips_unsupported() {
        let mut wf = watchful(WatchfulConfig::default());
        let handles = vec![
            table("Default/Orders"),
            ResourceHandle::queue("Default/Jobs", "jobs"),
            ResourceHandle::new("Default/Bucket", ResourceKind::Custom("bucket".into()), "b", "AWS/S3"),
            table("Default/Orders"),
        ];

        let count = wf.watch_all(&handles, &WatchOptions::new()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(wf.section_count(), 2);
        assert_eq!(wf.alarms().len(), 3);
    }

    #[test]
    fn test_add_alarm_uses_default_actions() {
        let mut wf = watchful(WatchfulConfig::default().with_alarm_action_arns(["arn:ops"]));
        let handler = ResourceHandle::function("Default/Handler", "handler");

        let alarm = wf
            .add_alarm(
                &handler,
                MetricSpec::new("ConcurrencyAlarm", "ConcurrentExecutions", "Concurrency high"),
                ThresholdPolicy::above(900.0, Statistic::Maximum, 60),
            )
            .unwrap();
        assert_eq!(alarm.id, "Default/watchful/ConcurrencyAlarm");
        assert_eq!(alarm.actions, vec!["arn:ops"]);

        let err = wf
            .add_alarm(
                &handler,
                MetricSpec::new("ConcurrencyAlarm", "ConcurrentExecutions", "again"),
                ThresholdPolicy::above(900.0, Statistic::Maximum, 60),
            )
            .unwrap_err();
        assert!(matches!(err, WatchError::ScopeConflict(_)));

        let err = wf
            .add_alarm(
                &handler,
                MetricSpec::new("IteratorAgeAlarm", "IteratorAge", "Lagging"),
                ThresholdPolicy::above(60.0, Statistic::Maximum, 0),
            )
            .unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
        assert_eq!(wf.alarms().len(), 1);
    }

    #[test]
    fn test_dashboard_disabled() {
        let mut wf = watchful(WatchfulConfig::default().without_dashboard());
        wf.watch(ResourceKind::Table, &table("Default/Table"), WatchOptions::new())
            .unwrap();
        wf.add_widgets(vec![Widget::text("ignored")]);

        assert!(wf.dashboard().is_none());
        assert_eq!(wf.alarms().len(), 1);

        let mut sink = CollectingSink::new();
        wf.synthesize(&mut sink).unwrap();
        assert!(sink.dashboards.is_empty());
        assert_eq!(sink.alarms.len(), 1);
    }

    #[test]
    fn test_custom_sections_keep_order() {
        let mut wf = watchful(WatchfulConfig::default());
        wf.add_widgets(vec![Widget::text("intro")]);
        wf.watch(ResourceKind::Table, &table("Default/Table"), WatchOptions::new())
            .unwrap();
        wf.add_section(DashboardSection::with_heading("Custom", &[]));

        let titles: Vec<&str> = wf
            .dashboard()
            .unwrap()
            .sections
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["", "Table", "Custom"]);
    }
}
