pub mod action;
pub mod alarm;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod metric;
pub mod registry;
pub mod scope;
pub mod sink;
pub mod watcher;

pub use action::{ActionResolver, ActionSources, AlarmActionConfig, AlarmActionSource, DynamicBinding};
pub use alarm::{
    AlarmDescriptor, AlarmFactory, ComparisonOperator, MetricSpec, PolicyOverride, ThresholdPolicy,
};
pub use config::{ConfigLoader, FunctionDefaults, QueueDefaults, TableDefaults, WatchfulConfig};
pub use dashboard::{Dashboard, DashboardSection, HorizontalAnnotation, Widget, DASHBOARD_WIDTH};
pub use error::{Result, WatchError};
pub use metric::{MetricRef, ResourceHandle, ResourceKind, Statistic};
pub use registry::{WatchOutcome, Watchful};
pub use scope::{path_hash, AlarmContext, Scope};
pub use sink::{ArtifactSink, CollectingSink};
pub use watcher::{
    FunctionWatcher, QueueWatcher, ResourceWatcher, TableWatcher, WatchContext, WatchOptions,
    WatchOutput,
};
