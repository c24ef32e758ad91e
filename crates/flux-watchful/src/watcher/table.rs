use super::{ResourceWatcher, WatchContext, WatchOutput};
use crate::alarm::{MetricSpec, ThresholdPolicy};
use crate::config::TableDefaults;
use crate::dashboard::Widget;
use crate::error::Result;
use crate::metric::{ResourceHandle, ResourceKind, Statistic};
use tracing::warn;

/// 预置读容量属性名
pub const READ_CAPACITY: &str = "read_capacity";
/// 预置写容量属性名
pub const WRITE_CAPACITY: &str = "write_capacity";

const CONSUMED_READ: &str = "ConsumedReadCapacityUnits";
const CONSUMED_WRITE: &str = "ConsumedWriteCapacityUnits";
const THROTTLED_REQUESTS: &str = "ThrottledRequests";
const PERIOD_SECS: u32 = 60;

/// 表 watcher
///
/// 每种预置了容量的方向（读/写）生成一个容量告警：
/// 每分钟消耗的容量单位超过 `容量 * 60 * 百分比` 时触发。
pub struct TableWatcher {
    defaults: TableDefaults,
}

impl TableWatcher {
    pub fn new(defaults: TableDefaults) -> Self {
        Self { defaults }
    }
}

impl Default for TableWatcher {
    fn default() -> Self {
        Self::new(TableDefaults::default())
    }
}

/// 每分钟容量单位阈值
fn capacity_threshold(capacity: f64, percent: f64) -> f64 {
    capacity * PERIOD_SECS as f64 * percent / 100.0
}

impl ResourceWatcher for TableWatcher {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Table
    }

    fn watch(&self, ctx: &WatchContext<'_>, handle: &ResourceHandle) -> Result<WatchOutput> {
        let mut alarms = Vec::new();
        let mut section = ctx.heading(handle, "DynamoDB Console");

        let directions = [
            (
                "read",
                READ_CAPACITY,
                CONSUMED_READ,
                self.defaults.read_capacity_threshold_percent,
                "Read Capacity Units/minute",
            ),
            (
                "write",
                WRITE_CAPACITY,
                CONSUMED_WRITE,
                self.defaults.write_capacity_threshold_percent,
                "Write Capacity Units/minute",
            ),
        ];

        for (direction, attribute, metric_name, default_percent, title) in directions {
            let mut graph = Widget::graph(
                title,
                vec![handle
                    .metric(metric_name, Statistic::Sum, PERIOD_SECS)
                    .with_label("Consumed")],
            );

            match handle.attribute(attribute) {
                Some(capacity) => {
                    let percent = ctx.threshold_percent(default_percent);
                    let default = ThresholdPolicy::above(
                        capacity_threshold(capacity, percent),
                        Statistic::Sum,
                        PERIOD_SECS,
                    )
                    .with_evaluation_periods(self.defaults.evaluation_periods);

                    let spec = MetricSpec::new(
                        format!("CapacityAlarm:{}", direction),
                        metric_name,
                        format!(
                            "at {}% {} capacity of table {}",
                            percent, direction, handle.resource_name
                        ),
                    );
                    let alarm = ctx.build_alarm(handle, &spec, default)?;
                    graph = graph.with_annotation("Alarm on", alarm.threshold);
                    alarms.push(alarm);
                }
                None => {
                    warn!(
                        identity = %handle.identity,
                        direction,
                        "Table has no provisioned capacity, skipping capacity alarm"
                    );
                }
            }

            section.push(graph);
        }

        section.push(Widget::graph(
            "Throttled Requests",
            vec![handle.metric(THROTTLED_REQUESTS, Statistic::Sum, PERIOD_SECS)],
        ));

        Ok(WatchOutput { alarms, section })
    }
}
