use super::{ResourceWatcher, WatchContext, WatchOutput};
use crate::alarm::{MetricSpec, ThresholdPolicy};
use crate::config::FunctionDefaults;
use crate::dashboard::Widget;
use crate::error::Result;
use crate::metric::{ResourceHandle, ResourceKind, Statistic};
use tracing::debug;

/// 函数超时时间属性名（毫秒）
pub const TIMEOUT_MS: &str = "timeout_ms";

const INVOCATIONS: &str = "Invocations";
const ERRORS: &str = "Errors";
const THROTTLES: &str = "Throttles";
const DURATION: &str = "Duration";
const RATE_PERIOD_SECS: u32 = 60;
const DURATION_PERIOD_SECS: u32 = 300;

/// 函数 watcher
///
/// 错误和限流按每分钟计数告警；已知超时时间时，p99 耗时超过超时时间的一定比例也告警。
pub struct FunctionWatcher {
    defaults: FunctionDefaults,
}

impl FunctionWatcher {
    pub fn new(defaults: FunctionDefaults) -> Self {
        Self { defaults }
    }
}

impl Default for FunctionWatcher {
    fn default() -> Self {
        Self::new(FunctionDefaults::default())
    }
}

impl ResourceWatcher for FunctionWatcher {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Function
    }

    fn watch(&self, ctx: &WatchContext<'_>, handle: &ResourceHandle) -> Result<WatchOutput> {
        let mut alarms = Vec::new();
        let mut section = ctx.heading(handle, "Lambda Console");
        let periods = self.defaults.evaluation_periods;

        let errors = ctx.build_alarm(
            handle,
            &MetricSpec::new(
                "ErrorsAlarm",
                ERRORS,
                format!(
                    "Over {} errors per minute in {}",
                    self.defaults.errors_per_minute_threshold, handle.resource_name
                ),
            ),
            ThresholdPolicy::above(
                self.defaults.errors_per_minute_threshold,
                Statistic::Sum,
                RATE_PERIOD_SECS,
            )
            .with_evaluation_periods(periods),
        )?;

        let throttles = ctx.build_alarm(
            handle,
            &MetricSpec::new(
                "ThrottlesAlarm",
                THROTTLES,
                format!(
                    "Over {} throttles per minute in {}",
                    self.defaults.throttles_per_minute_threshold, handle.resource_name
                ),
            ),
            ThresholdPolicy::above(
                self.defaults.throttles_per_minute_threshold,
                Statistic::Sum,
                RATE_PERIOD_SECS,
            )
            .with_evaluation_periods(periods),
        )?;

        section.push(Widget::graph(
            "Invocations/minute",
            vec![handle.metric(INVOCATIONS, Statistic::Sum, RATE_PERIOD_SECS)],
        ));
        section.push(
            Widget::graph(
                "Errors/minute",
                vec![
                    handle
                        .metric(ERRORS, Statistic::Sum, RATE_PERIOD_SECS)
                        .with_label("Errors"),
                    handle
                        .metric(THROTTLES, Statistic::Sum, RATE_PERIOD_SECS)
                        .with_label("Throttles"),
                ],
            )
            .with_annotation("Errors alarm", errors.threshold),
        );
        alarms.push(errors);
        alarms.push(throttles);

        let mut duration_graph = Widget::graph(
            "Duration (ms)",
            vec![
                handle
                    .metric(DURATION, Statistic::Percentile(99), DURATION_PERIOD_SECS)
                    .with_label("p99"),
                handle
                    .metric(DURATION, Statistic::Average, DURATION_PERIOD_SECS)
                    .with_label("Average"),
            ],
        );

        match handle.attribute(TIMEOUT_MS) {
            Some(timeout_ms) => {
                let percent = ctx.threshold_percent(self.defaults.duration_threshold_percent);
                let duration = ctx.build_alarm(
                    handle,
                    &MetricSpec::new(
                        "DurationAlarm",
                        DURATION,
                        format!(
                            "p99 latency >= {}ms ({}% of timeout) in {}",
                            timeout_ms * percent / 100.0,
                            percent,
                            handle.resource_name
                        ),
                    ),
                    ThresholdPolicy::above(
                        timeout_ms * percent / 100.0,
                        Statistic::Percentile(99),
                        DURATION_PERIOD_SECS,
                    )
                    .with_evaluation_periods(periods),
                )?;
                duration_graph = duration_graph
                    .with_annotation("Alarm on", duration.threshold)
                    .with_annotation("Timeout", timeout_ms);
                alarms.push(duration);
            }
            None => {
                debug!(identity = %handle.identity, "Function timeout unknown, skipping duration alarm");
            }
        }
        section.push(duration_graph);

        Ok(WatchOutput { alarms, section })
    }
}
