use super::{ResourceWatcher, WatchContext, WatchOutput};
use crate::alarm::{MetricSpec, ThresholdPolicy};
use crate::config::QueueDefaults;
use crate::dashboard::Widget;
use crate::error::Result;
use crate::metric::{ResourceHandle, ResourceKind, Statistic};

const OLDEST_MESSAGE_AGE: &str = "ApproximateAgeOfOldestMessage";
const VISIBLE_MESSAGES: &str = "ApproximateNumberOfMessagesVisible";
const MESSAGES_SENT: &str = "NumberOfMessagesSent";
const MESSAGES_DELETED: &str = "NumberOfMessagesDeleted";
const PERIOD_SECS: u32 = 300;

/// 队列 watcher：积压深度和最老消息存活时间
pub struct QueueWatcher {
    defaults: QueueDefaults,
}

impl QueueWatcher {
    pub fn new(defaults: QueueDefaults) -> Self {
        Self { defaults }
    }
}

impl Default for QueueWatcher {
    fn default() -> Self {
        Self::new(QueueDefaults::default())
    }
}

impl ResourceWatcher for QueueWatcher {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Queue
    }

    fn watch(&self, ctx: &WatchContext<'_>, handle: &ResourceHandle) -> Result<WatchOutput> {
        let mut section = ctx.heading(handle, "SQS Console");

        let age_alarm = ctx.build_alarm(
            handle,
            &MetricSpec::new(
                "OldestMessageAgeAlarm",
                OLDEST_MESSAGE_AGE,
                format!("Oldest message in queue {} is too old", handle.resource_name),
            ),
            ThresholdPolicy::above(
                self.defaults.max_message_age_secs,
                Statistic::Maximum,
                PERIOD_SECS,
            )
            .with_evaluation_periods(self.defaults.evaluation_periods),
        )?;

        let depth_alarm = ctx.build_alarm(
            handle,
            &MetricSpec::new(
                "QueueDepthAlarm",
                VISIBLE_MESSAGES,
                format!("Too many visible messages in queue {}", handle.resource_name),
            ),
            ThresholdPolicy::above(
                self.defaults.max_visible_messages,
                Statistic::Maximum,
                PERIOD_SECS,
            )
            .with_evaluation_periods(self.defaults.evaluation_periods),
        )?;

        section.push(
            Widget::graph(
                "Messages",
                vec![
                    handle
                        .metric(VISIBLE_MESSAGES, Statistic::Maximum, PERIOD_SECS)
                        .with_label("Visible"),
                    handle
                        .metric(MESSAGES_SENT, Statistic::Sum, PERIOD_SECS)
                        .with_label("Sent"),
                    handle
                        .metric(MESSAGES_DELETED, Statistic::Sum, PERIOD_SECS)
                        .with_label("Deleted"),
                ],
            )
            .with_annotation("Alarm on", depth_alarm.threshold)
            .with_size(12, 6),
        );
        section.push(
            Widget::graph(
                "Oldest Message Age (seconds)",
                vec![handle.metric(OLDEST_MESSAGE_AGE, Statistic::Maximum, PERIOD_SECS)],
            )
            .with_annotation("Alarm on", age_alarm.threshold)
            .with_size(12, 6),
        );

        Ok(WatchOutput {
            alarms: vec![age_alarm, depth_alarm],
            section,
        })
    }
}
