use crate::alarm::AlarmDescriptor;
use crate::dashboard::Dashboard;
use crate::error::Result;

/// 产物输出接口
///
/// 渲染后端实现该 trait，把仪表盘和告警描述转换为可部署的产物。
pub trait ArtifactSink {
    /// 输出仪表盘（即使没有任何分区也会调用）
    fn emit_dashboard(&mut self, dashboard: &Dashboard) -> Result<()>;

    /// 输出单个告警
    fn emit_alarm(&mut self, alarm: &AlarmDescriptor) -> Result<()>;

    /// 输出名称
    fn name(&self) -> &str;
}

/// 内存收集器，测试和调试时使用
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub dashboards: Vec<Dashboard>,
    pub alarms: Vec<AlarmDescriptor>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactSink for CollectingSink {
    fn emit_dashboard(&mut self, dashboard: &Dashboard) -> Result<()> {
        self.dashboards.push(dashboard.clone());
        Ok(())
    }

    fn emit_alarm(&mut self, alarm: &AlarmDescriptor) -> Result<()> {
        self.alarms.push(alarm.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}
