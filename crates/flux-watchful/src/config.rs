use crate::action::{ActionSources, DynamicBinding};
use crate::error::{Result, WatchError};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 环境变量前缀，例如 `WATCHFUL_TABLE__WRITE_CAPACITY_THRESHOLD_PERCENT=90`
pub const ENV_PREFIX: &str = "WATCHFUL";

/// 注册表级配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchfulConfig {
    /// 是否生成仪表盘
    pub dashboard: bool,

    /// 仪表盘名称，默认由作用域路径生成
    pub dashboard_name: Option<String>,

    /// 所有告警默认挂载的静态动作
    pub alarm_action_arns: Vec<String>,

    /// 所有告警默认挂载的动态动作（只能在代码中设置）
    #[serde(skip)]
    pub alarm_actions: Vec<DynamicBinding>,

    pub table: TableDefaults,
    pub queue: QueueDefaults,
    pub function: FunctionDefaults,
}

impl Default for WatchfulConfig {
    fn default() -> Self {
        Self {
            dashboard: true,
            dashboard_name: None,
            alarm_action_arns: Vec::new(),
            alarm_actions: Vec::new(),
            table: TableDefaults::default(),
            queue: QueueDefaults::default(),
            function: FunctionDefaults::default(),
        }
    }
}

impl WatchfulConfig {
    pub fn with_alarm_action_arns<I, S>(mut self, arns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alarm_action_arns = arns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alarm_actions(mut self, actions: Vec<DynamicBinding>) -> Self {
        self.alarm_actions = actions;
        self
    }

    pub fn without_dashboard(mut self) -> Self {
        self.dashboard = false;
        self
    }

    /// 默认动作来源
    pub fn action_sources(&self) -> ActionSources {
        ActionSources::new(self.alarm_action_arns.clone(), self.alarm_actions.clone())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        check_percent("table.read_capacity_threshold_percent", self.table.read_capacity_threshold_percent)?;
        check_percent("table.write_capacity_threshold_percent", self.table.write_capacity_threshold_percent)?;
        check_percent("function.duration_threshold_percent", self.function.duration_threshold_percent)?;
        check_non_negative("function.errors_per_minute_threshold", self.function.errors_per_minute_threshold)?;
        check_non_negative("function.throttles_per_minute_threshold", self.function.throttles_per_minute_threshold)?;
        check_non_negative("queue.max_message_age_secs", self.queue.max_message_age_secs)?;
        check_non_negative("queue.max_visible_messages", self.queue.max_visible_messages)?;

        for (field, periods) in [
            ("table.evaluation_periods", self.table.evaluation_periods),
            ("queue.evaluation_periods", self.queue.evaluation_periods),
            ("function.evaluation_periods", self.function.evaluation_periods),
        ] {
            if periods == 0 {
                return Err(WatchError::config(format!("{} must be greater than 0", field)));
            }
        }

        if let Some(name) = &self.dashboard_name {
            if name.trim().is_empty() {
                return Err(WatchError::config("dashboard_name cannot be empty"));
            }
        }

        Ok(())
    }
}

/// 表默认阈值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDefaults {
    /// 读容量告警阈值（占预置读容量的百分比）
    pub read_capacity_threshold_percent: f64,
    /// 写容量告警阈值（占预置写容量的百分比）
    pub write_capacity_threshold_percent: f64,
    pub evaluation_periods: u32,
}

impl Default for TableDefaults {
    fn default() -> Self {
        Self {
            read_capacity_threshold_percent: 80.0,
            write_capacity_threshold_percent: 80.0,
            evaluation_periods: 1,
        }
    }
}

/// 队列默认阈值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueDefaults {
    /// 最老消息存活时间上限（秒）
    pub max_message_age_secs: f64,
    /// 可见消息数上限
    pub max_visible_messages: f64,
    pub evaluation_periods: u32,
}

impl Default for QueueDefaults {
    fn default() -> Self {
        Self {
            max_message_age_secs: 300.0,
            max_visible_messages: 1000.0,
            evaluation_periods: 1,
        }
    }
}

/// 函数默认阈值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionDefaults {
    pub errors_per_minute_threshold: f64,
    pub throttles_per_minute_threshold: f64,
    /// p99 耗时告警阈值（占函数超时时间的百分比）
    pub duration_threshold_percent: f64,
    pub evaluation_periods: u32,
}

impl Default for FunctionDefaults {
    fn default() -> Self {
        Self {
            errors_per_minute_threshold: 0.0,
            throttles_per_minute_threshold: 0.0,
            duration_threshold_percent: 80.0,
            evaluation_periods: 1,
        }
    }
}

pub(crate) fn check_percent(field: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value <= 100.0) {
        return Err(WatchError::config(format!(
            "{} must be in (0, 100], got {}",
            field, value
        )));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !(value >= 0.0) {
        return Err(WatchError::config(format!(
            "{} must not be negative, got {}",
            field, value
        )));
    }
    Ok(())
}

/// 配置加载器
pub struct ConfigLoader {
    path: PathBuf,
    use_env: bool,
}

impl ConfigLoader {
    /// 创建配置加载器，`path` 为 TOML 文件路径
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            use_env: true,
        }
    }

    /// 不读取环境变量
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// 加载配置，文件不存在时使用默认值
    pub fn load(&self) -> Result<WatchfulConfig> {
        let mut builder = Config::builder().add_source(
            File::from(self.path.as_path())
                .format(FileFormat::Toml)
                .required(false),
        );

        if self.use_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("alarm_action_arns")
                    .try_parsing(true),
            );
        }

        let config: WatchfulConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            path = %self.path.display(),
            alarm_action_arns = config.alarm_action_arns.len(),
            "Watchful config loaded"
        );
        Ok(config)
    }

    /// 从 TOML 字符串加载
    pub fn load_str(content: &str) -> Result<WatchfulConfig> {
        let config: WatchfulConfig = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
