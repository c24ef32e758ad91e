//! 从配置生成监控模板
//!
//! ```bash
//! RUST_LOG=debug cargo run -p flux-watchful-render --example synth -- watchful.toml
//! ```

use flux_watchful::watcher::function::TIMEOUT_MS;
use flux_watchful::watcher::table::{READ_CAPACITY, WRITE_CAPACITY};
use flux_watchful::{
    AlarmActionConfig, ConfigLoader, DynamicBinding, ResourceHandle, Scope, WatchOptions, Watchful,
};
use flux_watchful_render::CloudFormationTemplate;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "watchful.toml".to_string());

    let config = ConfigLoader::new(&config_path).load()?.with_alarm_actions(vec![
        DynamicBinding::new(|_, alarm| {
            Ok(AlarmActionConfig::new(format!(
                "arn:aws:sns:us-east-1:123456789012:{}",
                alarm.name.replace(':', "-")
            )))
        }),
    ]);

    let stack = Scope::root("OrdersStack");
    let mut wf = Watchful::new(&stack, "watchful", config)?;

    let orders = ResourceHandle::table("OrdersStack/Orders", "orders")
        .with_attribute(READ_CAPACITY, 10.0)
        .with_attribute(WRITE_CAPACITY, 5.0);
    let jobs = ResourceHandle::queue("OrdersStack/Jobs", "order-jobs");
    let handler = ResourceHandle::function("OrdersStack/Handler", "order-handler")
        .with_attribute(TIMEOUT_MS, 3000.0);

    wf.watch_dynamo_table("Orders", &orders, WatchOptions::new())?;
    wf.watch_all([&jobs, &handler], &WatchOptions::new())?;

    let mut template = CloudFormationTemplate::new();
    wf.synthesize(&mut template)?;
    println!("{}", template.to_string_pretty()?);

    Ok(())
}
