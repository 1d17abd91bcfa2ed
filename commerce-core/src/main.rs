use std::sync::Arc;

use commerce_core::{CommerceCore, Config, LoggingDispatcher, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();

    // 2. 加载配置 + 日志
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(work_dir = %config.work_dir, "Commerce core starting...");

    // 3. 初始化组件
    let core = CommerceCore::initialize(&config, Arc::new(LoggingDispatcher)).await?;

    // 4. 维护任务: 余额修复、状态校验、弃购车提醒
    let report = core.run_maintenance()?;
    let reminders = core.send_due_reminders().await?;

    tracing::info!(
        balances_repaired = report.balances_repaired,
        status_mismatches = report.status_mismatches,
        reminders_sent = reminders,
        "Commerce core maintenance complete"
    );

    Ok(())
}
