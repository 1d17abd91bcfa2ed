use chrono::{FixedOffset, Offset, Utc};
use std::path::PathBuf;
use std::str::FromStr;

/// 核心配置 - 所有配置项都可以通过环境变量覆盖
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/wz/commerce | 工作目录 (数据库、日志) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (none) | 日志目录，设置后按天滚动写文件 |
/// | GIFT_CARD_VALIDITY_DAYS | 365 | 礼品卡有效期，0 表示永不过期 |
/// | REDEEM_MAX_RETRIES | 3 | 核销 CAS 冲突重试次数 |
/// | NOTIFY_CHANNEL_CAPACITY | 1024 | 通知队列容量 |
/// | NOTIFY_MAX_RETRIES | 3 | 通知发送重试次数 |
/// | NOTIFY_RETRY_BASE_MS | 500 | 通知重试基础间隔 (指数退避) |
/// | CART_REMINDER_IDLE_MINUTES | 60 | 弃购提醒前的闲置时间 |
/// | CART_MAX_REMINDERS | 3 | 每个弃购车最多提醒次数 |
/// | SESSION_TTL_MINUTES | 30 | 会话过期时间 |
/// | BUSINESS_TZ_OFFSET_MINUTES | 330 | 营业时区偏移 (IST) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/wz GIFT_CARD_VALIDITY_DAYS=180 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// `None` disables expiry
    pub gift_card_validity_days: Option<u32>,
    pub redeem_max_retries: u32,
    pub notify_channel_capacity: usize,
    pub notify_max_retries: u32,
    pub notify_retry_base_ms: u64,
    pub cart_reminder_idle_minutes: u32,
    pub cart_max_reminders: u32,
    pub session_ttl_minutes: u32,
    pub business_tz_offset_minutes: i32,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let validity_days: u32 = env_or("GIFT_CARD_VALIDITY_DAYS", 365);
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/wz/commerce".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()),
            gift_card_validity_days: (validity_days > 0).then_some(validity_days),
            redeem_max_retries: env_or("REDEEM_MAX_RETRIES", 3),
            notify_channel_capacity: env_or("NOTIFY_CHANNEL_CAPACITY", 1024),
            notify_max_retries: env_or("NOTIFY_MAX_RETRIES", 3),
            notify_retry_base_ms: env_or("NOTIFY_RETRY_BASE_MS", 500),
            cart_reminder_idle_minutes: env_or("CART_REMINDER_IDLE_MINUTES", 60),
            cart_max_reminders: env_or("CART_MAX_REMINDERS", 3),
            session_ttl_minutes: env_or("SESSION_TTL_MINUTES", 30),
            business_tz_offset_minutes: env_or("BUSINESS_TZ_OFFSET_MINUTES", 330),
        }
    }

    /// 使用自定义工作目录
    ///
    /// 常用于测试场景
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// Database file inside the work dir
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("commerce.redb")
    }

    /// Business timezone; an out-of-range offset falls back to UTC
    pub fn business_tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.business_tz_offset_minutes * 60).unwrap_or_else(|| {
            tracing::warn!(
                offset_minutes = self.business_tz_offset_minutes,
                "Invalid business timezone offset, using UTC"
            );
            Utc.fix()
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
