use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shared::util::now_millis;

use crate::carts::CartReconciler;
use crate::checkout::CheckoutService;
use crate::core::Config;
use crate::db::CommerceDb;
use crate::gift_cards::{GiftCardLedger, LedgerSettings};
use crate::notify::{NotificationDispatcher, NotificationService, NotificationWorker};
use crate::orders::FulfillmentManager;
use crate::sessions::SessionStore;
use crate::utils::{CommerceError, CommerceResult};

/// 核心状态 - 持有所有组件的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | CommerceDb | redb 存储 |
/// | notifications | NotificationService | 通知队列生产端 |
/// | gift_cards | GiftCardLedger | 礼品卡账本 |
/// | orders | FulfillmentManager | 订单状态机 |
/// | carts | CartReconciler | 弃购车 |
/// | checkout | CheckoutService | 结账流程 |
/// | sessions | Arc<SessionStore> | 会话存储 |
///
/// 所有字段都是浅拷贝，`clone()` 成本极低。
#[derive(Debug, Clone)]
pub struct CommerceCore {
    pub config: Config,
    pub db: CommerceDb,
    pub notifications: NotificationService,
    pub gift_cards: GiftCardLedger,
    pub orders: FulfillmentManager,
    pub carts: CartReconciler,
    pub checkout: CheckoutService,
    pub sessions: Arc<SessionStore>,
}

/// Result of one maintenance pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub balances_repaired: usize,
    pub status_mismatches: usize,
    pub sessions_evicted: usize,
}

impl CommerceCore {
    /// 初始化核心
    ///
    /// 按顺序初始化：
    /// 1. 工作目录 (确保目录存在)
    /// 2. 数据库 (work_dir/commerce.redb)
    /// 3. 通知服务 + 后台 worker
    /// 4. 各组件
    ///
    /// Must run inside a tokio runtime (the notification worker is spawned).
    pub async fn initialize(
        config: &Config,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> CommerceResult<Self> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            CommerceError::Internal(format!(
                "failed to create work dir {}: {e}",
                config.work_dir
            ))
        })?;

        let db_path = config.database_path();
        let db = CommerceDb::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database opened");

        Ok(Self::assemble(config.clone(), db, dispatcher))
    }

    /// In-memory store (tests, dry runs); same wiring otherwise
    pub async fn in_memory(
        config: &Config,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> CommerceResult<Self> {
        let db = CommerceDb::open_in_memory()?;
        Ok(Self::assemble(config.clone(), db, dispatcher))
    }

    fn assemble(config: Config, db: CommerceDb, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        let (notifications, rx) =
            NotificationService::new(dispatcher.clone(), config.notify_channel_capacity);
        let worker = NotificationWorker::new(
            dispatcher,
            config.notify_max_retries,
            Duration::from_millis(config.notify_retry_base_ms),
        );
        tokio::spawn(worker.run(rx));

        let gift_cards = GiftCardLedger::new(
            db.clone(),
            notifications.clone(),
            LedgerSettings {
                validity_days: config.gift_card_validity_days,
                max_retries: config.redeem_max_retries,
            },
        );
        let orders = FulfillmentManager::new(db.clone(), notifications.clone(), config.business_tz());
        let carts = CartReconciler::new(db.clone(), notifications.clone());
        let checkout = CheckoutService::new(gift_cards.clone(), orders.clone(), carts.clone());
        let sessions = Arc::new(SessionStore::new(config.session_ttl_minutes));

        Self {
            config,
            db,
            notifications,
            gift_cards,
            orders,
            carts,
            checkout,
            sessions,
        }
    }

    /// Send reminders for every cart that is due; returns how many were sent
    pub async fn send_due_reminders(&self) -> CommerceResult<usize> {
        let due = self.carts.due_for_reminder(
            now_millis(),
            self.config.cart_reminder_idle_minutes,
            self.config.cart_max_reminders,
        )?;

        let mut sent = 0;
        for cart in due {
            match self.carts.send_reminder(cart.id).await {
                Ok(_) => sent += 1,
                // recovered since the scan
                Err(CommerceError::CartRecovered(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(sent)
    }

    /// Balance repair, status consistency check, session eviction
    pub fn run_maintenance(&self) -> CommerceResult<MaintenanceReport> {
        let repaired = self.gift_cards.repair_balances()?;
        let mismatches = self.orders.verify_all()?;
        let evicted = self.sessions.evict_expired();

        let report = MaintenanceReport {
            balances_repaired: repaired.len(),
            status_mismatches: mismatches.len(),
            sessions_evicted: evicted,
        };
        tracing::info!(
            balances_repaired = report.balances_repaired,
            status_mismatches = report.status_mismatches,
            sessions_evicted = report.sessions_evicted,
            "Maintenance pass finished"
        );
        Ok(report)
    }
}
