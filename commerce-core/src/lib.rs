//! Commerce Core - gift card ledger and order fulfillment
//!
//! # 架构概述
//!
//! - **Delivery Estimator** (`delivery`): pure delivery-date rules
//! - **Gift Card Ledger** (`gift_cards`): balances backed by an append-only transaction log
//! - **Fulfillment** (`orders`): order status state machine with immutable status history
//! - **Abandoned Carts** (`carts`): one active cart per email, reconciled against orders
//! - **Checkout** (`checkout`): redeem → place order → recover cart
//! - **Notifications** (`notify`): best-effort dispatch through a background worker
//! - **Sessions** (`sessions`): TTL-scoped recently-viewed / guest cart store
//!
//! # 模块结构
//!
//! ```text
//! commerce-core/src/
//! ├── core/          # 配置、组件装配
//! ├── db/            # redb 存储 (表定义、计数器)
//! ├── delivery/      # 配送日期估算
//! ├── gift_cards/    # 礼品卡账本
//! ├── orders/        # 订单状态机
//! ├── carts/         # 弃购车
//! ├── checkout/      # 结账流程
//! ├── notify/        # 通知分发
//! ├── sessions/      # 会话存储
//! └── utils/         # 错误、日志、校验
//! ```

pub mod carts;
pub mod checkout;
pub mod core;
pub mod db;
pub mod delivery;
pub mod gift_cards;
pub mod money;
pub mod notify;
pub mod orders;
pub mod sessions;
pub mod utils;

// Re-export 公共类型
pub use carts::CartReconciler;
pub use checkout::{CheckoutReceipt, CheckoutRequest, CheckoutService};
pub use core::{CommerceCore, Config};
pub use db::{CommerceDb, StorageError};
pub use delivery::{DeliveryQuery, DeliveryRange};
pub use gift_cards::GiftCardLedger;
pub use notify::{DispatchError, LoggingDispatcher, NotificationDispatcher, NotificationService};
pub use orders::FulfillmentManager;
pub use sessions::SessionStore;
pub use utils::{CommerceError, CommerceResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
