//! 核心模块 - 配置与组件装配
//!
//! - [`Config`] - 配置 (环境变量)
//! - [`CommerceCore`] - 组件装配

pub mod config;
pub mod state;

pub use config::Config;
pub use state::{CommerceCore, MaintenanceReport};
