//! 工具模块 - 错误类型、日志、输入校验
//!
//! # 内容
//!
//! - [`CommerceError`] - 组件错误类型 (converts into `shared::error::AppError`)
//! - [`logger`] - tracing 初始化
//! - [`validation`] - 文本长度限制与校验

pub mod error;
pub mod logger;
pub mod validation;

pub use error::{CommerceError, CommerceResult};
