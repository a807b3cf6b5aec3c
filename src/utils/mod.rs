//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - 应用错误类型
//! - [`AppResponse`] - API 响应结构
//! - 日志、时间工具

pub mod error;
pub mod logger;
pub mod time;

pub use error::{AppError, AppResponse, AppResult};

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a v4 UUID string for use as resource ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
