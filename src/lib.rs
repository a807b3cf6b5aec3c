//! Perch Server - 桌位预订与支付对账服务
//!
//! # 架构概述
//!
//! 本模块是 Perch 预订引擎的主入口，提供以下核心功能：
//!
//! - **预订生命周期** (`booking`): 软占位 → 支付确认 → 取消/退款
//! - **库存对账** (`db::repository::availability`): 可用/锁定日期池的原子迁移
//! - **支付网关** (`payments`): 外部网关客户端 + webhook 签名验证
//! - **认证** (`auth`): JWT 验证 (签发由外部服务负责)
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! src/
//! ├── core/          # 配置、状态、HTTP 服务器
//! ├── utils/         # 错误、日志、时间工具
//! ├── auth/          # JWT 验证、CurrentUser 提取器
//! ├── db/            # 数据库层 (sqlx SQLite)
//! ├── booking/       # 定价、编排、对账、取消政策、打款排期
//! ├── payments/      # 支付网关接口 + webhook 事件
//! ├── notify/        # 通知接口 (窄接口, 传输层外置)
//! └── api/           # HTTP 路由和处理器
//! ```

pub mod api;
pub mod auth;
pub mod booking;
pub mod core;
pub mod db;
pub mod notify;
pub mod payments;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    ____                 __
   / __ \___  __________/ /_
  / /_/ / _ \/ ___/ ___/ __ \
 / ____/  __/ /  / /__/ / / /
/_/    \___/_/   \___/_/ /_/
    "#
    );
}
