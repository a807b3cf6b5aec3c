//! 服务器状态

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::booking::{BookingService, PaymentReconciler};
use crate::core::Config;
use crate::db::DbService;
use crate::notify::{Notifier, TracingNotifier};
use crate::payments::{HttpPaymentGateway, PaymentGateway};
use crate::utils::AppError;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，克隆成本极低。外部协作方 (支付网关、通知) 以
/// trait 对象注入，测试可替换为假实现，无进程级单例。
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub db: SqlitePool,
    /// JWT 验证服务
    pub jwt_service: Arc<JwtService>,
    /// 支付网关客户端
    pub gateway: Arc<dyn PaymentGateway>,
    /// 通知接口
    pub notifier: Arc<dyn Notifier>,
}

impl ServerState {
    /// 初始化服务器状态 (生产构造路径)
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.database_path).await?;
        Ok(Self::with_collaborators(
            config.clone(),
            db.pool,
            Arc::new(HttpPaymentGateway::new(config.gateway.clone())),
            Arc::new(TracingNotifier),
        ))
    }

    /// 显式注入协作方 (测试用)
    pub fn with_collaborators(
        config: Config,
        db: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let jwt_service = Arc::new(JwtService::new(&config.jwt));
        Self {
            config,
            db,
            jwt_service,
            gateway,
            notifier,
        }
    }

    /// 预订编排服务 (每请求构造，成本为几次 Arc clone)
    pub fn booking_service(&self) -> BookingService {
        BookingService::new(
            self.db.clone(),
            self.gateway.clone(),
            self.notifier.clone(),
            self.config.business_timezone,
        )
    }

    /// 支付对账器
    pub fn reconciler(&self) -> PaymentReconciler {
        PaymentReconciler::new(self.db.clone(), self.gateway.clone(), self.notifier.clone())
    }
}
