use anyhow::Context;
use chrono_tz::Tz;

use crate::auth::JwtConfig;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | DATABASE_PATH | ./perch.db | SQLite 数据库路径 |
/// | BUSINESS_TIMEZONE | Europe/Berlin | 业务时区 (政策/打款锚点) |
/// | GATEWAY_BASE_URL | http://localhost:4242 | 支付网关地址 |
/// | GATEWAY_API_KEY | (空) | 支付网关 API key |
/// | GATEWAY_WEBHOOK_SECRET | (必填) | webhook HMAC 密钥 |
/// | GATEWAY_TIMESTAMP_TOLERANCE_SECS | 300 | webhook 时间戳容差 |
/// | ENVIRONMENT | development | 运行环境 |
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// SQLite 数据库文件路径
    pub database_path: String,
    /// 业务时区: 退款政策 09:00 锚点 / 打款 23:00 锚点都在此时区计算
    pub business_timezone: Tz,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 支付网关配置
    pub gateway: GatewayConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
}

/// 支付网关配置
///
/// 显式传入各组件构造函数，测试可注入假网关，避免进程级单例。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    /// webhook 签名共享密钥
    pub webhook_secret: String,
    /// webhook 时间戳容差 (秒)
    pub timestamp_tolerance_secs: i64,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let business_timezone: Tz = std::env::var("BUSINESS_TIMEZONE")
            .unwrap_or_else(|_| "Europe/Berlin".into())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid BUSINESS_TIMEZONE: {}", e))?;

        let webhook_secret = std::env::var("GATEWAY_WEBHOOK_SECRET")
            .context("GATEWAY_WEBHOOK_SECRET must be set")?;

        Ok(Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./perch.db".into()),
            business_timezone,
            jwt: JwtConfig::from_env(),
            gateway: GatewayConfig {
                base_url: std::env::var("GATEWAY_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:4242".into()),
                api_key: std::env::var("GATEWAY_API_KEY").unwrap_or_default(),
                webhook_secret,
                timestamp_tolerance_secs: std::env::var("GATEWAY_TIMESTAMP_TOLERANCE_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            },
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
        })
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(database_path: impl Into<String>, http_port: u16) -> Self {
        Self {
            http_port,
            database_path: database_path.into(),
            business_timezone: chrono_tz::Europe::Berlin,
            jwt: JwtConfig::for_tests(),
            gateway: GatewayConfig {
                base_url: "http://localhost:4242".into(),
                api_key: "test-key".into(),
                webhook_secret: "test-webhook-secret".into(),
                timestamp_tolerance_secs: 300,
            },
            environment: "test".into(),
            request_timeout_ms: 5000,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
