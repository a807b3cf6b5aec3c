//! 认证模块 - JWT 验证
//!
//! 令牌签发由外部身份服务负责；本服务只验证令牌并提取 [`CurrentUser`]。

mod extractor;
pub mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};

/// 当前已认证用户 (请求级身份上下文)
///
/// 通过 JWT `sub` claim 提取，注入到请求 extensions。
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// 用户 ID
    pub id: String,
}
