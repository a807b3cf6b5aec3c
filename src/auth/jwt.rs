//! JWT 令牌服务
//!
//! 只负责验证和解析外部身份服务签发的令牌。

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// JWT 密钥 (应至少 32 字节，与身份服务共享)
    pub secret: String,
    /// 令牌签发者
    pub issuer: String,
}

impl JwtConfig {
    /// 从环境变量加载
    pub fn from_env() -> Self {
        Self {
            secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| {
                tracing::warn!("JWT_SECRET not set, using development key");
                "development-only-jwt-secret-change-me".to_string()
            }),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "perch-identity".to_string()),
        }
    }

    pub fn for_tests() -> Self {
        Self {
            secret: "test-jwt-secret-at-least-32-bytes!".to_string(),
            issuer: "perch-identity".to_string(),
        }
    }
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID (Subject)
    pub sub: String,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
    /// 签发者
    pub iss: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,
}

/// JWT 验证服务
#[derive(Debug)]
pub struct JwtService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        Self {
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// 验证令牌并返回 Claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                _ => JwtError::InvalidToken(e.to_string()),
            })
    }

    /// 从 Authorization header 提取 Bearer 令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    /// 测试辅助：用共享密钥签发一个令牌 (生产中由身份服务完成)
    pub fn issue_for_tests(config: &JwtConfig, user_id: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + 3600,
            iat: now,
            iss: config.issuer.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn validates_round_trip() {
        let config = JwtConfig::for_tests();
        let service = JwtService::new(&config);
        let token = issue_for_tests(&config, "user-1");
        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn rejects_wrong_secret() {
        let config = JwtConfig::for_tests();
        let other = JwtConfig {
            secret: "another-secret-that-does-not-match".into(),
            issuer: config.issuer.clone(),
        };
        let service = JwtService::new(&config);
        let token = issue_for_tests(&other, "user-1");
        assert!(matches!(
            service.validate_token(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let config = JwtConfig::for_tests();
        let service = JwtService::new(&config);
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            exp: now - 120,
            iat: now - 3600,
            iss: config.issuer.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            service.validate_token(&token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
