//! Bearer tokens for project-manager sessions on the redaction surface.

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{Claims, Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::JwtConfig;

pub struct ManagerJwtPayload {
    pub manager_id: Uuid,
    pub expiration: Option<DateTime<Utc>>,
    pub issued_at: DateTime<Utc>,
}

pub trait JwtState: Sized {
    fn to_claims(&self) -> Claims;

    fn from_claims(claims: &Claims) -> Option<Self>;

    fn serialize(&self, config: &JwtConfig) -> Option<String> {
        let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes()).ok()?;
        let mut claims = self.to_claims();

        claims.registered.issuer = Some(config.issuer.clone());

        if claims.registered.issued_at.is_none() {
            claims.registered.issued_at = Some(Utc::now().timestamp() as u64);
        }

        claims.sign_with_key(&key).ok()
    }

    fn verify(config: &JwtConfig, token: &str) -> Option<Self> {
        let key = Hmac::<Sha256>::new_from_slice(config.secret.as_bytes()).ok()?;
        let token: Token<Header, Claims, _> = token.verify_with_key(&key).ok()?;

        let claims = token.claims();

        if claims.registered.issuer.as_ref() != Some(&config.issuer) {
            return None;
        }

        let iat = Utc
            .timestamp_opt(claims.registered.issued_at? as i64, 0)
            .single()?;
        if iat > Utc::now() {
            return None;
        }

        let exp = claims
            .registered
            .expiration
            .and_then(|x| Utc.timestamp_opt(x as i64, 0).single());
        if let Some(exp) = exp {
            if exp < Utc::now() {
                return None;
            }
        }

        Self::from_claims(claims)
    }
}

impl JwtState for ManagerJwtPayload {
    fn to_claims(&self) -> Claims {
        Claims {
            registered: RegisteredClaims {
                issuer: None,
                subject: Some(self.manager_id.to_string()),
                audience: None,
                expiration: self.expiration.map(|x| x.timestamp() as u64),
                not_before: None,
                issued_at: Some(self.issued_at.timestamp() as u64),
                json_web_token_id: None,
            },
            private: Default::default(),
        }
    }

    fn from_claims(claims: &Claims) -> Option<Self> {
        Some(Self {
            manager_id: claims
                .registered
                .subject
                .as_ref()
                .and_then(|x| Uuid::parse_str(x).ok())?,
            expiration: claims
                .registered
                .expiration
                .and_then(|x| Utc.timestamp_opt(x as i64, 0).single()),
            issued_at: Utc
                .timestamp_opt(claims.registered.issued_at? as i64, 0)
                .single()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "jwt-test-secret".to_string(),
            issuer: "cityworks".to_string(),
        }
    }

    #[test]
    fn round_trip() {
        let manager_id = Uuid::new_v4();
        let token = ManagerJwtPayload {
            manager_id,
            expiration: Some(Utc::now() + Duration::hours(1)),
            issued_at: Utc::now(),
        }
        .serialize(&config())
        .unwrap();

        let payload = ManagerJwtPayload::verify(&config(), &token).unwrap();
        assert_eq!(payload.manager_id, manager_id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = ManagerJwtPayload {
            manager_id: Uuid::new_v4(),
            expiration: Some(Utc::now() - Duration::hours(1)),
            issued_at: Utc::now() - Duration::hours(2),
        }
        .serialize(&config())
        .unwrap();

        assert!(ManagerJwtPayload::verify(&config(), &token).is_none());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let token = ManagerJwtPayload {
            manager_id: Uuid::new_v4(),
            expiration: None,
            issued_at: Utc::now(),
        }
        .serialize(&config())
        .unwrap();

        let other = JwtConfig {
            secret: "jwt-test-secret".to_string(),
            issuer: "someone-else".to_string(),
        };
        assert!(ManagerJwtPayload::verify(&other, &token).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = ManagerJwtPayload {
            manager_id: Uuid::new_v4(),
            expiration: None,
            issued_at: Utc::now(),
        }
        .serialize(&config())
        .unwrap();

        let other = JwtConfig {
            secret: "other-secret".to_string(),
            issuer: "cityworks".to_string(),
        };
        assert!(ManagerJwtPayload::verify(&other, &token).is_none());
    }
}
