//! OAuth2 refresh-token lifecycle with expiry-aware caching.
//!
//! The manager owns the only copy of the access token for the process. A
//! token is exchanged lazily on first use, reused while valid, and replaced
//! once it falls within the safety margin of its expiry. The exchange itself
//! sits behind [`TokenExchange`] so the cache behaviour can be exercised
//! without a network.

use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::config::Credentials;
use crate::errors::SyncError;

/// Tokens this close to expiry are treated as expired to avoid races
/// against in-flight requests.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl AccessToken {
    pub fn is_valid(&self, now: OffsetDateTime) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, SyncError>;
}

/// Real refresh-token exchange against the authorization endpoint.
pub struct HttpTokenExchange {
    client: Client,
    token_url: String,
}

impl HttpTokenExchange {
    pub fn new(client: Client, token_url: String) -> Self {
        Self { client, token_url }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Epoch seconds.
    expires_at: i64,
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, SyncError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|err| SyncError::Auth {
                status: 0,
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Auth {
                status: status.as_u16(),
                reason: "token endpoint returned a non-success status".to_string(),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|err| SyncError::Auth {
            status: status.as_u16(),
            reason: format!("malformed token response: {err}"),
        })?;

        let expires_at =
            OffsetDateTime::from_unix_timestamp(body.expires_at).map_err(|err| SyncError::Auth {
                status: status.as_u16(),
                reason: format!("invalid expires_at: {err}"),
            })?;

        Ok(AccessToken {
            token: body.access_token,
            expires_at,
        })
    }
}

/// Owns the cached access token and its refresh exchange.
///
/// The cache is held across the exchange inside one critical section, so
/// concurrent callers trigger at most one exchange per expiry cycle.
pub struct TokenManager {
    credentials: Credentials,
    exchange: Box<dyn TokenExchange>,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    pub fn new(credentials: Credentials, exchange: Box<dyn TokenExchange>) -> Self {
        Self {
            credentials,
            exchange,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached token while valid, otherwise perform one exchange
    /// and replace the cache before returning.
    pub async fn access_token(&self) -> Result<AccessToken, SyncError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_valid(OffsetDateTime::now_utc()) {
                return Ok(token.clone());
            }
        }
        info!("requesting a new access token");
        let fresh = self.exchange.exchange(&self.credentials).await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn credentials() -> Credentials {
        Credentials {
            client_id: "id".into(),
            client_secret: "secret".into(),
            refresh_token: "refresh".into(),
        }
    }

    struct CountingExchange {
        calls: AtomicUsize,
        ttl_secs: i64,
    }

    #[async_trait]
    impl TokenExchange for CountingExchange {
        async fn exchange(&self, _credentials: &Credentials) -> Result<AccessToken, SyncError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessToken {
                token: format!("token-{n}"),
                expires_at: OffsetDateTime::now_utc() + Duration::seconds(self.ttl_secs),
            })
        }
    }

    struct RejectingExchange;

    #[async_trait]
    impl TokenExchange for RejectingExchange {
        async fn exchange(&self, _credentials: &Credentials) -> Result<AccessToken, SyncError> {
            Err(SyncError::Auth {
                status: 401,
                reason: "bad refresh token".into(),
            })
        }
    }

    #[tokio::test]
    async fn valid_token_is_reused_without_a_second_exchange() {
        let exchange = Box::new(CountingExchange {
            calls: AtomicUsize::new(0),
            ttl_secs: 3600,
        });
        let manager = TokenManager::new(credentials(), exchange);
        let first = manager.access_token().await.unwrap();
        let second = manager.access_token().await.unwrap();
        assert_eq!(first.token, second.token);
        assert_eq!(first.token, "token-1");
    }

    #[tokio::test]
    async fn expired_token_triggers_exactly_one_new_exchange() {
        // Tokens land inside the safety margin, so each call refreshes.
        let exchange = Box::new(CountingExchange {
            calls: AtomicUsize::new(0),
            ttl_secs: 10,
        });
        let manager = TokenManager::new(credentials(), exchange);
        let first = manager.access_token().await.unwrap();
        let second = manager.access_token().await.unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(second.token, "token-2");
    }

    #[tokio::test]
    async fn exchange_rejection_surfaces_as_auth_error() {
        let manager = TokenManager::new(credentials(), Box::new(RejectingExchange));
        let err = manager.access_token().await.unwrap_err();
        assert_eq!(err.code(), "AUTH-1001");
        match err {
            SyncError::Auth { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn token_within_margin_counts_as_expired() {
        let now = OffsetDateTime::now_utc();
        let token = AccessToken {
            token: "t".into(),
            expires_at: now + Duration::seconds(EXPIRY_MARGIN_SECS / 2),
        };
        assert!(!token.is_valid(now));
        let token = AccessToken {
            token: "t".into(),
            expires_at: now + Duration::seconds(EXPIRY_MARGIN_SECS * 2),
        };
        assert!(token.is_valid(now));
    }
}
