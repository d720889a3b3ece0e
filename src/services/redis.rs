//! Redis service for request idempotency keys

use redis::Client;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    /// Claim a key for `ttl_secs` with `SET NX EX`.
    /// Returns false when the key was already claimed.
    pub async fn claim(&self, key: &str, ttl_secs: u64) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to claim idempotency key: {}", e)))?;
        Ok(reply.is_some())
    }

    /// Give a claimed key back
    pub async fn release(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to release idempotency key: {}", e)))?;
        Ok(())
    }
}

/// Redis key for an idempotent request, scoped to the caller and route
pub fn idempotency_key(user: &uuid::Uuid, method: &str, path: &str, key: &str) -> String {
    format!("idempotency:{}:{}:{}:{}", user, method, path, key.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_scoping() {
        let user = uuid::Uuid::nil();
        let a = idempotency_key(&user, "POST", "/api/v1/borrow-records", " abc ");
        assert_eq!(
            a,
            "idempotency:00000000-0000-0000-0000-000000000000:POST:/api/v1/borrow-records:abc"
        );
        assert_ne!(a, idempotency_key(&user, "POST", "/api/v1/fines", "abc"));
    }
}
