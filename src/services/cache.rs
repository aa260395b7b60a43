use async_trait::async_trait;

/// Invalidates cached query results once an import lands new rows.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, keys: &[String]) -> Result<(), CacheError>;
}

/// Deletes cached entries from the Redis cache shared with the CMMS API.
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url).map_err(CacheError::Redis)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CacheInvalidator for RedisCache {
    async fn invalidate(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::Redis)?;
        redis::cmd("DEL")
            .arg(keys)
            .query_async::<()>(&mut conn)
            .await
            .map_err(CacheError::Redis)?;
        Ok(())
    }
}

/// For callers without a shared cache; only logs.
pub struct NoCache;

#[async_trait]
impl CacheInvalidator for NoCache {
    async fn invalidate(&self, keys: &[String]) -> Result<(), CacheError> {
        tracing::debug!(keys = ?keys, "No cache configured, skipping invalidation");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
