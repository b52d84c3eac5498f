//! Redis StatusStore implementation.

use super::error::StoreError;
use super::pool::RedisPool;
use super::VIDEO_STATUS_PREFIX;
use crate::domain::jobs::{JobStatus, StatusRecord};
use crate::ports::status_store::StatusStore;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;

#[async_trait]
impl StatusStore for RedisPool {
    async fn set_status(
        &self,
        id: &str,
        status: JobStatus,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.pool.get().await.map_err(StoreError::from)?;
        let key = format!("{}{}", VIDEO_STATUS_PREFIX, id);
        let record = StatusRecord::new(id, status);
        let json = serde_json::to_string(&record)?;
        conn.set::<_, _, ()>(&key, json)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn get_status(
        &self,
        id: &str,
    ) -> Result<Option<StatusRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.pool.get().await.map_err(StoreError::from)?;
        let key = format!("{}{}", VIDEO_STATUS_PREFIX, id);
        let json: Option<String> = conn.get(&key).await.map_err(StoreError::from)?;
        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }
}
