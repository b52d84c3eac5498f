use crate::domain::jobs::{JobStatus, StatusRecord};
use async_trait::async_trait;
use std::error::Error;

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Upsert the status record for `id`, stamping the update time as part
    /// of the same operation.
    async fn set_status(
        &self,
        id: &str,
        status: JobStatus,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Get the status record for `id`, or `None` when unknown.
    async fn get_status(
        &self,
        id: &str,
    ) -> Result<Option<StatusRecord>, Box<dyn Error + Send + Sync>>;
}
