//! Activity log queries

use crate::{
    error::AppResult,
    models::log::{LogEntry, LogQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct LogsService {
    repository: Repository,
}

impl LogsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &LogQuery) -> AppResult<Vec<LogEntry>> {
        self.repository.logs.list(query).await
    }

    pub async fn delete_many(&self, ids: &[i64], admin: &str) -> AppResult<u64> {
        let deleted = self.repository.logs.delete_many(ids).await?;
        tracing::info!(deleted, admin, "log entries deleted");
        Ok(deleted)
    }
}
