//! Engine client trait implemented by download-engine adapters.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::magnet::InfoHash;
use crate::model::{AddTask, EngineVersion, TaskFile, TaskSnapshot};

/// Remote download engine as seen by the probe.
///
/// Every call may block on the network and may fail; implementations perform no retries.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Register a new task.
    async fn add_task(&self, request: AddTask) -> EngineResult<()>;

    /// Query snapshots for one identifier (zero or one element).
    async fn query_tasks(&self, id: &InfoHash) -> EngineResult<Vec<TaskSnapshot>>;

    /// Attach supplementary tracker URLs to a task.
    async fn add_trackers(&self, id: &InfoHash, urls: &[String]) -> EngineResult<()>;

    /// Force the task to re-announce to its trackers.
    async fn reannounce(&self, id: &InfoHash) -> EngineResult<()>;

    /// Remove a task, optionally purging its downloaded data.
    async fn delete_task(&self, id: &InfoHash, purge_data: bool) -> EngineResult<()>;

    /// List the files of a task whose metadata is known.
    async fn list_files(&self, id: &InfoHash) -> EngineResult<Vec<TaskFile>>;

    /// Read the engine application and API versions.
    async fn version(&self) -> EngineResult<EngineVersion>;

    /// Fetch the single snapshot for `id`, if the engine knows the task.
    async fn query_task(&self, id: &InfoHash) -> EngineResult<Option<TaskSnapshot>> {
        Ok(self.query_tasks(id).await?.into_iter().next())
    }
}

/// Control over the authenticated engine session.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Discard the current session and log in again, returning the engine versions.
    async fn relogin(&self) -> EngineResult<EngineVersion>;
}
