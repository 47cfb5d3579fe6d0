//! Process-wide engine connection handle.

use std::sync::Arc;

use async_trait::async_trait;
use swarmprobe_config::EngineSettings;
use swarmprobe_core::{
    AddTask, EngineClient, EngineError, EngineResult, EngineVersion, InfoHash, SessionControl,
    TaskFile, TaskSnapshot,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::client::QbitClient;

/// Holds at most one authenticated [`QbitClient`].
///
/// Commands share the handle through `Arc<dyn EngineClient>`. Logins run
/// outside the handle lock, one at a time behind `login_gate`, so calls on
/// an existing session never wait for a login in progress. A new session
/// replaces the current one only once its login succeeded.
///
/// When no session exists, the first call makes a single login attempt; a
/// failed attempt leaves the handle unset and the call fails with
/// [`EngineError::NotConnected`] carrying the login failure.
pub struct EngineConnection {
    settings: EngineSettings,
    current: RwLock<Option<Arc<QbitClient>>>,
    login_gate: Mutex<()>,
}

impl EngineConnection {
    /// Create an unconnected handle.
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            current: RwLock::new(None),
            login_gate: Mutex::new(()),
        }
    }

    /// Whether an authenticated session is held.
    pub async fn is_connected(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Log in and read the engine versions, installing the session on success.
    ///
    /// Failures are logged with setup guidance and leave any existing
    /// session in place.
    ///
    /// # Errors
    ///
    /// Returns the login, transport or version error that prevented the connection.
    pub async fn connect(&self) -> EngineResult<EngineVersion> {
        let _login = self.login_gate.lock().await;
        self.install().await.map(|(_, version)| version)
    }

    /// Establish a session and swap it in. Callers hold `login_gate`.
    async fn install(&self) -> EngineResult<(Arc<QbitClient>, EngineVersion)> {
        match self.establish().await {
            Ok((client, version)) => {
                info!(
                    engine = %client.base_url(),
                    application = %version.application,
                    web_api = %version.web_api,
                    "engine connected"
                );
                let client = Arc::new(client);
                *self.current.write().await = Some(Arc::clone(&client));
                Ok((client, version))
            }
            Err(err) => {
                warn!(
                    engine_host = %self.settings.host,
                    engine_port = self.settings.port,
                    error = %err.describe(),
                    "engine connection failed; check that the WebUI is enabled, \
                     reachable at the configured host and port, and that the \
                     credentials are correct"
                );
                Err(err)
            }
        }
    }

    async fn establish(&self) -> EngineResult<(QbitClient, EngineVersion)> {
        let base_url = self
            .settings
            .base_url()
            .map_err(|err| EngineError::Transport {
                operation: "client.build",
                source: Box::new(err),
            })?;
        let client = QbitClient::new(base_url, self.settings.request_timeout())?;
        client
            .login(&self.settings.username, &self.settings.password)
            .await?;
        let version = client.version().await?;
        Ok((client, version))
    }

    async fn session(&self) -> Option<Arc<QbitClient>> {
        self.current.read().await.as_ref().map(Arc::clone)
    }

    async fn client(&self, operation: &'static str) -> EngineResult<Arc<QbitClient>> {
        if let Some(client) = self.session().await {
            return Ok(client);
        }
        let _login = self.login_gate.lock().await;
        // Another caller may have logged in while this one waited.
        if let Some(client) = self.session().await {
            return Ok(client);
        }
        self.install()
            .await
            .map(|(client, _)| client)
            .map_err(|source| EngineError::NotConnected {
                operation,
                source: Box::new(source),
            })
    }
}

#[async_trait]
impl EngineClient for EngineConnection {
    async fn add_task(&self, request: AddTask) -> EngineResult<()> {
        self.client("torrents.add").await?.add_task(request).await
    }

    async fn query_tasks(&self, id: &InfoHash) -> EngineResult<Vec<TaskSnapshot>> {
        self.client("torrents.info").await?.query_tasks(id).await
    }

    async fn add_trackers(&self, id: &InfoHash, urls: &[String]) -> EngineResult<()> {
        self.client("torrents.add_trackers")
            .await?
            .add_trackers(id, urls)
            .await
    }

    async fn reannounce(&self, id: &InfoHash) -> EngineResult<()> {
        self.client("torrents.reannounce").await?.reannounce(id).await
    }

    async fn delete_task(&self, id: &InfoHash, purge_data: bool) -> EngineResult<()> {
        self.client("torrents.delete")
            .await?
            .delete_task(id, purge_data)
            .await
    }

    async fn list_files(&self, id: &InfoHash) -> EngineResult<Vec<TaskFile>> {
        self.client("torrents.files").await?.list_files(id).await
    }

    async fn version(&self) -> EngineResult<EngineVersion> {
        self.client("app.version").await?.version().await
    }
}

#[async_trait]
impl SessionControl for EngineConnection {
    async fn relogin(&self) -> EngineResult<EngineVersion> {
        info!("logging in again; the current session stays in use until this succeeds");
        self.connect().await
    }
}
