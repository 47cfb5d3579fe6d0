//! Authenticated HTTP client for the qBittorrent WebUI API (`/api/v2`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use swarmprobe_core::{
    AddTask, EngineClient, EngineError, EngineResult, EngineVersion, InfoHash, TaskFile,
    TaskSnapshot,
};
use tracing::debug;
use url::Url;

use crate::error::{check_body, check_status, decode, transport};
use crate::types::{QbTorrentFile, QbTorrentInfo};

const LOGIN_OK_BODY: &str = "Ok.";

/// Single authenticated session against one WebUI.
///
/// The session cookie lives in the client's cookie store; dropping the client
/// drops the session.
#[derive(Debug, Clone)]
pub struct QbitClient {
    http: Client,
    base_url: Url,
}

impl QbitClient {
    /// Build an unauthenticated client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(base_url: Url, request_timeout: Duration) -> EngineResult<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .timeout(request_timeout)
            .build()
            .map_err(|err| transport("client.build", err))?;
        Ok(Self { http, base_url })
    }

    /// Base URL every API path is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Authenticate and keep the returned session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LoginRejected`] for wrong credentials or a banned
    /// client, and transport errors when the WebUI is unreachable.
    pub async fn login(&self, username: &str, password: &str) -> EngineResult<()> {
        const OPERATION: &str = "auth.login";
        let response = self
            .http
            .post(self.endpoint(OPERATION, "api/v2/auth/login")?)
            .header(REFERER, self.base_url.as_str())
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|err| transport(OPERATION, err))?;
        if response.status() == StatusCode::FORBIDDEN {
            return Err(EngineError::LoginRejected);
        }
        let response = check_status(OPERATION, response, None)?;
        let body = response.text().await.map_err(|err| decode(OPERATION, err))?;
        if body.trim() != LOGIN_OK_BODY {
            return Err(EngineError::LoginRejected);
        }
        debug!(base_url = %self.base_url, "engine login accepted");
        Ok(())
    }

    fn endpoint(&self, operation: &'static str, path: &str) -> EngineResult<Url> {
        self.base_url
            .join(path)
            .map_err(|err| EngineError::Transport {
                operation,
                source: Box::new(err),
            })
    }

    async fn post_form(
        &self,
        operation: &'static str,
        path: &str,
        form: &[(&str, &str)],
        id: Option<&InfoHash>,
    ) -> EngineResult<String> {
        debug!(operation, "engine request");
        let response = self
            .http
            .post(self.endpoint(operation, path)?)
            .form(form)
            .send()
            .await
            .map_err(|err| transport(operation, err))?;
        let response = check_status(operation, response, id)?;
        let body = response.text().await.map_err(|err| decode(operation, err))?;
        check_body(operation, &body)?;
        Ok(body)
    }

    async fn get_text(&self, operation: &'static str, path: &str) -> EngineResult<String> {
        debug!(operation, "engine request");
        let response = self
            .http
            .get(self.endpoint(operation, path)?)
            .send()
            .await
            .map_err(|err| transport(operation, err))?;
        let response = check_status(operation, response, None)?;
        let body = response.text().await.map_err(|err| decode(operation, err))?;
        Ok(body.trim().to_string())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, &str)],
        id: &InfoHash,
    ) -> EngineResult<T> {
        debug!(operation, info_hash = %id, "engine request");
        let response = self
            .http
            .get(self.endpoint(operation, path)?)
            .query(query)
            .send()
            .await
            .map_err(|err| transport(operation, err))?;
        let response = check_status(operation, response, Some(id))?;
        response.json().await.map_err(|err| decode(operation, err))
    }
}

#[async_trait]
impl EngineClient for QbitClient {
    async fn add_task(&self, request: AddTask) -> EngineResult<()> {
        let tags = request.tags.join(",");
        let mut form = vec![("urls", request.uri.as_str())];
        if !tags.is_empty() {
            form.push(("tags", tags.as_str()));
        }
        if let Some(path) = request.save_path.as_deref() {
            form.push(("savepath", path));
        }
        self.post_form("torrents.add", "api/v2/torrents/add", &form, None)
            .await
            .map(|_| ())
    }

    async fn query_tasks(&self, id: &InfoHash) -> EngineResult<Vec<TaskSnapshot>> {
        let entries: Vec<QbTorrentInfo> = self
            .get_json(
                "torrents.info",
                "api/v2/torrents/info",
                &[("hashes", id.as_str())],
                id,
            )
            .await?;
        Ok(entries.into_iter().map(TaskSnapshot::from).collect())
    }

    async fn add_trackers(&self, id: &InfoHash, urls: &[String]) -> EngineResult<()> {
        let joined = urls.join("\n");
        self.post_form(
            "torrents.add_trackers",
            "api/v2/torrents/addTrackers",
            &[("hash", id.as_str()), ("urls", joined.as_str())],
            Some(id),
        )
        .await
        .map(|_| ())
    }

    async fn reannounce(&self, id: &InfoHash) -> EngineResult<()> {
        self.post_form(
            "torrents.reannounce",
            "api/v2/torrents/reannounce",
            &[("hashes", id.as_str())],
            Some(id),
        )
        .await
        .map(|_| ())
    }

    async fn delete_task(&self, id: &InfoHash, purge_data: bool) -> EngineResult<()> {
        let delete_files = if purge_data { "true" } else { "false" };
        self.post_form(
            "torrents.delete",
            "api/v2/torrents/delete",
            &[("hashes", id.as_str()), ("deleteFiles", delete_files)],
            Some(id),
        )
        .await
        .map(|_| ())
    }

    async fn list_files(&self, id: &InfoHash) -> EngineResult<Vec<TaskFile>> {
        let files: Vec<QbTorrentFile> = self
            .get_json(
                "torrents.files",
                "api/v2/torrents/files",
                &[("hash", id.as_str())],
                id,
            )
            .await?;
        Ok(files.into_iter().map(TaskFile::from).collect())
    }

    async fn version(&self) -> EngineResult<EngineVersion> {
        let application = self.get_text("app.version", "api/v2/app/version").await?;
        let web_api = self
            .get_text("app.webapi_version", "api/v2/app/webapiVersion")
            .await?;
        Ok(EngineVersion {
            application,
            web_api,
        })
    }
}
