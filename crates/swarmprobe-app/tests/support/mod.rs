#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use swarmprobe_core::{
    AddTask, EngineClient, EngineError, EngineResult, EngineVersion, InfoHash, SessionControl,
    TaskFile, TaskSnapshot,
};
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const LINK: &str = "magnet:?xt=urn:btih:ABCDEF1234567890ABCDEF1234567890ABCDEF12&dn=test";
pub const HASH: &str = "abcdef1234567890abcdef1234567890abcdef12";

/// Engine call as observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Add(AddTask),
    Query,
    AddTrackers(Vec<String>),
    Reannounce,
    Delete { purge: bool },
    ListFiles,
    Version,
}

/// Scripted answer to one `query_tasks` call.
#[derive(Debug, Clone)]
pub enum Reply {
    Missing,
    Snapshot(TaskSnapshot),
    Fail,
}

fn failure(operation: &'static str) -> EngineError {
    EngineError::Transport {
        operation,
        source: Box::new(io::Error::other("connection reset")),
    }
}

pub fn fetching_metadata() -> TaskSnapshot {
    TaskSnapshot {
        name: HASH.to_string(),
        state: "metaDL".to_string(),
        ..TaskSnapshot::default()
    }
}

pub fn downloading(availability: f64) -> TaskSnapshot {
    TaskSnapshot {
        name: "test".to_string(),
        state: "downloading".to_string(),
        total_size: 1_048_576,
        seeds_connected: 3,
        leechers_connected: 2,
        seeds_in_swarm: 25,
        leechers_in_swarm: 9,
        download_speed: 10_240,
        downloaded: 524_288,
        availability,
        progress: 0.5,
    }
}

/// Engine fake recording every call with its virtual timestamp.
pub struct RecordingEngine {
    started: Instant,
    calls: RwLock<Vec<(Duration, Call)>>,
    replies: RwLock<VecDeque<Reply>>,
    last_reply: RwLock<Reply>,
    pub fail_add: bool,
    pub fail_trackers: bool,
    pub fail_reannounce: bool,
    pub fail_delete: bool,
    pub fail_files: bool,
    pub fail_relogin: bool,
    pub files: Vec<TaskFile>,
}

impl RecordingEngine {
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            started: Instant::now(),
            calls: RwLock::new(Vec::new()),
            replies: RwLock::new(replies.into_iter().collect()),
            last_reply: RwLock::new(Reply::Missing),
            fail_add: false,
            fail_trackers: false,
            fail_reannounce: false,
            fail_delete: false,
            fail_files: false,
            fail_relogin: false,
            files: vec![TaskFile {
                name: "test/payload.bin".to_string(),
                size: 1_048_576,
            }],
        }
    }

    async fn record(&self, call: Call) {
        self.calls
            .write()
            .await
            .push((self.started.elapsed(), call));
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls
            .read()
            .await
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub async fn timed_calls(&self) -> Vec<(Duration, Call)> {
        self.calls.read().await.clone()
    }

    pub async fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|(_, call)| matches(call))
            .count()
    }

    pub async fn deletes(&self) -> Vec<bool> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|(_, call)| match call {
                Call::Delete { purge } => Some(*purge),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EngineClient for RecordingEngine {
    async fn add_task(&self, request: AddTask) -> EngineResult<()> {
        self.record(Call::Add(request)).await;
        if self.fail_add {
            return Err(EngineError::Rejected {
                operation: "torrents.add",
                detail: "Fails.".to_string(),
            });
        }
        Ok(())
    }

    async fn query_tasks(&self, _id: &InfoHash) -> EngineResult<Vec<TaskSnapshot>> {
        self.record(Call::Query).await;
        let reply = match self.replies.write().await.pop_front() {
            Some(reply) => {
                *self.last_reply.write().await = reply.clone();
                reply
            }
            None => self.last_reply.read().await.clone(),
        };
        match reply {
            Reply::Missing => Ok(Vec::new()),
            Reply::Snapshot(snapshot) => Ok(vec![snapshot]),
            Reply::Fail => Err(failure("torrents.info")),
        }
    }

    async fn add_trackers(&self, _id: &InfoHash, urls: &[String]) -> EngineResult<()> {
        self.record(Call::AddTrackers(urls.to_vec())).await;
        if self.fail_trackers {
            return Err(failure("torrents.add_trackers"));
        }
        Ok(())
    }

    async fn reannounce(&self, _id: &InfoHash) -> EngineResult<()> {
        self.record(Call::Reannounce).await;
        if self.fail_reannounce {
            return Err(failure("torrents.reannounce"));
        }
        Ok(())
    }

    async fn delete_task(&self, _id: &InfoHash, purge_data: bool) -> EngineResult<()> {
        self.record(Call::Delete { purge: purge_data }).await;
        if self.fail_delete {
            return Err(failure("torrents.delete"));
        }
        Ok(())
    }

    async fn list_files(&self, id: &InfoHash) -> EngineResult<Vec<TaskFile>> {
        self.record(Call::ListFiles).await;
        if self.fail_files {
            return Err(EngineError::NotFound {
                info_hash: id.to_string(),
            });
        }
        Ok(self.files.clone())
    }

    async fn version(&self) -> EngineResult<EngineVersion> {
        self.record(Call::Version).await;
        Ok(EngineVersion {
            application: "v4.6.2".to_string(),
            web_api: "2.9.3".to_string(),
        })
    }
}

#[async_trait]
impl SessionControl for RecordingEngine {
    async fn relogin(&self) -> EngineResult<EngineVersion> {
        if self.fail_relogin {
            return Err(EngineError::LoginRejected);
        }
        self.version().await
    }
}
