pub mod framing;
pub mod json;
pub mod queue;

use crate::config::{MP_IDENTIFIER_MAX, MP_SESSION_MAX};
use crate::net::hex_preview;
use crate::shared::validate::truncate_to_boundary;
use framing::LineBuffer;
use parking_lot::Mutex;
use queue::MessageQueue;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const SESSION_WAIT: Duration = Duration::from_secs(2);
const RECV_CHUNK: usize = 512;

#[derive(Debug, Error)]
pub enum LobbyError {
    #[error("connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("lobby client is not connected")]
    NotConnected,
    #[error("lobby i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("lobby payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct Shared {
    queue: MessageQueue,
    session: Option<String>,
    connected: bool,
}

#[derive(Serialize)]
struct Command<'a, T: Serialize> {
    identifier: &'a str,
    cmd: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
    data: &'a T,
}

#[derive(Serialize)]
struct ListRequest {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct HostRequest<'a> {
    name: &'a str,
    private: bool,
}

#[derive(Serialize)]
struct JoinRequest<'a> {
    name: &'a str,
}

fn encode_command<T: Serialize>(
    identifier: &str,
    cmd: &str,
    session: Option<&str>,
    data: &T,
) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(&Command {
        identifier,
        cmd,
        session,
        data,
    })?;
    line.push(b'\n');
    Ok(line)
}

/// Client for the line-delimited JSON lobby. One spawned task reads the
/// socket; the caller sends commands and polls received game payloads.
pub struct LobbyClient {
    host: String,
    port: u16,
    identifier: String,
    session_wait: Duration,
    shared: Arc<Mutex<Shared>>,
    session_ready: Arc<Notify>,
    writer: Option<OwnedWriteHalf>,
    receiver: Option<JoinHandle<()>>,
}

impl LobbyClient {
    /// An empty identifier is replaced by a fresh v4 uuid.
    pub fn new(host: &str, port: u16, identifier: &str) -> Self {
        let identifier = match identifier.trim() {
            "" => uuid::Uuid::new_v4().to_string(),
            id => truncate_to_boundary(id, MP_IDENTIFIER_MAX).to_string(),
        };
        Self {
            host: host.to_string(),
            port,
            identifier,
            session_wait: SESSION_WAIT,
            shared: Arc::new(Mutex::new(Shared::default())),
            session_ready: Arc::new(Notify::new()),
            writer: None,
            receiver: None,
        }
    }

    pub fn set_session_wait(&mut self, wait: Duration) {
        self.session_wait = wait;
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some() && self.shared.lock().connected
    }

    pub async fn connect_and_start(&mut self) -> Result<(), LobbyError> {
        if self.is_connected() {
            return Ok(());
        }
        self.stop().await;

        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| LobbyError::Connect {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        self.shared.lock().connected = true;
        self.writer = Some(writer);
        self.receiver = Some(tokio::spawn(receive_loop(
            reader,
            Arc::clone(&self.shared),
            Arc::clone(&self.session_ready),
        )));
        tracing::info!(host = %self.host, port = self.port, identifier = %self.identifier, "lobby connected");
        Ok(())
    }

    /// Lists sessions, waits briefly for one to be assigned, and otherwise
    /// hosts a public session. Returns the session id once known.
    pub async fn auto_join_or_host(&mut self, name: &str) -> Result<Option<String>, LobbyError> {
        self.connect_and_start().await?;
        self.send_command("list", None, &ListRequest { kind: "sessions" })
            .await?;

        if let Some(session) = self.wait_for_session().await {
            self.send_command("join", Some(&session), &JoinRequest { name })
                .await?;
            return Ok(Some(session));
        }

        self.send_command(
            "host",
            None,
            &HostRequest {
                name,
                private: false,
            },
        )
        .await?;
        Ok(self.wait_for_session().await)
    }

    pub async fn join(&mut self, session: &str, name: &str) -> Result<Option<String>, LobbyError> {
        self.connect_and_start().await?;
        self.send_command("join", Some(session), &JoinRequest { name })
            .await?;
        Ok(self.wait_for_session().await)
    }

    /// Sends `data_json` as the `data` of a `game` command, tagged with the
    /// current session when one is assigned.
    pub async fn send_game(&mut self, data_json: &str) -> Result<(), LobbyError> {
        let data: serde_json::Value = serde_json::from_str(data_json)?;
        let session = self.session();
        self.send_command("game", session.as_deref(), &data).await
    }

    /// Non-blocking; returns at most one queued game payload.
    pub fn poll_message(&self) -> Option<String> {
        self.shared.lock().queue.pop()
    }

    pub fn pending_messages(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn has_session(&self) -> bool {
        self.shared.lock().session.is_some()
    }

    pub fn session(&self) -> Option<String> {
        self.shared.lock().session.clone()
    }

    /// Shuts the socket down and waits for the receiver task to finish.
    /// The session is forgotten; queued payloads stay available to
    /// `poll_message`.
    pub async fn stop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(error) = writer.shutdown().await {
                tracing::debug!(?error, "lobby shutdown failed");
            }
        }
        if let Some(handle) = self.receiver.take() {
            handle.abort();
            let _ = handle.await;
            tracing::info!("lobby stopped");
        }
        let mut shared = self.shared.lock();
        shared.connected = false;
        shared.session = None;
    }

    async fn send_command<T: Serialize>(
        &mut self,
        cmd: &str,
        session: Option<&str>,
        data: &T,
    ) -> Result<(), LobbyError> {
        let line = encode_command(&self.identifier, cmd, session, data)?;
        let writer = self.writer.as_mut().ok_or(LobbyError::NotConnected)?;
        writer.write_all(&line).await?;
        tracing::trace!(cmd, len = line.len(), preview = %hex_preview(&line), "lobby command sent");
        Ok(())
    }

    async fn wait_for_session(&self) -> Option<String> {
        let deadline = Instant::now() + self.session_wait;
        loop {
            if let Some(session) = self.session() {
                return Some(session);
            }
            let ready = self.session_ready.notified();
            if tokio::time::timeout_at(deadline, ready).await.is_err() {
                return self.session();
            }
        }
    }
}

impl Drop for LobbyClient {
    fn drop(&mut self) {
        if let Some(handle) = self.receiver.take() {
            handle.abort();
        }
    }
}

async fn receive_loop(mut reader: OwnedReadHalf, shared: Arc<Mutex<Shared>>, session_ready: Arc<Notify>) {
    let mut lines = LineBuffer::default();
    let mut chunk = [0u8; RECV_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => {
                tracing::info!("lobby connection closed");
                break;
            }
            Ok(read) => {
                tracing::trace!(len = read, preview = %hex_preview(&chunk[..read]), "lobby bytes received");
                for line in lines.feed(&chunk[..read]) {
                    process_line(&line, &shared, &session_ready);
                }
            }
            Err(error) => {
                tracing::warn!(?error, "lobby receive failed");
                break;
            }
        }
    }
    shared.lock().connected = false;
}

fn process_line(line: &str, shared: &Mutex<Shared>, session_ready: &Notify) {
    match json::command(line).as_deref() {
        Some("game") => {
            let Some(data) = json::extract_field(line, "data") else {
                tracing::debug!("lobby game message without data");
                return;
            };
            let data = data.into_string();
            tracing::debug!(len = data.len(), "lobby game payload");
            if shared.lock().queue.push(data).is_some() {
                tracing::debug!("lobby queue full, dropped oldest payload");
            }
        }
        Some(cmd @ ("host" | "join")) => {
            let Some(session) = json::extract_string(line, "session") else {
                return;
            };
            let session = truncate_to_boundary(&session, MP_SESSION_MAX).to_string();
            tracing::info!(cmd, session = %session, "lobby session assigned");
            shared.lock().session = Some(session);
            session_ready.notify_one();
        }
        Some("list") => match json::extract_field(line, "data") {
            Some(data) => tracing::debug!(data = %data.as_str(), "lobby session list"),
            None => tracing::debug!("lobby session list without data"),
        },
        Some(other) => tracing::trace!(cmd = other, "lobby command ignored"),
        None => tracing::trace!("lobby line without cmd"),
    }
}
