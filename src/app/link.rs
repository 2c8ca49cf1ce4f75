use crate::config::GameConfig;
use crate::game::types::GameState;
use crate::lobby::{json, LobbyClient, LobbyError};
use crate::protocol::{self, DecodeError, Limits, StateFrame};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload has no state field")]
    MissingState,
    #[error("state is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("state frame: {0}")]
    Decode(#[from] DecodeError),
}

/// `{"state":"<base64 frame>","from":"<identifier>"}`
pub fn encode_payload(state: &GameState, identifier: &str) -> String {
    let frame = STANDARD.encode(protocol::encode_state(state));
    serde_json::json!({ "state": frame, "from": identifier }).to_string()
}

pub fn decode_payload(payload: &str, limits: &Limits) -> Result<StateFrame, PayloadError> {
    let encoded = json::extract_string(payload, "state").ok_or(PayloadError::MissingState)?;
    let bytes = STANDARD.decode(encoded.as_bytes())?;
    Ok(protocol::decode_state(&bytes, limits)?)
}

/// Publishes local snapshots to the lobby session and tracks the newest
/// snapshot received from another participant.
pub struct LobbyLink {
    client: LobbyClient,
    limits: Limits,
    remote: Option<StateFrame>,
}

impl LobbyLink {
    /// Joins the configured session, or finds or hosts one.
    pub async fn start(config: &GameConfig, name: &str) -> Result<Self, LobbyError> {
        let client = LobbyClient::new(
            config.mp_server_host(),
            config.mp_server_port(),
            config.mp_identifier(),
        );
        Self::with_client(client, config.wire_limits(), config.mp_session(), name).await
    }

    pub async fn with_client(
        mut client: LobbyClient,
        limits: Limits,
        session: &str,
        name: &str,
    ) -> Result<Self, LobbyError> {
        let assigned = if session.is_empty() {
            client.auto_join_or_host(name).await?
        } else {
            client.join(session, name).await?
        };
        match &assigned {
            Some(session) => tracing::info!(session = %session, "lobby session ready"),
            None => tracing::warn!("lobby did not assign a session"),
        }
        Ok(Self {
            client,
            limits,
            remote: None,
        })
    }

    pub fn session(&self) -> Option<String> {
        self.client.session()
    }

    pub fn remote(&self) -> Option<&StateFrame> {
        self.remote.as_ref()
    }

    pub async fn publish(&mut self, state: &GameState) -> Result<(), LobbyError> {
        let payload = encode_payload(state, self.client.identifier());
        self.client.send_game(&payload).await
    }

    /// Drains queued payloads and keeps the newest one that decodes. Returns
    /// whether the remote snapshot changed.
    pub fn drain(&mut self) -> bool {
        let mut updated = false;
        while let Some(payload) = self.client.poll_message() {
            if json::extract_string(&payload, "from").as_deref() == Some(self.client.identifier()) {
                continue;
            }
            match decode_payload(&payload, &self.limits) {
                Ok(frame) => {
                    self.remote = Some(frame);
                    updated = true;
                }
                Err(error) => tracing::debug!(?error, "ignored lobby payload"),
            }
        }
        updated
    }

    pub async fn stop(&mut self) {
        self.client.stop().await;
    }
}
