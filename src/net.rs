use crate::game::input::InputState;
use crate::game::types::GameState;
use crate::protocol::{self, DecodeError, Limits, StateFrame, MAX_FRAME_LEN};
use std::fmt::Write as _;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

const PREVIEW_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
}

pub(crate) fn hex_preview(data: &[u8]) -> String {
    let mut out = String::with_capacity(PREVIEW_BYTES * 3);
    for byte in data.iter().take(PREVIEW_BYTES) {
        let _ = write!(out, "{byte:02x} ");
    }
    if data.len() > PREVIEW_BYTES {
        out.push_str("..");
    }
    out.trim_end().to_string()
}

/// Writes one frame: big-endian u32 length, then the payload.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ChannelError>
where
    W: AsyncWrite + Unpin,
{
    if payload.is_empty() {
        return Err(DecodeError::EmptyFrame.into());
    }
    if payload.len() > MAX_FRAME_LEN {
        return Err(DecodeError::FrameTooLarge(payload.len()).into());
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    tracing::trace!(len = payload.len(), preview = %hex_preview(payload), "frame sent");
    Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix).await?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len == 0 {
        return Err(DecodeError::EmptyFrame.into());
    }
    if len > MAX_FRAME_LEN {
        return Err(DecodeError::FrameTooLarge(len).into());
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    tracing::trace!(len, preview = %hex_preview(&payload), "frame received");
    Ok(payload)
}

/// Point-to-point link carrying input frames one way and state frames the
/// other. Library surface for direct peer links; the game binary shares
/// state through the lobby (`app::link`) instead.
pub struct StateChannel {
    stream: TcpStream,
    limits: Limits,
}

impl StateChannel {
    pub async fn connect(host: &str, port: u16, limits: Limits) -> Result<Self, ChannelError> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        tracing::info!(host, port, "state channel connected");
        Ok(Self { stream, limits })
    }

    pub fn from_stream(stream: TcpStream, limits: Limits) -> Self {
        Self { stream, limits }
    }

    pub async fn send_input(&mut self, input: &InputState) -> Result<(), ChannelError> {
        let mut encoder = protocol::Encoder::with_capacity(1);
        encoder.write_u8(protocol::encode_input(input));
        write_frame(&mut self.stream, &encoder.into_vec()).await
    }

    pub async fn recv_input(&mut self) -> Result<InputState, ChannelError> {
        let payload = read_frame(&mut self.stream).await?;
        Ok(protocol::decode_input(payload[0]))
    }

    pub async fn send_state(&mut self, state: &GameState) -> Result<(), ChannelError> {
        write_frame(&mut self.stream, &protocol::encode_state(state)).await
    }

    pub async fn recv_state(&mut self) -> Result<StateFrame, ChannelError> {
        let payload = read_frame(&mut self.stream).await?;
        Ok(protocol::decode_state(&payload, &self.limits)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::sim::{SimConfig, Simulation};
    use tokio::net::TcpListener;

    fn make_sim() -> Simulation {
        Simulation::new(&SimConfig {
            width: 12,
            height: 12,
            seed: 9,
            num_players: 2,
            max_players: 2,
            max_length: 32,
            max_food: 3,
            players: Vec::new(),
        })
        .expect("sim")
    }

    #[tokio::test]
    async fn frames_round_trip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_frame(&mut a, b"hello").await.expect("write");
        assert_eq!(read_frame(&mut b).await.expect("read"), b"hello");
    }

    #[tokio::test]
    async fn oversized_and_empty_prefixes_are_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&(MAX_FRAME_LEN as u32 + 1).to_be_bytes()).await.expect("write");
        assert!(matches!(
            read_frame(&mut b).await,
            Err(ChannelError::Decode(DecodeError::FrameTooLarge(_)))
        ));

        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&0u32.to_be_bytes()).await.expect("write");
        assert!(matches!(
            read_frame(&mut b).await,
            Err(ChannelError::Decode(DecodeError::EmptyFrame))
        ));
        assert!(write_frame(&mut a, &[]).await.is_err());
    }

    #[tokio::test]
    async fn state_and_input_cross_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let sim = make_sim();
        let expected = StateFrame::from_state(sim.state());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut channel = StateChannel::from_stream(stream, Limits::default());
            let input = channel.recv_input().await.expect("input");
            channel.send_state(sim.state()).await.expect("state");
            input
        });

        let mut client = StateChannel::connect("127.0.0.1", port, Limits::default())
            .await
            .expect("connect");
        let input = InputState {
            move_up: true,
            pause_toggle: true,
            ..InputState::default()
        };
        client.send_input(&input).await.expect("send");
        let frame = client.recv_state().await.expect("recv");
        assert_eq!(frame, expected);

        let received = server.await.expect("join");
        assert!(received.move_up && received.pause_toggle && received.any_key);
    }

    #[test]
    fn preview_is_truncated() {
        assert_eq!(hex_preview(&[0xab, 0x01]), "ab 01");
        assert!(hex_preview(&[0u8; 40]).ends_with(".."));
    }
}
