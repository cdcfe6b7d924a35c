//! Length-prefixed framing for the TCP bridge.
//!
//! Each frame is a 4-byte big-endian length followed by a JSON document.  The
//! bridge relays pub/sub messages to the client as `Inbound` frames and
//! forwards `Command` frames to the backend.

use serde::{Deserialize, Serialize};

use crate::protocol::{InboundMessage, OutboundCommand};

/// Frames larger than this are treated as a corrupt stream.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "frame", content = "data", rename_all = "snake_case")]
pub enum Frame {
    Inbound(InboundMessage),
    Command(OutboundCommand),
}

impl Frame {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let len = json.len() as u32;
        let mut result = Vec::with_capacity(4 + json.len());
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(&json);
        Ok(result)
    }

    /// Decode one frame from the front of `data`.
    ///
    /// Returns `Ok(None)` when `data` does not yet hold a complete frame, so
    /// callers can keep reading into their buffer.
    pub fn decode(data: &[u8]) -> anyhow::Result<Option<(Self, usize)>> {
        if data.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if len > MAX_FRAME_LEN {
            anyhow::bail!("Frame too large: {} bytes", len);
        }
        if data.len() < 4 + len {
            return Ok(None);
        }
        let frame: Self = serde_json::from_slice(&data[4..4 + len])?;
        Ok(Some((frame, 4 + len)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_encode_decode() {
        let frame = Frame::Command(OutboundCommand::AddPlaylist {
            playlist: "Evening".to_string(),
        });
        let encoded = frame.encode().unwrap();
        let (decoded, len) = Frame::decode(&encoded).unwrap().unwrap();
        assert_eq!(len, encoded.len());
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_partial_frame_waits_for_more() {
        let frame = Frame::Inbound(InboundMessage::state("{}"));
        let encoded = frame.encode().unwrap();
        assert!(Frame::decode(&encoded[..2]).unwrap().is_none());
        assert!(Frame::decode(&encoded[..encoded.len() - 1])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_two_frames_in_one_buffer() {
        let mut buf = Frame::Inbound(InboundMessage::queue("[]")).encode().unwrap();
        buf.extend(Frame::Command(OutboundCommand::GetQueue).encode().unwrap());

        let (first, used) = Frame::decode(&buf).unwrap().unwrap();
        assert!(matches!(first, Frame::Inbound(ref m) if m.body == "[]"));
        let (second, _) = Frame::decode(&buf[used..]).unwrap().unwrap();
        assert_eq!(second, Frame::Command(OutboundCommand::GetQueue));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut buf = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes().to_vec();
        buf.extend_from_slice(b"{}");
        assert!(Frame::decode(&buf).is_err());
    }
}
