//! # Message Codec
//!
//! Encodes and decodes [`Message`] values to and from single UDP datagrams.
//!
//! The wire form is one UTF-8 JSON object per datagram, at most
//! [`MAX_DATAGRAM_SIZE`] bytes. Absent fields are omitted from the object
//! entirely, so presence survives an encode/decode round trip. Decoding only
//! fails when the payload is not a well-formed JSON object or its `type` is
//! not a recognized member; unknown keys are ignored.
//!
//! [`MessageCodec`] adapts the same encode/decode pair to
//! `tokio_util::codec` so both sides can speak through `UdpFramed`.

use bytes::{BufMut, BytesMut};
use std::net::SocketAddr;
use tokio_util::codec::{Decoder, Encoder};

use crate::core::message::Message;
use crate::error::{ProtocolError, Result};

/// Largest payload one UDP datagram can carry (65,535 minus IP and UDP
/// headers). Anything larger cannot be produced or accepted.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Encode a message into its datagram payload.
pub fn encode(msg: &Message) -> Result<Vec<u8>> {
    let bytes =
        serde_json::to_vec(msg).map_err(|e| ProtocolError::MalformedMessage(e.to_string()))?;
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::OversizedDatagram(bytes.len()));
    }
    Ok(bytes)
}

/// Decode a datagram payload into a message.
///
/// When `source` is given (the peer address captured at read time), it
/// overrides whatever `address` the payload itself carried, so responses are
/// always routed to the real origin.
pub fn decode(bytes: &[u8], source: Option<SocketAddr>) -> Result<Message> {
    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::OversizedDatagram(bytes.len()));
    }
    let msg: Message =
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedMessage(e.to_string()))?;
    Ok(match source {
        Some(addr) => msg.with_address(addr),
        None => msg,
    })
}

/// `tokio_util` codec speaking one message per datagram.
pub struct MessageCodec;

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if src.is_empty() {
            return Ok(None);
        }
        // UdpFramed hands us exactly one datagram; consume it whole.
        let datagram = src.split_to(src.len());
        decode(&datagram, None).map(Some)
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<()> {
        let bytes = encode(&msg)?;
        dst.reserve(bytes.len());
        dst.put_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::core::message::MessageType;

    #[test]
    fn absent_fields_are_omitted_from_the_wire() {
        let msg = Message::builder(MessageType::Command)
            .command("info")
            .build();
        let bytes = encode(&msg).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();

        assert!(text.contains("\"type\":\"COMMAND\""));
        assert!(text.contains("\"command\":\"info\""));
        assert!(!text.contains("args"));
        assert!(!text.contains("null"));
    }

    #[test]
    fn decode_accepts_a_subset_of_recognized_keys() {
        let msg = decode(br#"{"type":"RESPONSE","message":"ok"}"#, None).unwrap();
        assert_eq!(msg.kind(), MessageType::Response);
        assert_eq!(msg.message(), Some("ok"));
        assert!(!msg.has_command());
    }

    #[test]
    fn decode_ignores_unknown_keys() {
        let msg = decode(br#"{"type":"COMMAND","command":"show","extra":1}"#, None).unwrap();
        assert_eq!(msg.command(), Some("show"));
    }

    #[test]
    fn decode_rejects_unrecognized_type() {
        let err = decode(br#"{"type":"PING"}"#, None).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedMessage(_)));
    }

    #[test]
    fn decode_rejects_non_json() {
        let err = decode(b"not json at all", None).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedMessage(_)));
    }

    #[test]
    fn source_address_overrides_payload_address() {
        let source: SocketAddr = "192.0.2.7:9100".parse().unwrap();
        let msg = decode(
            br#"{"type":"COMMAND","command":"info","address":"10.0.0.1:1"}"#,
            Some(source),
        )
        .unwrap();
        assert_eq!(msg.address(), Some(source));
    }

    #[test]
    fn address_renders_as_host_port_and_parses_back() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let msg = Message::builder(MessageType::Response)
            .message("done")
            .address(addr)
            .build();

        let bytes = encode(&msg).unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.contains("\"address\":\"127.0.0.1:9000\""));

        let back = decode(&bytes, None).unwrap();
        assert_eq!(back.address(), Some(addr));
    }

    #[test]
    fn oversized_payload_cannot_be_produced() {
        let msg = Message::builder(MessageType::Response)
            .message("x".repeat(MAX_DATAGRAM_SIZE))
            .build();
        let err = encode(&msg).unwrap_err();
        assert!(matches!(err, ProtocolError::OversizedDatagram(_)));
    }

    #[test]
    fn codec_round_trips_through_bytesmut() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let msg = Message::builder(MessageType::Command)
            .command("insert")
            .args(vec!["\"car1\"".into(), "3.0".into()])
            .login("clay")
            .password("secret")
            .address(addr)
            .build();

        let mut buf = BytesMut::new();
        MessageCodec.encode(msg.clone(), &mut buf).unwrap();
        let decoded = MessageCodec.decode(&mut buf).unwrap().expect("one frame");

        assert_eq!(decoded, msg);
        assert!(buf.is_empty());
    }
}
