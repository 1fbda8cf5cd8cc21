//! Integration tests for the wire codec.
//!
//! Encode∘decode must be the identity on the populated-field subset: a
//! message comes back with exactly the fields it had present, equal values,
//! and nothing materialized for the absent ones.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use std::net::SocketAddr;
use vehicle_protocol::core::codec::{decode, encode, MAX_DATAGRAM_SIZE};
use vehicle_protocol::core::message::{Message, MessageType};
use vehicle_protocol::ProtocolError;

#[test]
fn fully_populated_message_round_trips() {
    let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
    let msg = Message::builder(MessageType::Command)
        .command("insert")
        .args(vec!["\"car1\"".into(), "3.0".into(), "4.0".into()])
        .message("payload")
        .address(addr)
        .login("clay")
        .password("secret")
        .build();

    let decoded = decode(&encode(&msg).unwrap(), None).unwrap();
    assert_eq!(decoded, msg);
}

#[test]
fn minimal_message_round_trips_without_growing_fields() {
    let msg = Message::builder(MessageType::Response).build();
    let decoded = decode(&encode(&msg).unwrap(), None).unwrap();

    assert_eq!(decoded, msg);
    assert!(!decoded.has_command());
    assert!(!decoded.has_args());
    assert!(!decoded.has_message());
    assert!(!decoded.has_address());
    assert!(!decoded.has_login());
    assert!(!decoded.has_password());
}

#[test]
fn empty_args_are_preserved_as_present() {
    let msg = Message::builder(MessageType::Command)
        .command("info")
        .args(vec![])
        .build();
    let decoded = decode(&encode(&msg).unwrap(), None).unwrap();
    assert!(decoded.has_args());
    assert_eq!(decoded.args(), Some(&[][..]));
}

#[test]
fn wire_form_matches_the_documented_shape() {
    let bytes = encode(
        &Message::builder(MessageType::Command)
            .command("info")
            .build(),
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let object = value.as_object().unwrap();

    assert_eq!(object.get("type").unwrap(), "COMMAND");
    assert_eq!(object.get("command").unwrap(), "info");
    assert_eq!(object.len(), 2);
}

#[test]
fn truncated_payload_is_a_decode_failure_not_a_crash() {
    let bytes = encode(
        &Message::builder(MessageType::Response)
            .message("a long enough payload to truncate")
            .build(),
    )
    .unwrap();

    let err = decode(&bytes[..bytes.len() / 2], None).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedMessage(_)));
}

#[test]
fn oversized_receipt_is_rejected() {
    let oversized = vec![b'a'; MAX_DATAGRAM_SIZE + 1];
    let err = decode(&oversized, None).unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedDatagram(_)));
}

fn optional_string() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[a-zA-Z0-9 _.-]{0,24}")
}

proptest! {
    // Presence of every optional field survives the round trip for
    // arbitrary populated subsets.
    #[test]
    fn prop_presence_round_trips(
        command in optional_string(),
        args in proptest::option::of(prop::collection::vec("[a-zA-Z0-9\".-]{0,12}", 0..6)),
        message in optional_string(),
        login in optional_string(),
        password in optional_string(),
        with_address in any::<bool>(),
    ) {
        let mut builder = Message::builder(MessageType::Command);
        if let Some(c) = &command { builder = builder.command(c.clone()); }
        if let Some(a) = &args { builder = builder.args(a.clone()); }
        if let Some(m) = &message { builder = builder.message(m.clone()); }
        if let Some(l) = &login { builder = builder.login(l.clone()); }
        if let Some(p) = &password { builder = builder.password(p.clone()); }
        if with_address {
            builder = builder.address("10.0.0.1:7777".parse().unwrap());
        }
        let msg = builder.build();

        let decoded = decode(&encode(&msg).unwrap(), None).unwrap();
        prop_assert_eq!(decoded, msg);
    }
}
