//! # Wire Message
//!
//! The unit of wire exchange between client and server.
//!
//! A [`Message`] carries a `type` plus any subset of the optional fields
//! (`command`, `args`, `message`, `address`, `login`, `password`). Absent
//! fields stay absent: they are omitted from the encoded form entirely and
//! never materialize as empty strings or nulls, which the `has_*` predicates
//! rely on. Messages are built once through the fluent [`MessageBuilder`] and
//! are immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Role of a message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "COMMAND")]
    Command,
    #[serde(rename = "RESPONSE")]
    Response,
    #[serde(rename = "ERROR")]
    Error,
}

impl MessageType {
    /// Wire name of this message type.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Command => "COMMAND",
            MessageType::Response => "RESPONSE",
            MessageType::Error => "ERROR",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMMAND" => Ok(MessageType::Command),
            "RESPONSE" => Ok(MessageType::Response),
            "ERROR" => Ok(MessageType::Error),
            other => Err(format!("unrecognized message type: {other}")),
        }
    }
}

/// One request or response on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,

    #[serde(
        default,
        with = "address_serde",
        skip_serializing_if = "Option::is_none"
    )]
    address: Option<SocketAddr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    login: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

impl Message {
    /// Start building a message of the given type.
    pub fn builder(kind: MessageType) -> MessageBuilder {
        MessageBuilder {
            inner: Message {
                kind,
                command: None,
                args: None,
                message: None,
                address: None,
                login: None,
                password: None,
            },
        }
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn args(&self) -> Option<&[String]> {
        self.args.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn has_command(&self) -> bool {
        self.command.is_some()
    }

    pub fn has_args(&self) -> bool {
        self.args.is_some()
    }

    pub fn has_message(&self) -> bool {
        self.message.is_some()
    }

    pub fn has_address(&self) -> bool {
        self.address.is_some()
    }

    pub fn has_login(&self) -> bool {
        self.login.is_some()
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Return the same message with the address replaced by `addr`.
    ///
    /// Used by the server to stamp the peer address captured at read time
    /// onto a decoded request.
    pub fn with_address(mut self, addr: SocketAddr) -> Self {
        self.address = Some(addr);
        self
    }
}

/// Fluent constructor for [`Message`].
pub struct MessageBuilder {
    inner: Message,
}

impl MessageBuilder {
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.inner.command = Some(command.into());
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.inner.args = Some(args);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.inner.message = Some(message.into());
        self
    }

    pub fn address(mut self, address: SocketAddr) -> Self {
        self.inner.address = Some(address);
        self
    }

    /// Set the address only when one is known.
    pub fn maybe_address(mut self, address: Option<SocketAddr>) -> Self {
        self.inner.address = address;
        self
    }

    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.inner.login = Some(login.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.inner.password = Some(password.into());
        self
    }

    pub fn build(self) -> Message {
        self.inner
    }
}

/// Serde helper rendering `address` as `"host:port"` on the wire.
///
/// Decoding is lenient: an address string that does not parse back into a
/// socket address is treated as absent rather than failing the whole
/// message, since only a missing or unrecognized `type` is a decode error.
mod address_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &Option<SocketAddr>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match addr {
            Some(a) => a.to_string().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SocketAddr>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| s.parse::<SocketAddr>().ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_only_requested_fields() {
        let msg = Message::builder(MessageType::Command)
            .command("info")
            .build();

        assert_eq!(msg.kind(), MessageType::Command);
        assert!(msg.has_command());
        assert!(!msg.has_args());
        assert!(!msg.has_message());
        assert!(!msg.has_address());
        assert!(!msg.has_login());
        assert!(!msg.has_password());
    }

    #[test]
    fn absent_and_empty_are_distinct() {
        let empty = Message::builder(MessageType::Response).message("").build();
        let absent = Message::builder(MessageType::Response).build();

        assert!(empty.has_message());
        assert_eq!(empty.message(), Some(""));
        assert!(!absent.has_message());
    }

    #[test]
    fn message_type_round_trips_through_strings() {
        for kind in [
            MessageType::Command,
            MessageType::Response,
            MessageType::Error,
        ] {
            assert_eq!(kind.as_str().parse::<MessageType>(), Ok(kind));
        }
        assert!("PING".parse::<MessageType>().is_err());
    }

    #[test]
    fn with_address_stamps_peer() {
        let addr: SocketAddr = "10.1.2.3:4242".parse().expect("addr");
        let msg = Message::builder(MessageType::Command)
            .command("show")
            .build()
            .with_address(addr);
        assert_eq!(msg.address(), Some(addr));
    }
}
