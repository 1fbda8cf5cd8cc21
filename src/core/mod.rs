//! # Core Protocol Components
//!
//! The wire message and its datagram codec.
//!
//! This module provides the foundation for the protocol: the message value
//! exchanged between client and server and the JSON-per-datagram encoding.
//!
//! ## Components
//! - **Message**: optional-field wire value with presence semantics
//! - **Codec**: encode/decode plus a tokio codec for `UdpFramed`
//!
//! ## Wire Format
//! ```text
//! one UTF-8 JSON object per UDP datagram, at most 65,507 bytes
//! ```

pub mod codec;
pub mod message;
