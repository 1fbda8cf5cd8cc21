//! # Service Layer
//!
//! The networked halves of the protocol: the server's event loop with
//! bounded worker offload, and the client's send-then-receive driver.

pub mod client;
pub mod server;

pub use client::ClientDriver;
pub use server::UdpServer;
