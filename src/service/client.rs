//! Client request/response driver.
//!
//! Synchronous in shape: send one request, then wait for the reply with a
//! deadline. One outstanding request at a time, no automatic retry — an
//! elapsed deadline surfaces as [`ProtocolError::Timeout`], distinct from a
//! transport-level I/O failure, so the front end can tell "no response
//! within N seconds" apart from a broken socket.

use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::udp::UdpFramed;

use crate::core::codec::MessageCodec;
use crate::core::message::Message;
use crate::error::{ProtocolError, Result};

pub struct ClientDriver {
    framed: UdpFramed<MessageCodec>,
    server: SocketAddr,
}

impl ClientDriver {
    /// Bind an ephemeral local socket aimed at `server`.
    pub async fn connect(server: SocketAddr) -> Result<Self> {
        let bind_addr: SocketAddr = if server.is_ipv4() {
            "0.0.0.0:0".parse().map_err(|_| {
                ProtocolError::ConfigError("invalid wildcard bind address".to_string())
            })?
        } else {
            "[::]:0".parse().map_err(|_| {
                ProtocolError::ConfigError("invalid wildcard bind address".to_string())
            })?
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        Ok(Self {
            framed: UdpFramed::new(socket, MessageCodec),
            server,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Transmit one encoded message to the server.
    pub async fn send(&mut self, msg: Message) -> Result<()> {
        self.framed.send((msg, self.server)).await
    }

    /// Wait for the next reply, up to `timeout`.
    pub async fn receive(&mut self, timeout: Duration) -> Result<Message> {
        match tokio::time::timeout(timeout, self.framed.next()).await {
            Err(_) => Err(ProtocolError::Timeout),
            Ok(None) => Err(ProtocolError::Io(std::io::Error::other(
                "socket closed while waiting for reply",
            ))),
            Ok(Some(Ok((msg, _addr)))) => Ok(msg),
            Ok(Some(Err(e))) => Err(e),
        }
    }

    /// Send a request and wait for its reply.
    pub async fn request(&mut self, msg: Message, timeout: Duration) -> Result<Message> {
        self.send(msg).await?;
        self.receive(timeout).await
    }
}
