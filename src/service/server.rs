//! UDP event loop and worker offload.
//!
//! One task owns the socket receive path: it reads a datagram, captures the
//! sender's address, and hands decode → auth → dispatch → encode to the
//! blocking pool, bounded by a worker semaphore. When every worker slot is
//! taken the receive loop stops pulling datagrams and the kernel socket
//! buffer sheds the overload — the bound is explicit configuration rather
//! than an accident of pool sizing. Workers send their own replies, so a
//! completion never has to wake or block the receive loop.
//!
//! Requests from different peers complete independently and possibly out of
//! order; once a datagram is handed to a worker it runs to completion.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, instrument, warn};

use crate::core::codec::{self, MAX_DATAGRAM_SIZE};
use crate::core::message::{Message, MessageType};
use crate::error::{ProtocolError, Result};
use crate::protocol::pipeline::RequestPipeline;

/// Single-socket datagram command server.
pub struct UdpServer {
    socket: Arc<UdpSocket>,
    pipeline: Arc<RequestPipeline>,
    workers: Arc<Semaphore>,
}

impl UdpServer {
    /// Bind the server socket. A bind failure surfaces as `Io` so callers
    /// can distinguish it from later receive-path failures.
    pub async fn bind(
        addr: SocketAddr,
        pipeline: Arc<RequestPipeline>,
        worker_pool_size: usize,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!(address = %socket.local_addr()?, "server listening");

        Ok(Self {
            socket: Arc::new(socket),
            pipeline,
            workers: Arc::new(Semaphore::new(worker_pool_size.max(1))),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive loop: runs until the socket fails fatally.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let (len, peer) = self.socket.recv_from(&mut buf).await?;
            debug!(bytes = len, %peer, "received datagram");
            self.offload(buf[..len].to_vec(), peer).await?;
        }
    }

    /// Receive loop with graceful shutdown: returns when `shutdown_rx`
    /// fires, after in-flight workers have been given their turn.
    pub async fn run_with_shutdown(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received, stopping receive loop");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = received?;
                    debug!(bytes = len, %peer, "received datagram");
                    self.offload(buf[..len].to_vec(), peer).await?;
                }
            }
        }
    }

    /// Hand one datagram to the worker pool. Awaits a free worker slot,
    /// which is what bounds concurrent dispatch.
    async fn offload(&self, datagram: Vec<u8>, peer: SocketAddr) -> Result<()> {
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProtocolError::Io(std::io::Error::other("worker pool closed")))?;

        let socket = Arc::clone(&self.socket);
        let pipeline = Arc::clone(&self.pipeline);

        tokio::spawn(async move {
            let _permit = permit;

            // Decode and dispatch may block on the store; keep them off the
            // receive loop's thread.
            let response = tokio::task::spawn_blocking(move || {
                match codec::decode(&datagram, Some(peer)) {
                    Ok(request) => pipeline.handle(request),
                    Err(e) => {
                        warn!(%peer, error = %e, "failed to decode request");
                        Message::builder(MessageType::Error)
                            .message(e.to_string())
                            .address(peer)
                            .build()
                    }
                }
            })
            .await;

            match response {
                Ok(reply) => send_reply(&socket, reply).await,
                Err(e) => error!(%peer, error = %e, "dispatch task panicked"),
            }
        });

        Ok(())
    }
}

/// Encode and transmit one reply to the address it carries. A reply with no
/// address is logged and skipped — UDP has no connection to fail.
async fn send_reply(socket: &UdpSocket, reply: Message) {
    let Some(addr) = reply.address() else {
        warn!(?reply, "reply with no address, skipping transmission");
        return;
    };

    let bytes = match codec::encode(&reply) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(%addr, error = %e, "reply does not fit a datagram, sending error instead");
            let fallback = Message::builder(MessageType::Error)
                .message(e.to_string())
                .address(addr)
                .build();
            match codec::encode(&fallback) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(%addr, error = %e, "failed to encode fallback error");
                    return;
                }
            }
        }
    };

    debug!(%addr, bytes = bytes.len(), "sending reply");
    if let Err(e) = socket.send_to(&bytes, addr).await {
        error!(%addr, error = %e, "failed to send reply");
    }
}
