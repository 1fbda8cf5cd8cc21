//! Per-request dispatch pipeline.
//!
//! Turns one decoded COMMAND message into one RESPONSE or ERROR message:
//! type check, instruction assembly, auth-gated dispatch, and failure
//! recovery. Every failure — malformed requests, missing auth, unknown
//! commands, script recursion, store errors — is folded into an ERROR-typed
//! reply carrying the peer address captured at read time; nothing escapes
//! to the event loop.

use std::sync::Arc;
use tracing::{info, warn};

use crate::core::message::{Message, MessageType};
use crate::error::{ProtocolError, Result};
use crate::protocol::auth::AuthGate;
use crate::protocol::dispatcher::{DispatchContext, Dispatcher, Registry};
use crate::store::VehicleStore;

pub struct RequestPipeline {
    dispatcher: Dispatcher,
}

impl RequestPipeline {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn VehicleStore>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry, AuthGate::new(store)),
        }
    }

    /// Process one request, always producing a reply addressed to the
    /// request's origin.
    pub fn handle(&self, request: Message) -> Message {
        let origin = request.address();

        match self.process(&request) {
            Ok(output) if output.starts_with('!') => {
                warn!(peer = ?origin, output, "execution resulted in an error line");
                Message::builder(MessageType::Error)
                    .message(output)
                    .maybe_address(origin)
                    .build()
            }
            Ok(output) => Message::builder(MessageType::Response)
                .message(output)
                .maybe_address(origin)
                .build(),
            Err(e) => {
                warn!(peer = ?origin, error = %e, "request failed");
                Message::builder(MessageType::Error)
                    .message(e.to_string())
                    .maybe_address(origin)
                    .build()
            }
        }
    }

    fn process(&self, request: &Message) -> Result<String> {
        if request.kind() != MessageType::Command {
            let rendered = serde_json::to_string(request).unwrap_or_else(|_| "<unprintable>".into());
            return Err(ProtocolError::NotACommand(rendered));
        }

        let command = request.command().unwrap_or_default();
        if command.is_empty() {
            return Err(ProtocolError::EmptyCommand);
        }

        let mut ctx = DispatchContext::new();
        if let (Some(login), Some(password)) = (request.login(), request.password()) {
            ctx = ctx.with_credentials(login, password);
        }

        let mut instruction = command.to_string();
        if let Some(args) = request.args() {
            if !args.is_empty() {
                instruction.push(' ');
                instruction.push_str(&args.join(" "));
            }
        }

        info!(command, "dispatching request");
        ctx.enqueue(&instruction);

        let output = self.dispatcher.drain_and_run(&mut ctx)?;
        Ok(output.trim_end().to_string())
    }
}
