//! # Error Types
//!
//! Error handling for the vehicle protocol.
//!
//! This module defines all error variants that can occur while serving or
//! issuing requests, from low-level I/O failures to dispatch-level outcomes
//! such as unknown commands or script recursion.
//!
//! Dispatch failures (`NotACommand`, `EmptyCommand`, `AuthRequired`,
//! `BadCredentials`, `UnknownCommand`, `RecursionDetected`) are expected,
//! routine outcomes: the request pipeline recovers every one of them into an
//! ERROR-typed wire message, and nothing here crashes the event loop.

use std::io;
use thiserror::Error;

use crate::store::StoreError;

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Datagram too large: {0} bytes")]
    OversizedDatagram(usize),

    #[error("Server request should be a command: {0}")]
    NotACommand(String),

    #[error("Command is empty")]
    EmptyCommand,

    #[error("This command requires authentication")]
    AuthRequired,

    #[error("Login or password is incorrect!")]
    BadCredentials,

    #[error("Unknown command at {line}: {text}")]
    UnknownCommand { line: usize, text: String },

    #[error("Recursion not allowed. Call stack: {0}")]
    RecursionDetected(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
