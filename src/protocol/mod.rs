//! # Protocol Components
//!
//! The command-dispatch pipeline: registry and dispatcher, authentication
//! gate, recursion-guarded script expansion, the command set, and the
//! request pipeline tying them together.

pub mod auth;
pub mod commands;
pub mod dispatcher;
pub mod instruction;
pub mod pipeline;
pub mod script;
