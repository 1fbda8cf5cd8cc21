//! # Utility Modules
//!
//! Supporting utilities shared by the server and client binaries.

pub mod logging;
