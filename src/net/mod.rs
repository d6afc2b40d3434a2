//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! listener config
//!     → listener.rs (bind, report local address)
//!     → accept stream handed to the gRPC server (ext_proc::server)
//!     → HTTP/2 connections from the proxy, one or more Process streams each
//! ```

pub mod listener;

pub use listener::{Listener, ListenerError};
