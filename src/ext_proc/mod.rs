//! External processing protocol subsystem.
//!
//! # Data Flow
//! ```text
//! proxy ── Process(stream ProcessingRequest) ──▶ server.rs (tonic, tracing layer)
//!     → service.rs (one task per stream, tracker guard, span)
//!     → handler.rs loop:
//!           recv → event.rs (wire oneof → ProcessingEvent)
//!                → dispatch by phase (classify::Classifier on non-empty bodies)
//!                → event.rs (ProcessingInstruction → wire oneof)
//!           send ──▶ proxy
//! ```
//!
//! # Design Decisions
//! - Strict alternation: one instruction per event, sent before the next read
//! - Every instruction is CONTINUE; classification problems never block traffic
//! - No state crosses events except the open stream itself

pub mod event;
pub mod handler;
pub mod proto;
pub mod server;
pub mod service;
pub mod tracker;

pub use event::{HeaderMutation, InstructionStatus, Phase, ProcessingEvent, ProcessingInstruction};
pub use handler::{StreamError, StreamHandler};
pub use server::{ProcessorServer, ServerError};
pub use service::ExtProcService;
pub use tracker::{StreamId, StreamTracker};
