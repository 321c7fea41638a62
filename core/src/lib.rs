//! Sales Desk — the dealership sales-funnel engine.
//!
//! Tracks clients from first contact through financing attempts
//! ("records"), appointments, co-signers and the commission latch.
//! Everything persists to SQLite; every state change lands in the
//! event log. The transport layer (HTTP, CLI) sits outside this crate
//! and talks to [`desk::Desk`].

pub mod appointment_scheduler;
pub mod client_directory;
pub mod comment;
pub mod cosigner_graph;
pub mod desk;
pub mod error;
pub mod event;
pub mod notify;
pub mod opportunity;
pub mod record_lifecycle;
pub mod store;
pub mod types;

pub use desk::Desk;
pub use error::{DeskError, DeskResult};
