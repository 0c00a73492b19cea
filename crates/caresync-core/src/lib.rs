//! caresync-core - Offline outbox for consultation bookings
//!
//! This crate holds the durable mutation queue, the batch sync protocol
//! against `POST /api/sync/consultations`, and the booking fallback used by
//! caresync front ends (currently the CLI).

pub mod auth;
pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod outbox;
pub mod queue;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{ClientId, ConsultationDraft, NewMutation, QueuedMutation, SyncResult, SyncStatus};
pub use outbox::{EnqueueOutcome, Outbox};
pub use queue::OfflineQueue;
pub use state::OutboxIndicator;
pub use sync::{SyncCoordinator, SyncOutcome, SyncReport};
