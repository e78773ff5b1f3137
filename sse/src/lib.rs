//! In-process event broker for real-time updates.
//!
//! This crate is the fan-out half of the helpdesk real-time subsystem: a
//! process-wide registry of delivery callbacks keyed by connection id, with a
//! single `broadcast` entry point producers call after their own work
//! completes.
//!
//! # Design
//!
//! - **Policy-free**: the broker knows nothing about roles or targeting. The
//!   transport layer builds each connection's delivery callback, which closes
//!   over the recipient identity and applies the visibility predicate from
//!   the `events` crate before writing a frame.
//! - **At-most-once, no buffering**: broadcasting with zero registered
//!   callbacks drops the event silently. Nothing is queued or persisted; a
//!   recipient that is offline simply misses the event.
//! - **Partial-failure isolation**: a callback returning an error is logged
//!   and skipped; delivery to the remaining callbacks continues.
//! - **Single instance per process**: construct one `Broker` at startup and
//!   thread it through application state. Every process owns an independent
//!   registry, so multi-instance deployments need an external fan-out
//!   backplane this crate does not provide.
//!
//! # Lifecycle
//!
//! `register` returns an [`Unregister`] guard. Calling it twice is a no-op,
//! and dropping it unregisters as well, so a connection can never outlive its
//! registration even when the transport stream is dropped abruptly.

pub mod broker;
pub mod connection;

pub use broker::Broker;
pub use connection::{ConnectionId, DeliveryCallback, DeliveryError, Unregister};
