//! Reconnecting consumer for the helpdesk event stream.
//!
//! A [`Connector`] owns one logical stream to the server's SSE endpoint and
//! keeps it alive across network interruptions with linear backoff. Callers
//! subscribe to typed events (or everything) without touching transport
//! details.
//!
//! # Lifecycle
//!
//! `Idle → Connecting → Open → (Reconnecting → Connecting)* → Closed`
//!
//! `Closed` is terminal. It is reached either through [`Connector::close`] or
//! by exhausting the maximum reconnect attempts, after which no further
//! automatic recovery happens: the caller has to build a fresh connector.
//!
//! # Delivery
//!
//! Events are dispatched first to wildcard subscribers, then to subscribers
//! of the specific type. The `connected` control frame only updates the
//! locally-held connection id and never reaches subscribers. Malformed frames
//! are logged and dropped without disturbing the stream.

mod connector;
mod subscription;
mod transport;

pub use connector::{ConnectionState, Connector, Options};
pub use subscription::{Subscription, Topic};
pub use transport::{EventSourceTransport, RawFrame, Transport, TransportError};
