//! Channel fabric standing in for the platform's message transport.
//!
//! Contexts share no memory; everything crosses these seams as serialized
//! JSON. The fabric preserves the platform's failure mode: a message sent
//! to a torn-down context is dropped, never duplicated or reordered
//! within a single request/response pair.

pub mod page;
pub mod runtime;

pub use page::{PageBus, PageMessage, PageSubscription};
pub use runtime::{runtime_channel, PortError, RuntimePort, RuntimeRequest, RuntimeService};
