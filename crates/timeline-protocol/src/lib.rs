//! Wire types shared by the hub and its clients.
//!
//! Every inbound text frame is expected to be a JSON [`envelope::MutationEnvelope`];
//! the hub relays frames verbatim, so there is no server-side outbound encoding.

pub mod envelope;

pub use envelope::{MutationEnvelope, MutationType, TimelineEntry};
