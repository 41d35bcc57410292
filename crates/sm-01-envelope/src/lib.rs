//! # Envelope Subsystem (sm-01)
//!
//! The wire envelope and its stateless codec. One envelope per UDP
//! datagram; the codec authenticates, version-gates, and epoch-gates every
//! inbound datagram before anything else sees it.
//!
//! ## Wire Form
//!
//! ```text
//! [ canonical JSON of Envelope ][ 32-byte MAC over those exact bytes ]
//! ```
//!
//! The JSON encoding is canonical: struct fields serialize in declaration
//! order and all maps are sorted, so two semantically identical envelopes
//! produce the same signed bytes on every node.

pub mod codec;
pub mod envelope;
pub mod error;

pub use codec::{decode, encode, CodecPolicy};
pub use envelope::{Envelope, EnvelopeFlags, MessageType, WirePayload, PROTOCOL_VERSION};
pub use error::{DecodeError, EncodeError};
