//! Payload framing subsystem.
//!
//! # Data Flow
//! ```text
//! Captured HTTP message
//!     → id.rs (correlation ID + capture timestamp)
//!     → codec.rs (header line synthesized in front of the raw bytes)
//!     → Emitter → sinks
//!
//! Stream of concatenated payloads
//!     → codec.rs split_payloads (cut on PAYLOAD_SEPARATOR)
//!     → codec.rs decode_meta / payload_body (zero-copy views)
//! ```
//!
//! # Design Decisions
//! - The body is never touched; only the header line is built or parsed
//! - Malformed headers decode to `None`, never an error
//! - The correlation ID is the only join key between a request and its responses

pub mod codec;
pub mod id;

pub use codec::{
    decode_meta, encode_header, encode_payload, frame_payloads, is_request_payload, meta_tokens,
    payload_body, split_payloads, PayloadKind, PayloadMeta, PAYLOAD_SEPARATOR,
};
pub use id::{new_request_id, now_nanos};
