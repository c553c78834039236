//! Packet-processing core bridging SRv6 (IPv6 + SRH) and GTP-U
//! encapsulation for mobile backhaul, plus a TCP GSO segmentation
//! engine.
//!
//! The four `End.M.GTP*` engines and the GSO engine are the
//! stateless-per-packet transformation nodes; everything else in this
//! crate (buffer windows, header layouts, the local-SID/policy
//! tables) is the supporting data model described in the engines'
//! design notes.

mod macros;

pub mod batch;
pub mod bits;
pub mod buffer;
pub mod checksum;
pub mod control;
pub mod engine;
pub mod hash;
pub mod headers;

pub use buffer::{Buffer, SizeOf};

use std::result;

/// A type alias of `std::result::Result` for convenience, matching
/// the rest of the crate's error handling.
pub type Result<T> = result::Result<T, failure::Error>;
