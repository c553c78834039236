//! The five per-packet transformation engines.
//!
//! Each engine owns an immutable header template built once at
//! registration (`cache_hdr` in the original plugin) and a
//! `NodeCounters` instance; per-call state never persists across
//! invocations (`spec.md` §5).

mod decap_common;
pub mod gso;
pub mod gtp4e;
pub mod gtp6d;
pub mod gtp6d_di;
pub mod gtp6e;

pub use gso::GsoEngine;
pub use gtp4e::Gtp4Engine;
pub use gtp6d::Gtp6DecapEngine;
pub use gtp6d_di::Gtp6DropInEngine;
pub use gtp6e::Gtp6Engine;
