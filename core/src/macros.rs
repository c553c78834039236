//! Small helper macros shared across the crate.

/// Returns early with `Err($err.into())` unless `$cond` holds.
///
/// Mirrors the `ensure!` macro `failure`-based crates traditionally
/// ship with, kept local since `failure` itself no longer exports one.
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

pub(crate) use ensure;
