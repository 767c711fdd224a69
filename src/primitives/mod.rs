//! Low-level primitives underneath the index.

/// Positioned file I/O.
///
/// The tree reads and writes whole node blocks at absolute byte offsets
/// through this interface.
pub mod io;
