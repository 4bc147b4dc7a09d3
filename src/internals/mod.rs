//! Low-level helpers shared between the [`crate::scanner`] and
//! [`crate::value`] layers. Kept as a private module, mirroring the
//! teacher's own `internals` layout (which hid its `nom`-macro plumbing
//! behind the crate's public `types`/root surface).

pub mod escape;
pub mod numeric;
