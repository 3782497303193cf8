//! Role Gate
//!
//! Role and ownership checks over the identity carried by a verified session
//! token. Nothing here performs I/O: business operations load what they need,
//! check existence, then ask the gate.

mod gate;

pub use gate::{AuthUser, RoleMismatch};
