//! `paperstock-auth`: pure storage-membership authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers look
//! up the membership and hand it in.

pub mod authorize;
pub mod membership;

pub use authorize::{Access, AuthzError, authorize};
pub use membership::StorageMembership;
