//! Store implementations behind the `crate::repos` traits.

pub mod memory;
pub mod redis_store;
