//! Domain layer: pure auth types and helpers with no I/O.

pub mod customer_id;
pub mod email;
pub mod one_time_code;
pub mod password_policy;
pub mod role;

pub use customer_id::CustomerId;
pub use role::{Permission, Role, RolePermissions};
