//! Request context: turning HTTP parameters into target identities.

pub mod target;

pub use target::{discovery_target, forward_target, is_valid_vm_name};
