//! Core data models for the rename-copy run.
//!
//! An [`object_ref::ObjectRef`] names a stored object; a
//! [`rename_rule::RenameRule`] turns a source key into its destination key.

pub mod object_ref;
pub mod rename_rule;
