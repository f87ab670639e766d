//! Resources owned by other controllers that we only read and touch.
//!
//! ExternalSecrets are handled as schema-less [`kube::api::DynamicObject`]s so
//! that any field we do not understand survives a read-modify-replace cycle.

pub mod externalsecrets;

pub use externalsecrets::*;
