pub mod annotations;
pub mod client;
pub mod matcher;
pub mod namespace;

pub use annotations::{patch_external_secret, CacheBuster, PatchReport};
pub use client::{ClientResolver, KubeClientResolver};
pub use matcher::{find_first_match, Scan};
pub use namespace::NamespaceResolver;
