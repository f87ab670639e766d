use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Where Kubernetes mounts the pod's namespace
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

pub const FALLBACK_NAMESPACE: &str = "default";

#[derive(Clone, Debug)]
pub struct NamespaceResolver {
    path: PathBuf,
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self::new(SERVICE_ACCOUNT_NAMESPACE_PATH)
    }
}

impl NamespaceResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The namespace we run in, or [`FALLBACK_NAMESPACE`] when it can't be read.
    pub async fn resolve(&self) -> String {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if !contents.trim().is_empty() => {
                let namespace = contents.trim().to_owned();
                debug!("Operating in namespace {namespace}");
                namespace
            }
            Ok(_) => {
                warn!(
                    "Namespace file {} is empty, falling back to {FALLBACK_NAMESPACE}",
                    self.path.display()
                );
                FALLBACK_NAMESPACE.into()
            }
            Err(err) => {
                warn!(
                    "Failed to get namespace from {}: {err}; falling back to {FALLBACK_NAMESPACE}",
                    self.path.display()
                );
                FALLBACK_NAMESPACE.into()
            }
        }
    }
}
