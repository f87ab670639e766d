use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Client, Config};
use tracing::debug;

use crate::resources::ExternalSecretApi;
use crate::{Error, Result};

/// Produces a handle to the cluster for a single reconciliation
#[async_trait]
pub trait ClientResolver: Send + Sync {
    async fn resolve(&self) -> Result<Arc<dyn ExternalSecretApi>>;
}

/// Resolves a kube [`Client`], preferring in-cluster credentials and falling
/// back to a kubeconfig for local development.
#[derive(Clone, Debug, Default)]
pub struct KubeClientResolver {
    /// Explicit kubeconfig; when unset `KUBECONFIG` and `~/.kube/config` are tried
    kubeconfig: Option<PathBuf>,
}

impl KubeClientResolver {
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self { kubeconfig }
    }

    pub async fn config(&self) -> Result<Config> {
        match Config::incluster() {
            Ok(config) => {
                debug!("Using in-cluster configuration");
                Ok(config)
            }
            Err(in_cluster) => {
                debug!("In-cluster configuration unavailable ({in_cluster}), trying kubeconfig");
                load_kubeconfig(self.kubeconfig.as_deref())
                    .await
                    .map_err(|kubeconfig| Error::CredentialError {
                        in_cluster,
                        kubeconfig,
                    })
            }
        }
    }
}

#[async_trait]
impl ClientResolver for KubeClientResolver {
    async fn resolve(&self) -> Result<Arc<dyn ExternalSecretApi>> {
        let config = self.config().await?;
        let client = Client::try_from(config).map_err(Error::ClientError)?;
        Ok(Arc::new(client))
    }
}

pub(crate) async fn load_kubeconfig(path: Option<&Path>) -> Result<Config, KubeconfigError> {
    let options = KubeConfigOptions::default();
    match path {
        Some(path) => {
            debug!("Loading kubeconfig from {}", path.display());
            Config::from_custom_kubeconfig(Kubeconfig::read_from(path)?, &options).await
        }
        None => Config::from_kubeconfig(&options).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: local
  cluster:
    server: https://127.0.0.1:6443
    insecure-skip-tls-verify: true
contexts:
- name: local
  context:
    cluster: local
    user: local
    namespace: apps
current-context: local
users:
- name: local
  user:
    token: not-a-real-token
"#;

    #[tokio::test]
    async fn explicit_kubeconfig_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();

        let config = load_kubeconfig(Some(file.path())).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert_eq!(config.default_namespace, "apps");
    }

    #[tokio::test]
    async fn missing_kubeconfig_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(load_kubeconfig(Some(&missing)).await.is_err());
    }

    #[tokio::test]
    async fn no_credentials_anywhere_is_a_credential_error() {
        // outside a pod the service host is unset; make sure of it
        std::env::remove_var("KUBERNETES_SERVICE_HOST");
        std::env::remove_var("KUBERNETES_SERVICE_PORT");
        let dir = tempfile::tempdir().unwrap();

        let err = KubeClientResolver::new(Some(dir.path().join("nope")))
            .resolve()
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::CredentialError {
                in_cluster: kube::config::InClusterError::ReadEnvironmentVariable(_),
                kubeconfig: KubeconfigError::ReadConfig(..),
            }
        ));
        assert_eq!(err.metric_label(), "CredentialError");
    }

    #[tokio::test]
    async fn garbage_kubeconfig_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"clusters: [this is not: a kubeconfig").unwrap();
        assert!(load_kubeconfig(Some(file.path())).await.is_err());
    }
}
