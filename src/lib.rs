use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not obtain cluster credentials; in-cluster: {in_cluster}; kubeconfig: {kubeconfig}")]
    CredentialError {
        in_cluster: kube::config::InClusterError,
        kubeconfig: kube::config::KubeconfigError,
    },

    #[error("Failed to create Kubernetes client: {0}")]
    ClientError(#[source] kube::Error),

    #[error("Failed to list ExternalSecrets in namespace {namespace}: {source}")]
    ListError {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to {stage} ExternalSecret {name}: {source}")]
    PatchError {
        name: String,
        stage: PatchStage,
        #[source]
        source: kube::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::CredentialError { .. } => "CredentialError",
            Error::ClientError(_) => "CredentialError",
            Error::ListError { .. } => "ListError",
            Error::PatchError { .. } => "PatchError",
        }
    }
}

/// Which call of the annotation patch protocol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStage {
    Update,
    Refetch,
}

impl fmt::Display for PatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchStage::Update => f.write_str("update"),
            PatchStage::Refetch => f.write_str("re-fetch"),
        }
    }
}

/// Startup configuration
pub mod config;

pub mod controller;
pub use controller::{Diagnostics, Outcome, Reconciler, State};

/// Log and trace integrations
pub mod telemetry;

/// Metrics
mod metrics;
pub use metrics::Metrics;

pub mod reconcilers;

/// External CRDs
pub mod resources;

pub mod webhook;

#[cfg(test)]
pub(crate) mod fixtures;
