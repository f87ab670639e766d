use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kube::ResourceExt;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::*;

use crate::reconcilers::{
    find_first_match, patch_external_secret, CacheBuster, ClientResolver, NamespaceResolver,
};
use crate::{Metrics, Result};

/// How a reconciliation ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Patched {
        name: String,
        namespace: String,
        updates: usize,
    },
    NoMatch {
        namespace: String,
        scanned: usize,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Patched {
                name,
                namespace,
                updates,
            } => write!(
                f,
                "Successfully updated ExternalSecret {name} in namespace {namespace} ({updates} update(s))"
            ),
            Outcome::NoMatch { namespace, scanned } => write!(
                f,
                "No ExternalSecret in namespace {namespace} references the item ({scanned} scanned)"
            ),
        }
    }
}

/// Touches the ExternalSecret referencing a changed item.
///
/// Cheap to clone; every clone shares metrics and diagnostics but nothing else,
/// so concurrent reconciliations don't coordinate.
#[derive(Clone)]
pub struct Reconciler {
    resolver: Arc<dyn ClientResolver>,
    namespace: NamespaceResolver,
    cache_buster: CacheBuster,
    metrics: Metrics,
    diagnostics: Arc<RwLock<Diagnostics>>,
}

impl Reconciler {
    /// Resolve a client and namespace, then patch the first ExternalSecret referencing `item_name`.
    pub async fn reconcile(&self, item_name: &str) -> Result<Outcome> {
        let api = self.resolver.resolve().await?;
        let namespace = self.namespace.resolve().await;

        let scan = find_first_match(api.as_ref(), &namespace, item_name).await?;
        let Some(es) = scan.matched else {
            return Ok(Outcome::NoMatch {
                namespace,
                scanned: scan.scanned,
            });
        };

        info!("Desired key found in ExternalSecret {}", es.name_any());
        let report = patch_external_secret(
            api.as_ref(),
            es,
            &namespace,
            &self.cache_buster,
            &self.metrics,
        )
        .await?;

        Ok(Outcome::Patched {
            name: report.name.clone(),
            namespace,
            updates: report.updates(),
        })
    }

    /// Reconcile, logging the outcome. Failures are recorded and swallowed.
    #[instrument(skip(self))]
    pub async fn run(&self, item_name: &str) {
        let _timer = self.metrics.count_and_measure();
        let result = self.reconcile(item_name).await;

        let mut diagnostics = self.diagnostics.write().await;
        diagnostics.last_event = Utc::now();
        diagnostics.last_item = Some(item_name.to_owned());
        match result {
            Ok(outcome) => {
                info!("{outcome}");
                diagnostics.last_outcome = Some(outcome.to_string());
            }
            Err(err) => {
                error!("Error patching ExternalSecret: {err}");
                self.metrics.reconcile_failure(&err);
                diagnostics.last_outcome = Some(err.to_string());
            }
        }
    }
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    pub last_item: Option<String>,
    pub last_outcome: Option<String>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            last_item: None,
            last_outcome: None,
        }
    }
}

/// State shared between the reconciler and the web server
#[derive(Clone, Default)]
pub struct State {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
    /// Metrics registry
    registry: prometheus::Registry,
}

/// State wrapper around the reconciler outputs for the web server
impl State {
    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    /// Create a Reconciler that reports into this State
    pub fn to_reconciler(
        &self,
        resolver: Arc<dyn ClientResolver>,
        namespace: NamespaceResolver,
        cache_buster: CacheBuster,
    ) -> Result<Reconciler, prometheus::Error> {
        Ok(Reconciler {
            resolver,
            namespace,
            cache_buster,
            metrics: Metrics::default().register(&self.registry)?,
            diagnostics: self.diagnostics.clone(),
        })
    }
}
