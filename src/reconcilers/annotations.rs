use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use kube::api::DynamicObject;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::resources::ExternalSecretApi;
use crate::{Error, Metrics, PatchStage, Result};

pub const UPDATED_BY_ANNOTATION: &str = "updated-by";
pub const UPDATED_AT_ANNOTATION: &str = "updated-at";
pub const UPDATED_BY: &str = "externalsecret-updater";

pub const DEFAULT_CACHE_BUSTER_WAIT_INTERVAL: Duration = Duration::from_secs(2);

/// Whether to follow the first annotation update with a second one.
///
/// Some watchers only notice an ExternalSecret changing when they see two
/// distinct updates, so the second write is issued after `wait_interval`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheBuster {
    pub enabled: bool,
    pub wait_interval: Duration,
}

impl Default for CacheBuster {
    fn default() -> Self {
        Self {
            enabled: false,
            wait_interval: DEFAULT_CACHE_BUSTER_WAIT_INTERVAL,
        }
    }
}

impl CacheBuster {
    pub fn enabled(wait_interval: Duration) -> Self {
        Self {
            enabled: true,
            wait_interval,
        }
    }
}

/// What was written to a patched ExternalSecret
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchReport {
    pub name: String,
    /// `updated-at` value of every update issued, in order
    pub updated_at: Vec<String>,
}

impl PatchReport {
    pub fn updates(&self) -> usize {
        self.updated_at.len()
    }
}

/// Overwrite the `updated-by` and `updated-at` annotations, keeping all others.
pub fn stamp(es: &mut DynamicObject, now: DateTime<Utc>) -> String {
    let updated_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let annotations = es.annotations_mut();
    annotations.insert(UPDATED_BY_ANNOTATION.into(), UPDATED_BY.into());
    annotations.insert(UPDATED_AT_ANNOTATION.into(), updated_at.clone());
    updated_at
}

/// Touch `es` so that the external-secrets controller re-syncs it.
///
/// The first update is always issued against the object as listed. With the
/// cache buster enabled the object is re-fetched after the wait so the second
/// update carries the resourceVersion produced by the first. Nothing is
/// rolled back if the second update fails, and every accepted write is
/// counted in `metrics` as it lands.
pub async fn patch_external_secret(
    api: &dyn ExternalSecretApi,
    mut es: DynamicObject,
    namespace: &str,
    cache_buster: &CacheBuster,
    metrics: &Metrics,
) -> Result<PatchReport> {
    let name = es.name_any();
    let mut updated_at = vec![update(api, &mut es, namespace, metrics).await?];

    if !cache_buster.enabled {
        debug!("Cache buster is disabled");
        return Ok(PatchReport { name, updated_at });
    }

    info!(
        "Cache buster enabled; waiting {} before second update of ExternalSecret {name}",
        humantime::format_duration(cache_buster.wait_interval)
    );
    tokio::time::sleep(cache_buster.wait_interval).await;

    let mut latest = api
        .get(namespace, &name)
        .await
        .map_err(|source| Error::PatchError {
            name: name.clone(),
            stage: PatchStage::Refetch,
            source,
        })?;

    info!("Performing second update on ExternalSecret {name} to bust cache");
    updated_at.push(update(api, &mut latest, namespace, metrics).await?);

    Ok(PatchReport { name, updated_at })
}

async fn update(
    api: &dyn ExternalSecretApi,
    es: &mut DynamicObject,
    namespace: &str,
    metrics: &Metrics,
) -> Result<String> {
    let name = es.name_any();
    let updated_at = stamp(es, Utc::now());
    debug!("Updating ExternalSecret {name} in namespace {namespace}");
    api.replace(namespace, es)
        .await
        .map_err(|source| Error::PatchError {
            name,
            stage: PatchStage::Update,
            source,
        })?;
    metrics.updates.inc();
    Ok(updated_at)
}
