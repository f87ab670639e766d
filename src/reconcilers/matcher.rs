use kube::api::DynamicObject;
use kube::ResourceExt;
use tracing::{debug, trace, warn};

use crate::resources::{remote_ref_keys, ExternalSecretApi, MalformedResource};
use crate::{Error, Result};

/// Result of scanning a namespace for the first ExternalSecret referencing a key
#[derive(Debug)]
pub struct Scan {
    /// The first matching ExternalSecret, if any
    pub matched: Option<DynamicObject>,
    /// How many resources were inspected, the match included
    pub scanned: usize,
    /// How many resources the namespace holds
    pub total: usize,
}

/// Whether any `spec.data[].remoteRef.key` of `es` equals `item_key`.
///
/// Stops at the first matching entry. Malformed entries are logged and skipped.
pub fn references_key(es: &DynamicObject, item_key: &str) -> Result<bool, MalformedResource> {
    let name = es.name_any();
    for key in remote_ref_keys(es)? {
        match key {
            Ok(key) if key == item_key => return Ok(true),
            Ok(key) => trace!("Found key in ExternalSecret {name}: {key}"),
            Err(err) => warn!("Skipping entry of ExternalSecret {name}: {err}"),
        }
    }
    Ok(false)
}

/// Pairs each resource, in order, with whether it references `item_key`.
///
/// Evaluation is lazy: resources are only inspected as the iterator is advanced.
/// Resources whose `spec.data` is unusable count as not matching.
pub fn find_matches<'a>(
    resources: &'a [DynamicObject],
    item_key: &'a str,
) -> impl Iterator<Item = (&'a DynamicObject, bool)> + 'a {
    resources.iter().map(move |es| {
        debug!("Processing ExternalSecret {}", es.name_any());
        let matched = match references_key(es, item_key) {
            Ok(matched) => matched,
            Err(err) => {
                warn!("Skipping ExternalSecret {}: {err}", es.name_any());
                false
            }
        };
        (es, matched)
    })
}

/// List ExternalSecrets in `namespace` and return the first one referencing `item_key`.
pub async fn find_first_match(
    api: &dyn ExternalSecretApi,
    namespace: &str,
    item_key: &str,
) -> Result<Scan> {
    let resources = api
        .list(namespace)
        .await
        .map_err(|source| Error::ListError {
            namespace: namespace.into(),
            source,
        })?;
    debug!(
        "Found {} ExternalSecrets in namespace {namespace}",
        resources.len()
    );

    let mut scanned = 0;
    let matched = find_matches(&resources, item_key).find_map(|(es, matched)| {
        scanned += 1;
        if !matched {
            debug!("Desired key '{item_key}' not found in ExternalSecret {}", es.name_any());
        }
        matched.then(|| es.clone())
    });

    Ok(Scan {
        matched,
        scanned,
        total: resources.len(),
    })
}
