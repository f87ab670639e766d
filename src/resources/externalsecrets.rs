use async_trait::async_trait;
use kube::{
    api::{Api, ApiResource, DynamicObject, ListParams, PostParams},
    core::GroupVersionKind,
    Client, ResourceExt,
};
use serde_json::Value;

pub const EXTERNAL_SECRET_GROUP: &str = "external-secrets.io";
pub const EXTERNAL_SECRET_VERSION: &str = "v1beta1";
pub const EXTERNAL_SECRET_KIND: &str = "ExternalSecret";
pub const EXTERNAL_SECRET_PLURAL: &str = "externalsecrets";

/// The dynamic api resource for `external-secrets.io/v1beta1` ExternalSecrets
pub fn external_secret_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(
            EXTERNAL_SECRET_GROUP,
            EXTERNAL_SECRET_VERSION,
            EXTERNAL_SECRET_KIND,
        ),
        EXTERNAL_SECRET_PLURAL,
    )
}

/// The subset of the Kubernetes API the reconciler needs for ExternalSecrets.
#[async_trait]
pub trait ExternalSecretApi: Send + Sync {
    /// List every ExternalSecret in `namespace`, in the order the api server returns them
    async fn list(&self, namespace: &str) -> Result<Vec<DynamicObject>, kube::Error>;

    async fn get(&self, namespace: &str, name: &str) -> Result<DynamicObject, kube::Error>;

    /// Replace (PUT) the object, subject to the api server's resourceVersion checks
    async fn replace(
        &self,
        namespace: &str,
        es: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error>;
}

#[async_trait]
impl ExternalSecretApi for Client {
    async fn list(&self, namespace: &str) -> Result<Vec<DynamicObject>, kube::Error> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.clone(), namespace, &external_secret_resource());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<DynamicObject, kube::Error> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.clone(), namespace, &external_secret_resource());
        api.get(name).await
    }

    async fn replace(
        &self,
        namespace: &str,
        es: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.clone(), namespace, &external_secret_resource());
        api.replace(&es.name_any(), &PostParams::default(), es)
            .await
    }
}

/// Why an ExternalSecret (or one of its data entries) could not be evaluated.
///
/// These are never fatal; the offending resource or entry is skipped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedResource {
    #[error("spec.data not found")]
    MissingData,
    #[error("spec.data is not a list")]
    InvalidData,
    #[error("spec.data[{0}] is not an object")]
    InvalidEntry(usize),
    #[error("remoteRef not found in spec.data[{0}]")]
    MissingRemoteRef(usize),
    #[error("key not found in spec.data[{0}].remoteRef")]
    MissingKey(usize),
}

/// Walk `path` through nested objects, returning `None` as soon as a segment is
/// missing or the value at that point is not an object.
pub fn get_nested<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, segment| current.as_object()?.get(*segment))
}

pub fn get_nested_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    get_nested(value, path)?.as_str()
}

/// Lazily yields the `remoteRef.key` of every entry in `spec.data`.
///
/// Fails outright if `spec.data` itself is unusable; individual bad entries are
/// yielded as errors so that the caller can log and move on.
pub fn remote_ref_keys(
    es: &DynamicObject,
) -> Result<impl Iterator<Item = Result<&str, MalformedResource>> + '_, MalformedResource> {
    let data = get_nested(&es.data, &["spec", "data"])
        .ok_or(MalformedResource::MissingData)?
        .as_array()
        .ok_or(MalformedResource::InvalidData)?;

    Ok(data.iter().enumerate().map(|(index, entry)| {
        if !entry.is_object() {
            return Err(MalformedResource::InvalidEntry(index));
        }
        let remote_ref = get_nested(entry, &["remoteRef"])
            .filter(|r| r.is_object())
            .ok_or(MalformedResource::MissingRemoteRef(index))?;
        get_nested_str(remote_ref, &["key"]).ok_or(MalformedResource::MissingKey(index))
    }))
}
