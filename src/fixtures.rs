//! Shared test doubles: ExternalSecret builders and an in-memory api server.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::config::{InClusterError, Kubeconfig};
use kube::error::ErrorResponse;
use kube::ResourceExt;
use serde_json::json;

use crate::reconcilers::client::ClientResolver;
use crate::resources::{external_secret_resource, ExternalSecretApi};
use crate::{Error, Result};

/// An ExternalSecret whose `spec.data` references each of `keys` in order
pub fn external_secret(name: &str, keys: &[&str]) -> DynamicObject {
    let data: Vec<_> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            json!({
                "secretKey": format!("value-{i}"),
                "remoteRef": {"key": key}
            })
        })
        .collect();
    DynamicObject::new(name, &external_secret_resource())
        .within("apps")
        .data(json!({
            "spec": {
                "refreshInterval": "1h",
                "secretStoreRef": {"kind": "ClusterSecretStore", "name": "vault"},
                "data": data
            }
        }))
}

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: format!("injected {reason}"),
        reason: reason.into(),
        code,
    })
}

#[derive(Debug, Clone)]
pub enum Call {
    List(String),
    Get(String, String),
    Replace(String, DynamicObject),
}

#[derive(Default)]
struct Inner {
    objects: Vec<DynamicObject>,
    calls: Vec<Call>,
    resource_version: u64,
    fail_list: bool,
    fail_get: bool,
    /// 1-based index of the replace call that fails
    fail_replace_at: Option<usize>,
}

/// An api server holding ExternalSecrets in memory, recording every call
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    pub fn with(objects: Vec<DynamicObject>) -> Self {
        let api = Self::default();
        {
            let mut inner = api.inner.lock().unwrap();
            for mut es in objects {
                inner.resource_version += 1;
                es.metadata.resource_version = Some(inner.resource_version.to_string());
                inner.objects.push(es);
            }
        }
        api
    }

    pub fn failing_list(self) -> Self {
        self.inner.lock().unwrap().fail_list = true;
        self
    }

    pub fn failing_get(self) -> Self {
        self.inner.lock().unwrap().fail_get = true;
        self
    }

    pub fn failing_replace_at(self, call: usize) -> Self {
        self.inner.lock().unwrap().fail_replace_at = Some(call);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Objects sent with each replace call, in order
    pub fn replaced(&self) -> Vec<DynamicObject> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Replace(_, es) => Some(es),
                _ => None,
            })
            .collect()
    }

    pub fn stored(&self, name: &str) -> Option<DynamicObject> {
        let inner = self.inner.lock().unwrap();
        inner.objects.iter().find(|es| es.name_any() == name).cloned()
    }
}

#[async_trait]
impl ExternalSecretApi for FakeApi {
    async fn list(&self, namespace: &str) -> Result<Vec<DynamicObject>, kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::List(namespace.into()));
        if inner.fail_list {
            return Err(api_error(403, "Forbidden"));
        }
        Ok(inner.objects.clone())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<DynamicObject, kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Get(namespace.into(), name.into()));
        if inner.fail_get {
            return Err(api_error(500, "InternalError"));
        }
        inner
            .objects
            .iter()
            .find(|es| es.name_any() == name)
            .cloned()
            .ok_or_else(|| api_error(404, "NotFound"))
    }

    async fn replace(
        &self,
        namespace: &str,
        es: &DynamicObject,
    ) -> Result<DynamicObject, kube::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::Replace(namespace.into(), es.clone()));
        let attempt = inner
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Replace(..)))
            .count();
        if inner.fail_replace_at == Some(attempt) {
            return Err(api_error(409, "Conflict"));
        }
        let name = es.name_any();
        let current = inner
            .objects
            .iter()
            .position(|stored| stored.name_any() == name)
            .ok_or_else(|| api_error(404, "NotFound"))?;
        if inner.objects[current].metadata.resource_version != es.metadata.resource_version {
            return Err(api_error(409, "Conflict"));
        }
        inner.resource_version += 1;
        let mut stored = es.clone();
        stored.metadata.resource_version = Some(inner.resource_version.to_string());
        inner.objects[current] = stored.clone();
        Ok(stored)
    }
}

/// Hands out a [`FakeApi`], or fails like a pod without any credentials
pub enum FakeResolver {
    Api(FakeApi),
    NoCredentials,
}

#[async_trait]
impl ClientResolver for FakeResolver {
    async fn resolve(&self) -> Result<Arc<dyn ExternalSecretApi>> {
        match self {
            FakeResolver::Api(api) => Ok(Arc::new(api.clone())),
            FakeResolver::NoCredentials => Err(Error::CredentialError {
                in_cluster: InClusterError::ReadEnvironmentVariable(std::env::VarError::NotPresent),
                kubeconfig: Kubeconfig::read_from("/nonexistent/kubeconfig").unwrap_err(),
            }),
        }
    }
}

pub fn annotations(es: &DynamicObject) -> BTreeMap<String, String> {
    es.annotations().clone()
}
