//! The `/webhook` endpoint notified by the secret store when an item changes.

use std::collections::BTreeMap;

use actix_web::{
    http::header::{AUTHORIZATION, WWW_AUTHENTICATE},
    post, web, HttpRequest, HttpResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::*;

use crate::Reconciler;

const REALM: &str = r#"Basic realm="externalsecret-updater""#;

/// A change notification; only `item_name` is acted upon
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<BTreeMap<String, String>>,
}

/// The item to reconcile for a batch: the first event's, if it names one
pub fn first_item_name(events: &[Event]) -> Option<&str> {
    events
        .first()?
        .item_name
        .as_deref()
        .filter(|name| !name.is_empty())
}

/// Expected `Authorization` header for HTTP basic auth
#[derive(Clone)]
pub struct BasicAuth {
    expected: String,
}

impl BasicAuth {
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            expected: format!("Basic {}", STANDARD.encode(format!("{user}:{password}"))),
        }
    }

    pub fn authorize(&self, req: &HttpRequest) -> bool {
        req.headers()
            .get(AUTHORIZATION)
            .is_some_and(|value| value.as_bytes() == self.expected.as_bytes())
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BasicAuth(..)")
    }
}

pub struct WebhookState {
    pub auth: BasicAuth,
    pub reconciler: Reconciler,
}

/// Accepts a JSON array of [`Event`]s.
///
/// The body is decoded regardless of its declared content type. Reconciliation
/// failures are logged and never turned into an error response.
#[post("/webhook")]
pub async fn webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<WebhookState>,
) -> HttpResponse {
    if !state.auth.authorize(&req) {
        warn!("Rejected webhook call without valid credentials");
        return HttpResponse::Unauthorized()
            .insert_header((WWW_AUTHENTICATE, REALM))
            .json(json!({"error": "unauthorized"}));
    }

    let events: Vec<Event> = match serde_json::from_slice(&body) {
        Ok(events) => events,
        Err(err) => {
            error!("Failed to bind incoming events: {err}");
            return HttpResponse::BadRequest().json(json!({"error": err.to_string()}));
        }
    };
    debug!("Received events: {events:?}");

    match first_item_name(&events) {
        Some(item_name) => {
            info!("Received event for secret update: {item_name}");
            state.reconciler.run(item_name).await;
        }
        None if events.is_empty() => debug!("No events to process"),
        None => warn!("First event carries no item_name, nothing to reconcile"),
    }

    HttpResponse::Created().finish()
}
