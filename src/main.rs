use std::sync::Arc;

use actix_web::{
    get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use clap::Parser;
use prometheus::{Encoder, TextEncoder};
use tracing::info;

pub use externalsecret_updater::{self, telemetry, State};
use externalsecret_updater::{
    config::Settings,
    reconcilers::{KubeClientResolver, NamespaceResolver},
    webhook::{self, BasicAuth, WebhookState},
};

#[get("/metrics")]
async fn metrics(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    match encoder.encode(&metrics, &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    telemetry::init(settings.log_format);

    let state = State::default();
    let reconciler = state.to_reconciler(
        Arc::new(KubeClientResolver::new(settings.kubeconfig.clone())),
        NamespaceResolver::new(&settings.namespace_file),
        settings.cache_buster(),
    )?;
    let webhook_state = Data::new(WebhookState {
        auth: BasicAuth::new(&settings.basic_auth_user, &settings.basic_auth_password),
        reconciler,
    });

    info!(
        "Listening on {} (cache buster enabled: {})",
        settings.listen_address, settings.enable_cache_buster
    );
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(state.clone()))
            .app_data(webhook_state.clone())
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
            .service(metrics)
            .service(webhook::webhook)
    })
    .bind(settings.listen_address)?
    .shutdown_timeout(5)
    .run()
    .await?;
    Ok(())
}
