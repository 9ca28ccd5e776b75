use dotenv::dotenv;
use std::sync::Arc;
use todo_web::config::AppConfig;
use todo_web::views::Views;
use todo_web::{SharedData, build_router, logging, persistence};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let config = AppConfig::from_env().expect("could not load configuration");

    let otel_exporters = match (&config.otel_span_export_url, &config.otel_metric_export_url) {
        (Some(span_url), Some(metric_url)) => Some(
            logging::init_exporters(span_url, metric_url)
                .expect("could not start the OpenTelemetry exporters"),
        ),
        _ => None,
    };
    logging::setup_logging_and_tracing(logging::init_env_filter(), otel_exporters);

    let ext_cxn = persistence::ExternalConnectivity::new(
        config.supabase_url.clone(),
        &config.supabase_anon_key,
    )
    .expect("could not build the backend client");
    let views = Views::new().expect("page templates failed to compile");
    let bind_address = config.bind_address;
    let shared_data = Arc::new(SharedData {
        ext_cxn,
        config,
        views,
    });

    let listener = TcpListener::bind(bind_address)
        .await
        .expect("could not bind the server address");
    info!("Listening on {bind_address}");
    axum::serve(listener, build_router(shared_data))
        .await
        .expect("server failed");
}
