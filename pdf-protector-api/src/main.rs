use anyhow::Context;
use pdf_protector::ParseOptions;
use pdf_protector_api::app_with_options;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pdf_protector_api=debug,pdf_protector=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PDF_PROTECTOR_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let mut options = ParseOptions::default();
    if let Ok(limit) = std::env::var("PDF_PROTECTOR_MAX_SIZE") {
        let limit = limit
            .parse::<usize>()
            .with_context(|| format!("invalid PDF_PROTECTOR_MAX_SIZE '{limit}'"))?;
        options = options.with_max_document_size(limit);
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    info!("pdf-protector API listening on http://{}", addr);

    axum::serve(listener, app_with_options(options)).await?;
    Ok(())
}
