use actix_web::{App, HttpServer, web};
use chart_signal_rs::api;
use chart_signal_rs::config::Settings;
use chart_signal_rs::handler::SignalRequestHandler;
use chart_signal_rs::logging;
use chart_signal_rs::vision::OpenAiVisionClient;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables before the subscriber reads RUST_LOG
    dotenv::dotenv().ok();
    logging::init_tracing();

    let settings = match Settings::new() {
        Ok(s) => s,
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let client_config = settings.client_config();
    let analyzer_config = settings.analyzer_config();
    if analyzer_config.api_key.is_none() {
        warn!("⚠️ OPENAI_API_KEY not set. Every analysis request will return 500.");
    }

    info!(
        model = %client_config.model,
        timeout_secs = client_config.timeout_secs,
        "Vision model configured"
    );
    let model = Arc::new(OpenAiVisionClient::new(client_config)?);
    let handler = web::Data::new(SignalRequestHandler::new(analyzer_config, model));

    let bind_address = settings.bind_address();
    info!("🚀 Starting chart signal API on {}", bind_address);

    HttpServer::new(move || App::new().app_data(handler.clone()).configure(api::config))
        .bind(&bind_address)?
        .run()
        .await?;

    Ok(())
}
