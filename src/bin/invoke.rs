//! Single serverless-style invocation.
//!
//! Reads one platform event (`httpMethod`, `body`, `isBase64Encoded`) from the
//! file given as the first argument, or stdin when absent, and prints the
//! response envelope as JSON on stdout.
//!
//!   echo '{"httpMethod":"POST","body":"{\"image\":\"...\"}"}' | invoke

use std::env;
use std::fs;
use std::io::{self, Read};
use std::sync::Arc;
use tracing::info;

use chart_signal_rs::config::Settings;
use chart_signal_rs::envelope::RequestEnvelope;
use chart_signal_rs::handler::SignalRequestHandler;
use chart_signal_rs::logging;
use chart_signal_rs::vision::OpenAiVisionClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    logging::init_tracing();

    let args: Vec<String> = env::args().collect();
    let raw_event = match args.get(1) {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let event: RequestEnvelope = serde_json::from_str(&raw_event)?;
    info!(method = %event.http_method, "Invoking handler");

    let settings = Settings::new()?;
    let model = Arc::new(OpenAiVisionClient::new(settings.client_config())?);
    let handler = SignalRequestHandler::new(settings.analyzer_config(), model);

    let response = handler.handle(event).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
