use std::io;

use codel_sms::{BulkStrategy, CodelClient, Credentials, Dispatch};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Either a plain token or JSON such as {"username": "...", "password": "..."}.
    let config = std::env::var("CODEL_CONFIG").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "CODEL_CONFIG environment variable is required",
        )
    })?;
    let phones = std::env::var("CODEL_PHONES").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "CODEL_PHONES environment variable is required (comma-separated numbers)",
        )
    })?;
    let text = std::env::var("CODEL_MESSAGE")
        .unwrap_or_else(|_| "Hello from the codel-sms demo.".to_owned());
    let strategy = match std::env::var("CODEL_BULK_STRATEGY").as_deref() {
        Ok("batch") => BulkStrategy::Batch,
        _ => BulkStrategy::Concurrent,
    };

    let config = if config.trim_start().starts_with('{') {
        serde_json::from_str(&config)?
    } else {
        serde_json::Value::String(config)
    };
    let client = CodelClient::builder(Credentials::from_value(&config)?)
        .bulk_strategy(strategy)
        .build()?;

    match client.send(phones.as_str(), text).await? {
        Dispatch::Single(response) | Dispatch::Batch(response) => {
            println!("ok: {}, status: {}", response.is_ok(), response.status());
        }
        Dispatch::Bulk(result) => {
            println!(
                "status: {}, sent: {}/{}",
                result.status.as_str(),
                result.success_count,
                result.total_count
            );
            for outcome in result.ordered() {
                if let Some(error) = outcome.error() {
                    println!("  #{} failed: {error}", outcome.index);
                }
            }
        }
    }

    Ok(())
}
