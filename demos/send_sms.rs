use std::io;

use codel_sms::{CodelClient, Credentials, Message};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let token = std::env::var("CODEL_API_TOKEN").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "CODEL_API_TOKEN environment variable is required",
        )
    })?;
    let phone = std::env::var("CODEL_PHONE").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "CODEL_PHONE environment variable is required",
        )
    })?;
    let text = std::env::var("CODEL_MESSAGE")
        .unwrap_or_else(|_| "Hello from the codel-sms demo.".to_owned());

    let client = CodelClient::new(Credentials::token(token)?);
    let response = client.send_one(Message::new(phone, text)?).await?;
    println!(
        "ok: {}, status: {}, credits used: {}, message id: {:?}",
        response.is_ok(),
        response.status(),
        response.credits_used(),
        response.message_id()
    );

    Ok(())
}
