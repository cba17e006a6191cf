use std::io;

use codel_sms::{Balance, CodelClient, Credentials};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let token = std::env::var("CODEL_API_TOKEN").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "CODEL_API_TOKEN environment variable is required",
        )
    })?;

    let client = CodelClient::new(Credentials::token(token)?);
    match client.get_balance().await? {
        Balance::Credits(credits) => println!("credits: {credits}"),
        Balance::Raw(body) => println!("unexpected answer: {body}"),
    }

    Ok(())
}
