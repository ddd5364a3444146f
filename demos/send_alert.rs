//! Send one test alert using a TOML config file.
//!
//! ```text
//! RUST_LOG=webhook_alerter=debug cargo run --example send_alert -- alerter.toml
//! ```

use std::time::Duration;

use tracing_subscriber::EnvFilter;
use webhook_alerter::{Alert, AlerterConfig, Category, Dispatcher, Priority};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: send_alert <config.toml>")?;
    let config = AlerterConfig::load(&path)?;
    let dispatcher = Dispatcher::new(config.dispatcher.clone(), config.router()?);

    let id = dispatcher
        .send(
            Alert::new(
                Category::Test,
                Priority::Low,
                "webhook check",
                "If you can read this, delivery works.",
            )
            .with_test_mode(true),
        )
        .await?;
    println!("enqueued {id}");

    let report = dispatcher.shutdown(Duration::from_secs(15)).await;
    println!("shutdown: {report:?}");
    println!("statistics: {:#?}", dispatcher.statistics());

    for entry in dispatcher.dead_letters().await {
        println!(
            "dead letter {}: {}",
            entry.envelope.id(),
            entry.last_result.error.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}
