use std::process::ExitCode;

use dvsportal::portal::{PortalClient, PortalConfig};
use tracing_subscriber::EnvFilter;

/// Log in, fetch the account and print the snapshot as JSON.
#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match PortalConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!(
                "Set DVSPORTAL_HOST, DVSPORTAL_IDENTIFIER and DVSPORTAL_PASSWORD \
                 (optionally DVSPORTAL_TIMEOUT_SECS)."
            );
            return ExitCode::FAILURE;
        }
    };

    let result = PortalClient::scoped(config, |client| {
        Box::pin(async move {
            client.update().await?;
            Ok(client.snapshot().await)
        })
    })
    .await;

    let snapshot = match result {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&snapshot) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: failed to render snapshot: {e}");
            ExitCode::FAILURE
        }
    }
}
