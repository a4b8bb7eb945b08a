mod classify;
mod config;
mod error;
mod model;
mod recorder;
mod report;
mod transport;
mod verifier;

use clap::Parser;
use std::process::ExitCode;
use tracing::info;

use config::{CliArgs, VerifierConfig};
use transport::ReqwestTransport;
use verifier::StreamingVerifier;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing; stdout is reserved for the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stream_verifier=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    info!("Starting stream-verifier v{}", env!("CARGO_PKG_VERSION"));

    let config = VerifierConfig::from_args(args)?;
    info!("Threshold: {:?}", config.settings.threshold);
    info!(
        "Local deadline: {:?}",
        config.settings.effective_deadline(&config.request)
    );

    let transport = ReqwestTransport::new()?;
    let verifier = StreamingVerifier::new(transport, config.settings);
    let result = verifier.verify(&config.request).await;

    if config.json_output {
        println!("{}", report::render_json(&result)?);
    } else {
        print!("{}", report::render_text(&result));
    }

    Ok(ExitCode::from(result.classification.exit_code()))
}
