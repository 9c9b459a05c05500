use anyhow::Context;

use ecosense_client::cli::{self, Exit};
use ecosense_client::config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the conversation on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();

    eprintln!("🌿 EcoSense client v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base_url);
    match &config.session_dir {
        Some(dir) => eprintln!("   Session: {}", dir.display()),
        None => eprintln!("   Session: in memory"),
    }
    eprintln!();

    let store = cli::session_store(&config);
    let backend = cli::backend(&config).context("Failed to set up the backend client")?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let exit = cli::run(stdin, &mut stdout, store, backend)
        .await
        .context("Terminal session failed")?;

    tracing::info!(exit = ?exit, "Session closed");
    if exit == Exit::EndOfInput {
        eprintln!();
    }
    Ok(())
}
