//! SCMB sniffer - prints messages from an appliance state-change bus.
//!
//! Two phases:
//! - Provision short-lived mutual-TLS credentials from the appliance's
//!   control-plane API (login, certificate generation task, download).
//! - Subscribe to the bus topic exchange with those credentials and print
//!   matching messages until interrupted.

mod args;
mod format;
mod subscribe;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use format::OutputOptions;
use scmb_client::{provision, CredentialStore, RoutingKey, Session};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let exit_code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(args: Args) -> Result<()> {
    let routing_key =
        RoutingKey::parse(&args.routing_key).context("invalid routing key pattern")?;
    let mut store =
        CredentialStore::acquire().context("failed to create the credential directory")?;

    // Ctrl-C is the only cancellation mechanism; whichever phase it lands
    // in, the credential directory is still removed below.
    let result = tokio::select! {
        result = provision_and_listen(&args, &routing_key, &mut store) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            Ok(())
        }
    };

    if let Err(e) = store.release() {
        tracing::warn!("failed to remove the credential directory: {e}");
    }
    result
}

async fn provision_and_listen(
    args: &Args,
    routing_key: &RoutingKey,
    store: &mut CredentialStore,
) -> Result<()> {
    let session = Session::login(&args.server, &args.username, &args.password, args.insecure)
        .await
        .context("failed to log in to the appliance")?;

    let credentials = provision::ensure_credentials(session, store)
        .await
        .context("failed to provision bus credentials")?;

    let options = OutputOptions {
        timestamp: args.timestamp,
        routing_key: !args.no_routing_key,
        json: args.json,
    };
    subscribe::subscribe(&args.server, &credentials, routing_key, &options).await
}
