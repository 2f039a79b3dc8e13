//! CLI argument parsing.

use clap::Parser;

/// Listen for messages on an appliance state-change message bus.
#[derive(Parser, Debug)]
#[command(name = "scmb-sniffer", version, about)]
#[command(after_help = "To stop listening press Ctrl-C.")]
pub struct Args {
    /// Hostname or address of the appliance
    #[arg(short, long, env = "SCMB_SERVER")]
    pub server: String,

    /// Username for the control-plane API
    #[arg(short, long)]
    pub username: String,

    /// Password for the control-plane API
    #[arg(short, long, env = "SCMB_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Prefix each message with its timestamp
    #[arg(short = 't', long)]
    pub timestamp: bool,

    /// Print the JSON body of each message
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Suppress printing the routing key (printed by default)
    #[arg(short = 'r', long = "no-routing-key")]
    pub no_routing_key: bool,

    /// Skip TLS verification for the control-plane API (for appliances with
    /// self-signed management certificates; the bus channel always verifies)
    #[arg(long)]
    pub insecure: bool,

    /// Topic pattern to listen on, e.g. "scmb.alerts.#"
    pub routing_key: String,
}
