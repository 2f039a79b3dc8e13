//! TLS subscription to the state-change message bus.
//!
//! Opens a mutually-authenticated AMQP connection using the provisioned
//! credential bundle, binds a connection-exclusive queue to the topic
//! exchange, and runs the single-consumer receive loop. The subscription
//! lifecycle is an explicit state machine so cancellation and cleanup
//! ordering stay testable.

use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use lapin::options::{BasicConsumeOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::tcp::{AMQPUriTcpExt, NativeTlsConnector};
use lapin::types::FieldTable;
use lapin::uri::AMQPUri;
use lapin::{Connection, ConnectionProperties};
use scmb_client::{CredentialPaths, RoutingKey};
use tokio_stream::StreamExt;

use crate::format::{render, OutputOptions};

/// Secured AMQP port on the appliance.
const SCMB_PORT: u16 = 5671;

/// Topic exchange carrying state-change messages.
const SCMB_EXCHANGE: &str = "scmb";

/// Subscription lifecycle.
///
/// Deliveries are handled only in `Consuming`; `Closed` is the clean end of
/// the stream, `Failed` any transport or handler error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Disconnected,
    Connecting,
    Bound,
    Consuming,
    Closed,
    Failed,
}

impl SubscriberState {
    pub fn can_transition(self, next: Self) -> bool {
        use SubscriberState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Bound)
                | (Connecting, Failed)
                | (Bound, Consuming)
                | (Bound, Failed)
                | (Consuming, Closed)
                | (Consuming, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

fn advance(state: &mut SubscriberState, next: SubscriberState) {
    debug_assert!(
        state.can_transition(next),
        "illegal subscriber transition {state:?} -> {next:?}"
    );
    tracing::debug!(from = ?state, to = ?next, "subscriber state change");
    *state = next;
}

/// Subscribe and print messages until the stream ends or errors.
pub async fn subscribe(
    server: &str,
    credentials: &CredentialPaths,
    routing_key: &RoutingKey,
    options: &OutputOptions,
) -> Result<()> {
    let mut state = SubscriberState::Disconnected;
    let result = run(&mut state, server, credentials, routing_key, options).await;
    match result {
        Ok(()) => advance(&mut state, SubscriberState::Closed),
        Err(_) => advance(&mut state, SubscriberState::Failed),
    }
    result
}

async fn run(
    state: &mut SubscriberState,
    server: &str,
    credentials: &CredentialPaths,
    routing_key: &RoutingKey,
    options: &OutputOptions,
) -> Result<()> {
    advance(state, SubscriberState::Connecting);
    let connection = connect(server, credentials)
        .await
        .context("failed to connect to the message bus")?;
    let channel = connection
        .create_channel()
        .await
        .context("failed to open a bus channel")?;

    // Server-named queue, exclusive to this connection, gone with it.
    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                exclusive: true,
                auto_delete: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("failed to declare a queue")?;
    channel
        .queue_bind(
            queue.name().as_str(),
            SCMB_EXCHANGE,
            routing_key.as_str(),
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("failed to bind the queue")?;
    advance(state, SubscriberState::Bound);

    let mut consumer = channel
        .basic_consume(
            queue.name().as_str(),
            "scmb-sniffer",
            BasicConsumeOptions {
                no_ack: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("failed to start consuming")?;
    advance(state, SubscriberState::Consuming);
    tracing::info!(exchange = SCMB_EXCHANGE, pattern = %routing_key, "listening for messages");

    let stdout = std::io::stdout();
    while let Some(delivery) = consumer.next().await {
        let delivery = delivery.context("message bus connection lost")?;
        let key = delivery.routing_key.as_str();
        if !routing_key.matches(key) {
            tracing::debug!(routing_key = key, "delivery outside the bound pattern");
        }
        let body: serde_json::Value = serde_json::from_slice(&delivery.data)
            .with_context(|| format!("malformed JSON message on {key}"))?;
        let mut out = stdout.lock();
        render(&mut out, &body, key, options).context("failed to write message output")?;
        out.flush().ok();
    }

    tracing::info!("message stream ended");
    Ok(())
}

async fn connect(server: &str, credentials: &CredentialPaths) -> Result<Connection> {
    let ca_pem = fs::read(&credentials.ca_bundle).context("failed to read CA bundle")?;
    let cert_pem = fs::read(&credentials.certificate).context("failed to read client certificate")?;
    let key_pem = fs::read(&credentials.private_key).context("failed to read client key")?;

    let identity = native_tls::Identity::from_pkcs8(&cert_pem, &key_pem)
        .context("invalid client certificate or key")?;
    let ca = native_tls::Certificate::from_pem(&ca_pem).context("invalid CA bundle")?;

    let mut builder = NativeTlsConnector::builder();
    builder.identity(identity);
    builder.add_root_certificate(ca);
    let connector = builder.build().context("TLS configuration failed")?;

    // Certificate-based EXTERNAL authentication; no credentials on the wire.
    let uri: AMQPUri = format!("amqps://{server}:{SCMB_PORT}/%2f?auth_mechanism=external")
        .parse()
        .map_err(|e: String| anyhow::anyhow!("invalid bus address: {e}"))?;

    let connect = move |uri: &AMQPUri| {
        uri.connect()
            .and_then(|stream| stream.into_native_tls(&connector, &uri.authority.host))
    };
    let properties = ConnectionProperties::default().with_connection_name("scmb-sniffer".into());
    Connection::connector(uri, Box::new(connect), properties)
        .await
        .context("bus handshake failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use SubscriberState::*;
        let mut state = Disconnected;
        for next in [Connecting, Bound, Consuming, Closed] {
            assert!(state.can_transition(next));
            advance(&mut state, next);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_failure_reachable_from_active_states() {
        use SubscriberState::*;
        for from in [Connecting, Bound, Consuming] {
            assert!(from.can_transition(Failed));
        }
    }

    #[test]
    fn test_illegal_transitions() {
        use SubscriberState::*;
        assert!(!Disconnected.can_transition(Consuming));
        assert!(!Connecting.can_transition(Consuming));
        assert!(!Bound.can_transition(Closed));
        assert!(!Closed.can_transition(Connecting));
        assert!(!Failed.can_transition(Connecting));
    }

    #[test]
    fn test_only_end_states_are_terminal() {
        use SubscriberState::*;
        assert!(Closed.is_terminal());
        assert!(Failed.is_terminal());
        for state in [Disconnected, Connecting, Bound, Consuming] {
            assert!(!state.is_terminal());
        }
    }
}
