//! Console rendering of bus messages.

use std::io::{self, Write};

use serde_json::Value;

/// Output toggles from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub timestamp: bool,
    pub routing_key: bool,
    pub json: bool,
}

/// Render one delivery into `out`.
///
/// Enabled parts are emitted in a fixed order: timestamp prefix (no trailing
/// newline, flushed immediately), routing-key line, JSON body line. A message
/// without a string `timestamp` field just skips the prefix. None of this
/// affects acknowledgement, which happened at the transport level already.
pub fn render(
    out: &mut impl Write,
    body: &Value,
    routing_key: &str,
    options: &OutputOptions,
) -> io::Result<()> {
    if options.timestamp {
        match body.get("timestamp").and_then(Value::as_str) {
            Some(ts) => {
                write!(out, "{ts}: ")?;
                out.flush()?;
            }
            None => tracing::debug!(routing_key, "message has no timestamp field"),
        }
    }
    if options.routing_key {
        writeln!(out, "{routing_key}")?;
    }
    if options.json {
        writeln!(out, "{body}")?;
    }
    Ok(())
}
