//! exprkit Server
//!
//! JSON-RPC server that keeps prepared expressions alive for another process
//! and evaluates them on request. Communicates via stdin/stdout for easy
//! subprocess management.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use exprkit_core::protocol::RpcMessage;
use exprkit_core::{EngineConfig, Request, Response};
use tracing::{debug, error, info};

mod handler;

fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is for JSON-RPC)
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let config = EngineConfig::from_env()?;
    info!(max_depth = config.max_depth, "exprkit-server starting...");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let mut handler = handler::Handler::new(config);

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to read line: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", line);

        let (id, request) = parse_request(&line);
        let response = match &request {
            Ok(request) => handler.handle(request),
            Err(message) => Response::error("invalid_request", message.as_str()),
        };

        // Send response
        let response_json = serde_json::to_string(&RpcMessage::new(id, response))?;
        debug!("Sending: {}", response_json);
        writeln!(stdout, "{}", response_json)?;
        stdout.flush()?;

        if matches!(request, Ok(Request::Shutdown)) {
            break;
        }
    }

    info!("exprkit-server shutting down");
    Ok(())
}

/// Split a request line into its id and request. The id is recovered even
/// when the request itself is malformed, and falls back to 0.
fn parse_request(line: &str) -> (u64, Result<Request, String>) {
    let json: serde_json::Value = match serde_json::from_str(line) {
        Ok(json) => json,
        Err(e) => return (0, Err(format!("Parse error: {}", e))),
    };
    let id = json.get("id").and_then(serde_json::Value::as_u64).unwrap_or(0);

    match serde_json::from_value::<RpcMessage<Request>>(json) {
        Ok(msg) => (id, Ok(msg.content)),
        Err(e) => (id, Err(format!("Invalid request: {}", e))),
    }
}
