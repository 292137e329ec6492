//! Pre-start reachability probe.
//!
//! A plain TCP dial with a bounded timeout, run before any device is opened.
//! It proves the endpoint host accepts connections; the TLS and WebSocket
//! handshakes still happen on the real connect.

use crate::error::{Result, ScribeError};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Host and port extracted from a `ws://` or `wss://` endpoint URL.
pub fn endpoint_authority(endpoint: &str) -> Result<(String, u16)> {
    let (default_port, rest) = if let Some(rest) = endpoint.strip_prefix("wss://") {
        (443, rest)
    } else if let Some(rest) = endpoint.strip_prefix("ws://") {
        (80, rest)
    } else {
        return Err(ScribeError::Unreachable {
            endpoint: endpoint.to_string(),
            message: "endpoint must start with ws:// or wss://".to_string(),
        });
    };

    let authority = rest.split(['/', '?']).next().unwrap_or(rest);
    if authority.is_empty() {
        return Err(ScribeError::Unreachable {
            endpoint: endpoint.to_string(),
            message: "endpoint has no host".to_string(),
        });
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|_| ScribeError::Unreachable {
                endpoint: endpoint.to_string(),
                message: format!("invalid port in {authority}"),
            })?;
            Ok((host.to_string(), port))
        }
        None => Ok((authority.to_string(), default_port)),
    }
}

/// Check that the endpoint host accepts TCP connections within `timeout`.
pub fn check_reachable(endpoint: &str, timeout: Duration) -> Result<()> {
    let (host, port) = endpoint_authority(endpoint)?;
    let addrs = (host.as_str(), port)
        .to_socket_addrs()
        .map_err(|e| ScribeError::Unreachable {
            endpoint: endpoint.to_string(),
            message: format!("DNS resolution failed: {e}"),
        })?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(_) => return Ok(()),
            Err(e) => last_error = Some(e),
        }
    }

    Err(ScribeError::Unreachable {
        endpoint: endpoint.to_string(),
        message: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no addresses resolved".to_string()),
    })
}
