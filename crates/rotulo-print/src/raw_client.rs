// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP print client (JetDirect, port 9100).
//
// The simplest possible print channel: open a TCP socket and dump bytes.
// Label printers interpret the ZPL natively; there is no protocol
// negotiation, no job tracking, no feedback. Success is a clean close
// after the full write.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use rotulo_core::error::{Result, RotuloError};

/// Default raw TCP port (HP JetDirect convention, used by ZPL printers).
pub const RAW_PORT: u16 = 9100;

/// One deadline covers connect, write, and close. Label printers answer
/// on a LAN; anything slower is treated as down so the spool fallback
/// gets its turn quickly.
pub const RAW_TIMEOUT: Duration = Duration::from_secs(5);

/// Send a rendered payload to a printer via raw TCP.
pub async fn send_raw(ip: &str, port: u16, payload: &[u8]) -> Result<()> {
    send_raw_with_timeout(ip, port, payload, RAW_TIMEOUT).await
}

/// Same as [`send_raw`] with an explicit overall deadline.
pub async fn send_raw_with_timeout(
    ip: &str,
    port: u16,
    payload: &[u8],
    timeout: Duration,
) -> Result<()> {
    let addr = format!("{ip}:{port}");
    debug!(addr = %addr, bytes = payload.len(), "connecting via raw socket");

    match tokio::time::timeout(timeout, stream_payload(&addr, payload)).await {
        Ok(result) => {
            result?;
            info!(addr = %addr, bytes = payload.len(), "raw socket delivery complete");
            Ok(())
        }
        Err(_) => Err(RotuloError::RawSocket(format!(
            "delivery to {addr} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

async fn stream_payload(addr: &str, payload: &[u8]) -> Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| RotuloError::RawSocket(format!("connect to {addr}: {e}")))?;

    stream
        .write_all(payload)
        .await
        .map_err(|e| RotuloError::RawSocket(format!("send to {addr}: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| RotuloError::RawSocket(format!("flush to {addr}: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| RotuloError::RawSocket(format!("close to {addr}: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn delivers_payload_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        send_raw("127.0.0.1", port, b"^XA^FDtest^FS^XZ").await.unwrap();
        assert_eq!(server.await.unwrap(), b"^XA^FDtest^FS^XZ");
    }

    #[tokio::test]
    async fn refused_connection_reports_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = send_raw("127.0.0.1", port, b"x").await.unwrap_err();
        assert!(matches!(err, RotuloError::RawSocket(_)));
        assert!(err.to_string().contains("connect"));
    }

    #[tokio::test]
    async fn unreachable_host_times_out() {
        // non-routable address: connect hangs until the deadline fires
        let err = send_raw_with_timeout(
            "10.255.255.1",
            RAW_PORT,
            b"x",
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RotuloError::RawSocket(_)));
    }
}
