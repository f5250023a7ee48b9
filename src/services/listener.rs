//! Line-oriented TCP command listener.
//!
//! Each connection carries exactly one request line and gets exactly one
//! reply line:
//!
//! ```text
//! client: s3cret:RIGHT\n
//! server: OK RIGHT\n
//! ```
//!
//! The read stops at the first newline, at EOF, at [`MAX_REQUEST_BYTES`] or
//! when the read timeout expires; whatever arrived by then is dispatched.
//! Bytes that are not valid UTF-8 are replaced rather than rejected.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::dispatch::LineHandler;
use crate::error::ServerError;

/// Longest request accepted; anything beyond is ignored.
pub const MAX_REQUEST_BYTES: usize = 1024;

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Binds the listening socket described by `config`.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.bind_addr();
    TcpListener::bind(addr.as_str()).await.map_err(|source| {
        if source.kind() == io::ErrorKind::InvalidInput {
            ServerError::InvalidAddress(addr)
        } else {
            ServerError::Bind { addr, source }
        }
    })
}

/// Accepts connections until `shutdown` resolves.
///
/// Every connection runs in its own task; a slow or broken client never
/// holds up the others. Accept errors are logged and the loop keeps going.
pub async fn serve<H, F>(listener: TcpListener, handler: Arc<H>, read_timeout: Duration, shutdown: F)
where
    H: LineHandler,
    F: Future<Output = ()>,
{
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "command listener ready"),
        Err(e) => warn!(error = %e, "command listener ready on unknown address"),
    }
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("command listener stopping");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &*handler, read_timeout).await {
                            debug!(%peer, error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

/// Reads one request from `stream`, answers it and closes the write side.
pub async fn handle_connection<S, H>(mut stream: S, handler: &H, read_timeout: Duration) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    H: LineHandler + ?Sized,
{
    let line = read_request(&mut stream, read_timeout).await?;
    let reply = handler.respond(&line);
    debug!(request = %line, reply = %reply, "request handled");

    stream.write_all(format!("{reply}\n").as_bytes()).await?;
    stream.shutdown().await
}

/// Reads up to the first newline and returns that line.
///
/// EOF and timeout end the read early without error.
pub async fn read_request<S>(stream: &mut S, read_timeout: Duration) -> io::Result<String>
where
    S: AsyncRead + Unpin,
{
    let deadline = Instant::now() + read_timeout;
    let mut data = Vec::with_capacity(128);
    let mut buf = [0u8; 256];

    loop {
        match timeout_at(deadline, stream.read(&mut buf)).await {
            Err(_) => {
                debug!(bytes = data.len(), "request read timed out");
                break;
            }
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                data.extend_from_slice(&buf[..n]);
                if data.contains(&b'\n') || data.len() >= MAX_REQUEST_BYTES {
                    break;
                }
            }
            Ok(Err(e)) => return Err(e),
        }
    }

    data.truncate(MAX_REQUEST_BYTES);
    let text = String::from_utf8_lossy(&data);
    Ok(text.lines().next().unwrap_or_default().to_string())
}
