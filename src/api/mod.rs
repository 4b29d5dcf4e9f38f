//! HTTP API in front of the command facade

pub mod http;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use http::{read_request, HttpError, Response};
pub use routes::ApiState;

/// Pause after a failed accept so descriptor exhaustion does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections until the listener fails
pub async fn serve(listener: TcpListener, state: Arc<ApiState>) -> Result<()> {
    let local = listener.local_addr().context("listener address")?;
    info!("HTTP API listening on {}", local);

    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept failed: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        debug!("HTTP connection from {}", addr);

        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(socket, &state).await {
                debug!("HTTP connection {} closed: {}", addr, e);
            }
        });
    }
}

/// Answer requests on one connection until the client closes it, asks to, or
/// goes quiet for longer than `state.idle_timeout`
pub async fn serve_connection<S>(stream: S, state: &ApiState) -> Result<(), HttpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read, mut write) = tokio::io::split(stream);
    let mut reader = BufReader::new(read);

    loop {
        let next = match tokio::time::timeout(state.idle_timeout, read_request(&mut reader)).await {
            Ok(next) => next,
            Err(_) => {
                debug!("HTTP connection idle for {:?}, closing", state.idle_timeout);
                return Ok(());
            }
        };

        let request = match next {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(HttpError::Io(e)) => return Err(HttpError::Io(e)),
            Err(e) => {
                Response::text(e.status_code(), e.to_string())
                    .write_to(&mut write, false)
                    .await?;
                return Err(e);
            }
        };

        let keep_alive = request.keep_alive();
        let response = routes::handle(state, &request).await;
        response.write_to(&mut write, keep_alive).await?;

        if !keep_alive {
            return Ok(());
        }
    }
}
