//! HTTP Signature demo gateway.
//!
//! Loads per-user authorized-keys files, advertises a `Signature` challenge
//! and answers every signed request with the authenticated user name.
//!
//! # Usage
//!
//! ```text
//! HTTPSIG_SSHKEYS=alice=/etc/httpsig/alice.keys httpsig-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:4567` | Bind address |
//! | `HTTPSIG_REALM` | `httpsig` | Realm advertised in the challenge |
//! | `HTTPSIG_SKEW` | `300000` | Maximum `date` skew in milliseconds |
//! | `HTTPSIG_SSHKEYS` | *(empty)* | `user=path,user=path` key files |
//! | `HTTPSIG_HEADERS` | `date` | Space separated headers every request must sign |
//! | `HTTPSIG_KEY_ID` | `user-fingerprint` | Key id scheme |
//! | `LOG_LEVEL` | `info` | Log level filter, overridden by `RUST_LOG` |

mod gateway;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use httpsig_core::HttpsigConfig;
use httpsig_login::HttpsigConfiguration;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::gateway::GatewayService;

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level).with_context(|| format!("invalid LOG_LEVEL: {log_level}"))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Accept connections until Ctrl-C, then drain the open ones.
async fn serve(listener: TcpListener, service: GatewayService) -> Result<()> {
    let graceful = GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };
        let conn = http.serve_connection(TokioIo::new(stream), service.clone()).into_owned();
        let conn = graceful.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }

    info!("draining connections");
    graceful.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = HttpsigConfig::from_env();
    init_tracing(&config.log_level)?;

    let configuration = Arc::new(HttpsigConfiguration::new(&config));
    let snapshot = configuration.snapshot();
    if snapshot.verifier().keychain().is_empty() {
        warn!("no keys loaded, every request will be rejected");
    }

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        realm = %snapshot.challenge().realm(),
        keys = snapshot.verifier().keychain().len(),
        version = env!("CARGO_PKG_VERSION"),
        "HTTP signature gateway listening",
    );
    serve(listener, GatewayService::new(configuration)).await
}
