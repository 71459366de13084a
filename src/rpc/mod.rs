//! RPC transport adapter.
//!
//! A TCP listener speaking newline-delimited JSON envelopes with a single
//! `validate` method that delegates straight to the session engine. Like the
//! HTTP adapter this is pure translation: decode, call, encode.

pub mod wire;

use crate::session::{self, Engine};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinSet,
};
use tracing::{debug, info};
use wire::{ErrorCode, Response, TokenPairWire};

pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Bind the RPC listener. Failing to bind is fatal before serving.
    ///
    /// # Errors
    ///
    /// Returns an error if neither the dual-stack nor the IPv4 socket can
    /// be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = match TcpListener::bind(format!("[::]:{port}")).await {
            Ok(listener) => listener,
            // Dual-stack sockets are unavailable in v6-less containers.
            Err(_) => TcpListener::bind(format!("0.0.0.0:{port}"))
                .await
                .with_context(|| format!("Failed to bind RPC listener on port {port}"))?,
        };
        Ok(Self { listener })
    }

    /// # Errors
    ///
    /// Returns an error if the bound address cannot be read back.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` flips, then drain the in-flight
    /// ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop terminates unexpectedly; the
    /// supervisor treats that as this adapter's fatal error.
    pub async fn serve(self, engine: Engine, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr = self.listener.local_addr()?;
        info!("RPC listening on {addr}");

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted.context("RPC accept loop failed")?;
                    let engine = engine.clone();
                    let shutdown = shutdown.clone();
                    connections.spawn(async move {
                        if let Err(err) = handle_connection(stream, engine, shutdown).await {
                            debug!("RPC connection {peer}: {err}");
                        }
                    });
                }
                _ = shutdown.changed() => break,
            }
        }

        info!("RPC server shutting down");
        while connections.join_next().await.is_some() {}
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    engine: Engine,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let response = dispatch(&engine, &line).await;
                let mut payload = serde_json::to_vec(&response)?;
                payload.push(b'\n');
                writer.write_all(&payload).await?;
            }
            _ = shutdown.changed() => break,
        }
    }

    Ok(())
}

async fn dispatch(engine: &Engine, line: &str) -> Response {
    let request: wire::Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            debug!("malformed RPC request: {err}");
            return Response::error(None, ErrorCode::InvalidRequest, "malformed request");
        }
    };

    match request.method.as_str() {
        "validate" => {
            let Some(params) = request.params else {
                return Response::error(request.id, ErrorCode::InvalidRequest, "missing params");
            };
            match engine
                .validate(&params.access_token, &params.refresh_token)
                .await
            {
                Ok(pair) => Response::result(
                    request.id,
                    TokenPairWire {
                        access_token: pair.access,
                        refresh_token: pair.refresh,
                    },
                ),
                Err(err) => Response::error(request.id, error_code(&err), &error_message(&err)),
            }
        }
        other => Response::error(
            request.id,
            ErrorCode::InvalidRequest,
            &format!("unknown method: {other}"),
        ),
    }
}

fn error_code(err: &session::Error) -> ErrorCode {
    match err {
        session::Error::InvalidToken => ErrorCode::InvalidToken,
        session::Error::SessionExpired => ErrorCode::SessionExpired,
        _ => ErrorCode::Internal,
    }
}

fn error_message(err: &session::Error) -> String {
    match err {
        session::Error::InvalidToken | session::Error::SessionExpired => err.to_string(),
        _ => "internal error".to_string(),
    }
}
