// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! The minimal storefront backend.
//!
//! All authoritative data lives on chain; this server only hands out the
//! fixed currency-conversion pair and a health check.

use anyhow::Result;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use std::convert::Infallible;
use std::net::SocketAddr;

use crate::types::ExchangeRate;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
}

pub struct RateServer {
    addr: SocketAddr,
    rx_shutdown: broadcast::Receiver<()>,
}

impl RateServer {
    pub fn new(addr: SocketAddr, rx_shutdown: broadcast::Receiver<()>) -> Self {
        Self { addr, rx_shutdown }
    }

    pub async fn serve(mut self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Listening on http://{}", self.addr);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (tcp, _) = match accepted {
                        Ok(pair) => pair,
                        Err(err) => {
                            warn!("Failed to accept connection: {err}");
                            continue;
                        }
                    };
                    let io = TokioIo::new(tcp);
                    tokio::task::spawn(async move {
                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service_fn(handle))
                            .await
                        {
                            warn!("Error serving connection: {err:?}");
                        }
                    });
                },
                _ = self.rx_shutdown.recv() => {
                    info!("Rate server shutting down");
                    return Ok(());
                },
            }
        }
    }
}

async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/api/exchange-rate") => json_response(&ExchangeRate {
            eth_to_kes: 133_333.0,
            kes_to_eth: 0.000_007_5,
        }),
        (&Method::GET, "/api/health") => json_response(&Health {
            status: "ok",
            message: "Blockchain ticketing API is running",
        }),
        _ => not_found(),
    };
    Ok(response)
}

fn json_response(value: &impl Serialize) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(_) => {
            let mut response =
                Response::new(Full::new(Bytes::from_static(b"Internal server error")));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn not_found() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"not found")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
