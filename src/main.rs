use anyhow::Context;
use askfiles::{api, config, ingest::PipelineService, logging};
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_config();
    logging::init_tracing();
    let service = PipelineService::from_config(config::get_config())
        .context("Failed to initialize pipeline service")?;
    let app = api::create_router(Arc::new(service));

    let (listener, port) = bind_listener().await.context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

const PORT_SCAN: RangeInclusive<u16> = 4100..=4199;

/// Bind `SERVER_PORT` when configured, otherwise the first free port in `PORT_SCAN`.
async fn bind_listener() -> std::io::Result<(TcpListener, u16)> {
    match config::get_config().server_port {
        Some(port) => bind(port).await.map(|listener| (listener, port)),
        None => bind_first_free(PORT_SCAN).await,
    }
}

async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await
}

async fn bind_first_free(ports: RangeInclusive<u16>) -> std::io::Result<(TcpListener, u16)> {
    let (first, last) = (*ports.start(), *ports.end());
    for port in ports {
        match bind(port).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port in use");
            }
            Err(err) => return Err(err),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::AddrNotAvailable,
        format!("no free port in {first}-{last}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_skips_ports_in_use() {
        let taken = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .expect("ephemeral port");
        let port = taken.local_addr().expect("local addr").port();
        if port == u16::MAX {
            return;
        }

        let (_listener, bound) = bind_first_free(port..=port + 1)
            .await
            .expect("next port free");
        assert_eq!(bound, port + 1);
    }

    #[tokio::test]
    async fn scan_reports_exhausted_range() {
        let taken = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .expect("ephemeral port");
        let port = taken.local_addr().expect("local addr").port();

        let error = bind_first_free(port..=port).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AddrNotAvailable);
    }
}
