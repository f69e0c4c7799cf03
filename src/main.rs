use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use smsc3::config::Config;
use smsc3::http::HttpServer;
use smsc3::registry::Registry;
use smsc3::server::SmppServer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let registry = Arc::new(Registry::new());

    // A listener that cannot bind is fatal.
    let smpp = match SmppServer::bind(&config, Arc::clone(&registry)).await {
        Ok(server) => server,
        Err(e) => {
            error!("could not listen SMPP: {e}");
            std::process::exit(1);
        }
    };
    let http = match HttpServer::bind(&config, Arc::clone(&registry)).await {
        Ok(server) => server,
        Err(e) => {
            error!("could not listen HTTP: {e}");
            std::process::exit(1);
        }
    };

    let smpp_task = tokio::spawn(smpp.run());
    let http_task = tokio::spawn(http.run());

    tokio::select! {
        _ = shutdown_signal() => {
            registry.stop().await;
            info!("bye");
        }
        _ = smpp_task => {
            error!("smpp server exited unexpectedly");
            std::process::exit(1);
        }
        result = http_task => {
            match result {
                Ok(Err(e)) => error!("http server: {e}"),
                _ => error!("http server exited unexpectedly"),
            }
            std::process::exit(1);
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
