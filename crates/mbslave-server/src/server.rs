use crate::connection::Connection;
use crate::dispatch::Dispatch;
use crate::ServerError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Listener configuration. Defaults follow the protocol (port 502) and keep
/// a 30 s idle timeout and a 10 s shutdown grace period.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    pub idle_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 502,
            max_connections: 64,
            idle_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Requests a graceful stop of the server that created it. Cheap to clone
/// and safe to trigger from any task; repeated triggers are no-ops.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: Arc<watch::Sender<bool>>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// TCP listener that runs one [`Connection`] task per accepted socket.
pub struct Server<D> {
    listener: TcpListener,
    dispatch: Arc<D>,
    config: ServerConfig,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<D: Dispatch> Server<D> {
    pub async fn bind(config: ServerConfig, dispatch: D) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr()).await?;
        info!(addr = %listener.local_addr()?, "modbus tcp slave listening");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            listener,
            dispatch: Arc::new(dispatch),
            config,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Accept connections until the handle triggers shutdown, then stop
    /// accepting, let in-flight handlers drain for the grace period and
    /// abort whatever is left.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let limiter = Arc::new(Semaphore::new(self.config.max_connections));
        let mut workers: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                accepted = self.listener.accept() => {
                    let (socket, peer) = accepted?;
                    let Ok(permit) = Arc::clone(&limiter).try_acquire_owned() else {
                        warn!(
                            %peer,
                            limit = self.config.max_connections,
                            "connection limit reached, refusing"
                        );
                        drop(socket);
                        continue;
                    };
                    debug!(%peer, "accepted connection");

                    let connection = Connection::new(
                        socket,
                        peer,
                        Arc::clone(&self.dispatch),
                        self.config.idle_timeout,
                        self.shutdown_rx.clone(),
                    );
                    workers.spawn(async move {
                        let _permit = permit;
                        if let Err(err) = connection.run().await {
                            warn!(%peer, error = %err, "connection ended with error");
                        }
                    });
                }
                // Reap finished handlers so the set does not grow unbounded.
                Some(_) = workers.join_next(), if !workers.is_empty() => {}
            }
        }

        // Release the bound port before draining handlers.
        drop(self.listener);

        let drained = timeout(self.config.shutdown_grace, async {
            while workers.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                grace = ?self.config.shutdown_grace,
                remaining = workers.len(),
                "grace period elapsed, aborting remaining connections"
            );
            workers.shutdown().await;
        }

        info!("modbus tcp slave stopped");
        Ok(())
    }
}
