use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tinymq_core::{AuthGate, BrokerConfig};
use tokio::net::{TcpListener, TcpStream};

use crate::handler::handle_connection;
use crate::registry::SubscriptionRegistry;
use crate::session::Session;

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin the loop
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// A Tokio-based MQTT broker server
pub struct BrokerServer {
    config: BrokerConfig,
    gate: Arc<AuthGate>,
    registry: Arc<SubscriptionRegistry>,
}

impl BrokerServer {
    /// Create a server; the configured password is decrypted here
    pub fn new(config: BrokerConfig) -> Self {
        let gate = AuthGate::from_config(&config.auth);
        Self {
            config,
            gate: Arc::new(gate),
            registry: Arc::new(SubscriptionRegistry::new()),
        }
    }

    /// Get a handle to the shared subscription registry
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Bind the configured address and serve until the process ends
    pub async fn run(&self) -> io::Result<()> {
        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;
        debug!("Bound {}", bind_addr);
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener.
    ///
    /// Only returns if the listener's local address cannot be read; accept
    /// failures are logged and the loop carries on.
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        let local_addr = listener.local_addr()?;
        info!("MQTT broker started on port {}", local_addr.port());
        log_connect_urls(local_addr);

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => self.spawn_connection(socket, peer_addr),
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    fn spawn_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let peer_addr = peer_addr.to_string();
        info!("Accepted connection from {}", peer_addr);
        if let Err(e) = socket.set_nodelay(true) {
            debug!("{}: could not set TCP_NODELAY: {}", peer_addr, e);
        }

        let (reader, writer) = socket.into_split();
        let session = Arc::new(Session::new(peer_addr, Box::new(writer)));
        tokio::spawn(handle_connection(
            reader,
            session,
            Arc::clone(&self.gate),
            Arc::clone(&self.registry),
        ));
    }
}

fn log_connect_urls(local_addr: SocketAddr) {
    let port = local_addr.port();
    if local_addr.ip().is_unspecified() {
        info!("Connect via: tcp://localhost:{}", port);
        info!("All interfaces: tcp://{}:{}", local_addr.ip(), port);
    } else {
        info!("Connect via: tcp://{}", local_addr);
    }
}
