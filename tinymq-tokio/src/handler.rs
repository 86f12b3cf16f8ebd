use std::sync::Arc;

use log::{debug, info, warn};
use tinymq_core::payload;
use tinymq_core::protocol::{
    build_publish_frame, ConnAckPacket, ConnectPacket, ConnectReturnCode, Packet, PacketEncoder,
    PingRespPacket, PublishPacket, SubAckPacket, SubAckReturnCode, SubscribePacket,
};
use tinymq_core::AuthGate;
use tokio::io::AsyncRead;

use crate::codec::read_frame;
use crate::error::{BrokerError, FrameError};
use crate::registry::SubscriptionRegistry;
use crate::session::{Principal, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    AwaitingConnect,
    Connected(Principal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Get detailed packet info for logging
fn packet_details(packet: &Packet) -> String {
    match packet {
        Packet::Connect(c) => format!(
            "client_id={}, username={}, keep_alive={}",
            c.client_id,
            c.username.as_deref().unwrap_or("-"),
            c.keep_alive
        ),
        Packet::Publish(p) => format!("topic={}, payload_len={}", p.topic, p.payload.len()),
        Packet::Subscribe(s) => format!(
            "packet_id={}, topic={}, qos={}",
            s.packet_id, s.topic_filter, s.requested_qos
        ),
        Packet::PingReq | Packet::Unsupported(_) => String::new(),
    }
}

/// Decide the CONNACK return code and the principal for a CONNECT.
///
/// Credentials are only checked when auth is enabled and both are present.
/// With auth disabled the connection is anonymous even if a username was sent.
pub fn evaluate_connect(
    gate: &AuthGate,
    connect: &ConnectPacket,
) -> (ConnectReturnCode, Principal) {
    if !gate.is_auth_enabled() {
        return (ConnectReturnCode::Accepted, Principal::Anonymous);
    }
    match (connect.username.as_deref(), connect.password.as_deref()) {
        (Some(username), Some(password)) => {
            if gate.authenticate(Some(username), Some(password)) {
                (
                    ConnectReturnCode::Accepted,
                    Principal::User(username.to_string()),
                )
            } else {
                (ConnectReturnCode::BadUserNameOrPassword, Principal::Anonymous)
            }
        }
        _ if gate.allows_anonymous() => (ConnectReturnCode::Accepted, Principal::Anonymous),
        _ => (ConnectReturnCode::NotAuthorized, Principal::Anonymous),
    }
}

/// Shared collaborators of one connection
struct ConnectionContext {
    session: Arc<Session>,
    gate: Arc<AuthGate>,
    registry: Arc<SubscriptionRegistry>,
}

/// Drives one connection from CONNECT until the stream ends
pub struct ConnectionHandler<R> {
    reader: R,
    context: ConnectionContext,
    state: ConnectionState,
}

impl<R> ConnectionHandler<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        reader: R,
        session: Arc<Session>,
        gate: Arc<AuthGate>,
        registry: Arc<SubscriptionRegistry>,
    ) -> Self {
        Self {
            reader,
            context: ConnectionContext {
                session,
                gate,
                registry,
            },
            state: ConnectionState::AwaitingConnect,
        }
    }

    /// Read and dispatch packets in arrival order.
    ///
    /// Returns `Ok(())` when the connection was refused at CONNECT, otherwise
    /// the error that ended the loop (end of stream included).
    pub async fn run(&mut self) -> Result<(), BrokerError> {
        loop {
            let frame = read_frame(&mut self.reader).await?;
            let packet = Packet::decode(&frame)?;

            let id = self.context.session.id();
            let details = packet_details(&packet);
            if details.is_empty() {
                debug!("{}: Received {}", id, packet.packet_type());
            } else {
                debug!("{}: Received {} ({})", id, packet.packet_type(), details);
            }

            if self.dispatch(packet).await? == Flow::Close {
                return Ok(());
            }
        }
    }

    async fn dispatch(&mut self, packet: Packet) -> Result<Flow, BrokerError> {
        let principal = match &self.state {
            ConnectionState::AwaitingConnect => {
                return match packet {
                    Packet::Connect(connect) => self.handle_connect(connect).await,
                    _ => Err(BrokerError::ProtocolViolation {
                        reason: "first packet must be CONNECT",
                    }),
                };
            }
            ConnectionState::Connected(principal) => principal,
        };

        let context = &self.context;
        match packet {
            Packet::Connect(_) => {
                return Err(BrokerError::ProtocolViolation {
                    reason: "duplicate CONNECT",
                })
            }
            Packet::Publish(publish) => context.handle_publish(principal.name(), publish).await?,
            Packet::Subscribe(subscribe) => {
                context.handle_subscribe(principal.name(), subscribe).await?
            }
            Packet::PingReq => {
                context.session.send_frame(&PingRespPacket::FRAME).await?;
                debug!("{}: Sending PINGRESP", context.session.id());
            }
            Packet::Unsupported(packet_type) => {
                debug!(
                    "{}: Ignoring unsupported {} packet",
                    context.session.id(),
                    packet_type
                );
            }
        }
        Ok(Flow::Continue)
    }

    async fn handle_connect(&mut self, connect: ConnectPacket) -> Result<Flow, BrokerError> {
        let session = &self.context.session;
        let (return_code, principal) = evaluate_connect(&self.context.gate, &connect);

        let frame = ConnAckPacket::new(return_code).encode()?;
        session.send_frame(&frame).await?;

        if !return_code.is_accepted() {
            warn!(
                "{}: Refused client '{}': {}",
                session.id(),
                connect.client_id,
                return_code
            );
            return Ok(Flow::Close);
        }

        info!(
            "{}: Client '{}' connected as {}",
            session.id(),
            connect.client_id,
            principal
        );
        self.state = ConnectionState::Connected(principal);
        Ok(Flow::Continue)
    }
}

impl ConnectionContext {
    async fn handle_publish(
        &self,
        principal: Option<&str>,
        publish: PublishPacket,
    ) -> Result<(), BrokerError> {
        if !self.gate.can_publish(principal, &publish.topic) {
            // QoS 0 has no acknowledgment, so the sender is not told
            warn!(
                "{}: Publish to '{}' denied for {}",
                self.session.id(),
                publish.topic,
                principal.unwrap_or("anonymous")
            );
            return Ok(());
        }

        payload::log_publish(&publish.topic, &publish.payload, self.session.id());

        let frame = build_publish_frame(&publish.topic, &publish.payload)?;
        let delivered = self.registry.publish_to(&publish.topic, &frame).await;
        debug!(
            "{}: Forwarded '{}' to {} subscriber(s)",
            self.session.id(),
            publish.topic,
            delivered
        );
        Ok(())
    }

    async fn handle_subscribe(
        &self,
        principal: Option<&str>,
        subscribe: SubscribePacket,
    ) -> Result<(), BrokerError> {
        let return_code = if self.gate.can_subscribe(principal, &subscribe.topic_filter) {
            self.registry
                .subscribe(&subscribe.topic_filter, Arc::clone(&self.session));
            info!(
                "{}: Subscribed to '{}'",
                self.session.id(),
                subscribe.topic_filter
            );
            SubAckReturnCode::GrantedQos0
        } else {
            warn!(
                "{}: Subscribe to '{}' denied for {}",
                self.session.id(),
                subscribe.topic_filter,
                principal.unwrap_or("anonymous")
            );
            SubAckReturnCode::Failure
        };

        let frame = SubAckPacket::new(subscribe.packet_id, return_code).encode()?;
        self.session.send_frame(&frame).await?;
        Ok(())
    }
}

/// Removes a session's subscriptions exactly once, on normal exit through
/// [`SessionCleanup::finish`] or on drop if the handler task unwinds.
struct SessionCleanup {
    registry: Arc<SubscriptionRegistry>,
    session: Arc<Session>,
    released: bool,
}

impl SessionCleanup {
    fn new(registry: Arc<SubscriptionRegistry>, session: Arc<Session>) -> Self {
        Self {
            registry,
            session,
            released: false,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.unsubscribe_all(&self.session);
        }
    }

    async fn finish(mut self) {
        self.release();
        self.session.close().await;
    }
}

impl Drop for SessionCleanup {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle a single MQTT client connection
pub async fn handle_connection<R>(
    reader: R,
    session: Arc<Session>,
    gate: Arc<AuthGate>,
    registry: Arc<SubscriptionRegistry>,
) where
    R: AsyncRead + Unpin,
{
    let cleanup = SessionCleanup::new(Arc::clone(&registry), Arc::clone(&session));
    let mut handler = ConnectionHandler::new(reader, Arc::clone(&session), gate, registry);

    match handler.run().await {
        Ok(()) => info!("{}: Connection closed after refused CONNECT", session.id()),
        Err(BrokerError::Frame(FrameError::ConnectionClosed)) => {
            info!("{}: Client closed connection", session.id())
        }
        Err(BrokerError::Frame(e @ FrameError::TruncatedFrame { .. })) => {
            info!("{}: {}", session.id(), e)
        }
        Err(BrokerError::Frame(FrameError::Io(e))) | Err(BrokerError::Io(e)) => {
            info!("{}: Connection lost: {}", session.id(), e)
        }
        Err(e) => warn!("{}: Closing connection: {}", session.id(), e),
    }

    cleanup.finish().await;
}
