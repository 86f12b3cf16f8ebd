use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tinymq_core::crypto::{encrypt_password, DEFAULT_KEY};
use tinymq_core::protocol::{
    ConnectPacket, Frame, PacketDecoder, PacketEncoder, PacketType, PingReqPacket, PublishPacket,
    SubscribePacket,
};
use tinymq_tokio::codec::read_frame;
use tinymq_tokio::{AuthConfig, BrokerConfig, BrokerServer, FrameError, SubscriptionRegistry};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

const TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_PERIOD: Duration = Duration::from_millis(300);

async fn start_broker(config: BrokerConfig) -> (SocketAddr, Arc<SubscriptionRegistry>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = BrokerServer::new(config);
    let registry = Arc::clone(server.registry());
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    (addr, registry)
}

fn auth_config(allow_anonymous: bool) -> BrokerConfig {
    BrokerConfig {
        auth: AuthConfig {
            enabled: true,
            username: "admin".to_string(),
            password: encrypt_password("secret", &DEFAULT_KEY).unwrap(),
            allow_anonymous,
            private_topics: "admin/commands, system/config".to_string(),
            ..AuthConfig::default()
        },
        ..BrokerConfig::default()
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    timeout(TIMEOUT, async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    async fn open(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self { stream }
    }

    /// Connect and return the CONNACK return code
    async fn connect(addr: SocketAddr, packet: ConnectPacket) -> (Self, u8) {
        let mut client = Self::open(addr).await;
        client.send(&packet.encode().unwrap()).await;
        let connack = client.next_frame().await;
        assert_eq!(connack.packet_type, PacketType::ConnAck);
        assert_eq!(&connack.body[..1], &[0x00]);
        let return_code = connack.body[1];
        (client, return_code)
    }

    async fn connect_anonymous(addr: SocketAddr, client_id: &str) -> Self {
        let (client, return_code) = Self::connect(addr, ConnectPacket::new(client_id)).await;
        assert_eq!(return_code, 0x00);
        client
    }

    async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    async fn next_frame(&mut self) -> Frame {
        timeout(TIMEOUT, read_frame(&mut self.stream))
            .await
            .expect("no frame in time")
            .unwrap()
    }

    /// Subscribe and return the granted code from SUBACK
    async fn subscribe(&mut self, packet_id: u16, topic: &str) -> u8 {
        self.send(&SubscribePacket::new(packet_id, topic).encode().unwrap())
            .await;
        let suback = self.next_frame().await;
        assert_eq!(suback.packet_type, PacketType::SubAck);
        assert_eq!(&suback.body[..2], &packet_id.to_be_bytes());
        suback.body[2]
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) {
        let frame = PublishPacket::new(topic, payload.to_vec()).encode().unwrap();
        self.send(&frame).await;
    }

    async fn ping(&mut self) {
        self.send(&PingReqPacket.encode().unwrap()).await;
        let frame = self.next_frame().await;
        assert_eq!(frame.packet_type, PacketType::PingResp);
    }

    async fn expect_publish(&mut self) -> PublishPacket {
        let frame = self.next_frame().await;
        assert_eq!(frame.packet_type, PacketType::Publish);
        assert_eq!(frame.flags, 0);
        PublishPacket::decode(&frame.body).unwrap()
    }

    async fn expect_nothing(&mut self) {
        let result = timeout(QUIET_PERIOD, read_frame(&mut self.stream)).await;
        assert!(result.is_err(), "unexpected frame: {:?}", result);
    }

    async fn expect_closed(&mut self) {
        let mut buf = [0u8; 16];
        let n = timeout(TIMEOUT, self.stream.read(&mut buf))
            .await
            .expect("connection not closed in time")
            .unwrap_or(0);
        assert_eq!(n, 0, "expected end of stream");
    }
}

// ===== PUBLISH / SUBSCRIBE =====

#[tokio::test]
async fn test_publish_reaches_subscriber() {
    let (addr, _registry) = start_broker(BrokerConfig::default()).await;

    let mut subscriber = TestClient::connect_anonymous(addr, "sub").await;
    assert_eq!(subscriber.subscribe(1, "test/topic").await, 0x00);

    let mut publisher = TestClient::connect_anonymous(addr, "pub").await;
    publisher.publish("test/topic", b"hello-mqtt").await;

    let message = subscriber.expect_publish().await;
    assert_eq!(message.topic, "test/topic");
    assert_eq!(&message.payload[..], b"hello-mqtt");
}

#[tokio::test]
async fn test_binary_and_json_payloads_arrive_unchanged() {
    let (addr, _registry) = start_broker(BrokerConfig::default()).await;

    let mut subscriber = TestClient::connect_anonymous(addr, "sub").await;
    subscriber.subscribe(1, "data").await;
    let mut publisher = TestClient::connect_anonymous(addr, "pub").await;

    let binary = [0x00, 0x01, 0x02, 0xFF, 0xFE, 0xFD, 0x00, 0x00];
    publisher.publish("data", &binary).await;
    assert_eq!(&subscriber.expect_publish().await.payload[..], &binary);

    let json = br#"{"sensor":"t1","value":21.5}"#;
    publisher.publish("data", json).await;
    assert_eq!(&subscriber.expect_publish().await.payload[..], json);

    // large enough for a 2-byte remaining length
    let large: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
    publisher.publish("data", &large).await;
    assert_eq!(&subscriber.expect_publish().await.payload[..], &large[..]);
}

#[tokio::test]
async fn test_client_without_subscription_receives_nothing() {
    let (addr, _registry) = start_broker(BrokerConfig::default()).await;

    let mut subscriber = TestClient::connect_anonymous(addr, "sub").await;
    subscriber.subscribe(1, "a").await;
    let mut bystander = TestClient::connect_anonymous(addr, "idle").await;
    let mut publisher = TestClient::connect_anonymous(addr, "pub").await;

    publisher.publish("a", b"x").await;
    publisher.publish("b", b"y").await;

    assert_eq!(&subscriber.expect_publish().await.payload[..], b"x");
    subscriber.expect_nothing().await;
    bystander.expect_nothing().await;
}

#[tokio::test]
async fn test_ping() {
    let (addr, _registry) = start_broker(BrokerConfig::default()).await;
    let mut client = TestClient::connect_anonymous(addr, "pinger").await;
    client.ping().await;
    client.ping().await;
}

// ===== CLEANUP =====

#[tokio::test]
async fn test_disconnected_subscriber_is_removed() {
    let (addr, registry) = start_broker(BrokerConfig::default()).await;

    let mut subscriber = TestClient::connect_anonymous(addr, "sub").await;
    subscriber.subscribe(1, "t").await;
    subscriber.subscribe(2, "u").await;
    assert_eq!(registry.subscriber_count("t"), 1);

    drop(subscriber);
    wait_until(|| registry.subscriber_count("t") == 0 && registry.subscriber_count("u") == 0)
        .await;

    let mut publisher = TestClient::connect_anonymous(addr, "pub").await;
    publisher.publish("t", b"nobody listening").await;
    publisher.ping().await;
    assert_eq!(registry.topic_count(), 2);
}

#[tokio::test]
async fn test_listener_survives_broken_connections() {
    let (addr, _registry) = start_broker(BrokerConfig::default()).await;

    let mut broken = TestClient::open(addr).await;
    broken.send(&[0x10, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]).await;
    broken.expect_closed().await;

    let mut early = TestClient::open(addr).await;
    early.send(&PingReqPacket.encode().unwrap()).await;
    early.expect_closed().await;

    let mut client = TestClient::connect_anonymous(addr, "after").await;
    client.ping().await;
}

#[tokio::test]
async fn test_connect_with_username_flag_but_no_username() {
    let (addr, _registry) = start_broker(auth_config(true)).await;

    let mut client = TestClient::open(addr).await;
    let body = [
        0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x80, 0x00, 0x3C, 0x00, 0x01, b'c',
    ];
    let mut frame = vec![0x10, body.len() as u8];
    frame.extend_from_slice(&body);
    client.send(&frame).await;

    // no CONNACK, the server drops the connection
    client.expect_closed().await;
}

// ===== AUTHENTICATION AND AUTHORIZATION =====

#[tokio::test]
async fn test_valid_credentials_are_accepted() {
    let (addr, _registry) = start_broker(auth_config(false)).await;
    let packet = ConnectPacket::new("admin-client").with_credentials("admin", &b"secret"[..]);
    let (mut client, return_code) = TestClient::connect(addr, packet).await;
    assert_eq!(return_code, 0x00);
    client.ping().await;
}

#[tokio::test]
async fn test_bad_credentials_are_refused_and_closed() {
    let (addr, _registry) = start_broker(auth_config(true)).await;
    let packet = ConnectPacket::new("intruder").with_credentials("admin", &b"guess"[..]);
    let (mut client, return_code) = TestClient::connect(addr, packet).await;
    assert_eq!(return_code, 0x04);
    client.expect_closed().await;
}

#[tokio::test]
async fn test_anonymous_refused_when_not_allowed() {
    let (addr, _registry) = start_broker(auth_config(false)).await;
    let (mut client, return_code) = TestClient::connect(addr, ConnectPacket::new("anon")).await;
    assert_eq!(return_code, 0x05);
    client.expect_closed().await;
}

#[tokio::test]
async fn test_anonymous_publish_to_private_topic_is_dropped() {
    let (addr, _registry) = start_broker(auth_config(true)).await;

    let admin = ConnectPacket::new("admin-sub").with_credentials("admin", &b"secret"[..]);
    let (mut subscriber, return_code) = TestClient::connect(addr, admin).await;
    assert_eq!(return_code, 0x00);
    assert_eq!(subscriber.subscribe(1, "admin/commands").await, 0x00);

    let mut anonymous = TestClient::connect_anonymous(addr, "anon").await;
    anonymous.publish("admin/commands", b"shutdown").await;

    // still connected, and nothing was forwarded
    anonymous.ping().await;
    subscriber.expect_nothing().await;

    let admin = ConnectPacket::new("admin-pub").with_credentials("admin", &b"secret"[..]);
    let (mut publisher, _) = TestClient::connect(addr, admin).await;
    publisher.publish("admin/commands", b"status").await;
    assert_eq!(&subscriber.expect_publish().await.payload[..], b"status");
}

#[tokio::test]
async fn test_anonymous_subscribe_to_private_topic_is_refused() {
    let (addr, registry) = start_broker(auth_config(true)).await;

    let mut anonymous = TestClient::connect_anonymous(addr, "anon").await;
    assert_eq!(anonymous.subscribe(9, "system/config/db").await, 0x80);
    assert_eq!(anonymous.subscribe(10, "public/data").await, 0x00);
    assert_eq!(registry.subscriber_count("system/config/db"), 0);
    assert_eq!(registry.subscriber_count("public/data"), 1);
}

#[tokio::test]
async fn test_private_topic_needs_principal_even_with_auth_disabled() {
    let config = BrokerConfig {
        auth: AuthConfig {
            private_topics: "admin".to_string(),
            ..AuthConfig::default()
        },
        ..BrokerConfig::default()
    };
    let (addr, _registry) = start_broker(config).await;

    let mut client = TestClient::connect_anonymous(addr, "anon").await;
    assert_eq!(client.subscribe(1, "admin/x").await, 0x80);
    assert_eq!(client.subscribe(2, "adminx").await, 0x00);
}

#[tokio::test]
async fn test_read_frame_reports_closed_connection() {
    let (addr, _registry) = start_broker(auth_config(false)).await;
    let (mut client, _) = TestClient::connect(addr, ConnectPacket::new("anon")).await;
    let result = timeout(TIMEOUT, read_frame(&mut client.stream)).await.unwrap();
    assert!(matches!(result, Err(FrameError::ConnectionClosed)));
}
