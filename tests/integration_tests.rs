mod common;

use common::{MockBridge, GREETING, PING_NAME, SILENT_NAME, TAKEN_ID, UNKNOWN_NAME};
use i2p_sam::net::{I2pAddr, I2pDatagramSocket, I2pListener, I2pSocketAddr, I2pStream};
use i2p_sam::sam::TRANSIENT;
use i2p_sam::{
    SamConfig, SamConnection, SamError, SamOptions, Session, SessionStyle, SignatureType,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_handshake_negotiates_version() {
    let bridge = MockBridge::start().await;

    let conn = assert_ok!(SamConnection::connect(bridge.addr).await);

    assert_eq!(conn.version(), "3.1");
    assert_eq!(conn.sam_api(), bridge.addr);
    assert_eq!(bridge.commands(), vec!["HELLO VERSION MIN=3.0 MAX=3.3"]);
}

#[tokio::test]
async fn test_naming_lookup() {
    let bridge = MockBridge::start().await;
    let mut conn = SamConnection::connect(bridge.addr).await.unwrap();

    let dest = assert_ok!(conn.naming_lookup("example.i2p").await);
    assert_eq!(dest, common::peer_dest());

    let err = assert_err!(conn.naming_lookup(UNKNOWN_NAME).await);
    assert!(matches!(err, SamError::KeyNotFound(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_ping_is_answered_while_waiting_for_reply() {
    let bridge = MockBridge::start().await;
    let mut conn = SamConnection::connect(bridge.addr).await.unwrap();

    let dest = assert_ok!(conn.naming_lookup(PING_NAME).await);

    assert_eq!(dest, common::peer_dest());
    assert!(bridge.commands().contains(&"PONG 42".to_string()));
}

#[tokio::test]
async fn test_reply_timeout() {
    let bridge = MockBridge::start().await;
    let mut conn = SamConnection::connect_timeout(bridge.addr, Some(Duration::from_millis(100)))
        .await
        .unwrap();

    let err = assert_err!(conn.naming_lookup(SILENT_NAME).await);
    assert!(matches!(err, SamError::ReplyTimeout(_)));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_generate_destination() {
    let bridge = MockBridge::start().await;
    let mut conn = SamConnection::connect(bridge.addr).await.unwrap();

    let keys = assert_ok!(
        conn.generate_destination(SignatureType::EcdsaSha256P256)
            .await
    );

    assert_eq!(keys.public, common::peer_dest());
    assert!(keys.secret.starts_with(&keys.public));
    assert_eq!(keys.signature_type, SignatureType::EcdsaSha256P256);
    assert!(bridge
        .commands()
        .contains(&"DEST GENERATE SIGNATURE_TYPE=ECDSA_SHA256_P256".to_string()));

    let addr = assert_ok!(I2pAddr::from_b64(&keys.public));
    assert!(addr.is_b32());
}

#[tokio::test]
async fn test_transient_session() {
    let bridge = MockBridge::start().await;

    let session = assert_ok!(Session::transient(bridge.addr).await);

    assert_eq!(session.local_dest(), common::local_dest());
    assert_eq!(session.style(), SessionStyle::Stream);
    assert!(session.nickname().starts_with("i2psam-"));

    let create = bridge.commands_starting_with("SESSION CREATE");
    assert_eq!(create.len(), 1);
    let expected = format!(
        "SESSION CREATE STYLE=STREAM ID={} DESTINATION=TRANSIENT SIGNATURE_TYPE=EdDSA_SHA512_Ed25519",
        session.nickname()
    );
    assert!(create[0].starts_with(&expected), "{}", create[0]);
    assert!(create[0].contains("i2cp.leaseSetEncType=4,0"));
    assert!(bridge
        .commands()
        .contains(&"NAMING LOOKUP NAME=ME".to_string()));
}

#[tokio::test]
async fn test_persistent_session_does_not_send_signature_type() {
    let bridge = MockBridge::start().await;

    assert_ok!(
        Session::create(
            bridge.addr,
            "PRIVATEKEY",
            "persistent",
            SessionStyle::Stream,
            &SamOptions::bare(),
        )
        .await
    );

    assert_eq!(
        bridge.commands_starting_with("SESSION CREATE"),
        vec!["SESSION CREATE STYLE=STREAM ID=persistent DESTINATION=PRIVATEKEY"]
    );
}

#[tokio::test]
async fn test_duplicated_session_id() {
    let bridge = MockBridge::start().await;

    let err = assert_err!(
        Session::create(
            bridge.addr,
            TRANSIENT,
            TAKEN_ID,
            SessionStyle::Stream,
            &SamOptions::default(),
        )
        .await
    );

    match err {
        SamError::DuplicatedId(message) => assert_eq!(message, "ID already in use"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_connect_echo() {
    let bridge = MockBridge::start().await;

    let mut stream = assert_ok!(I2pStream::connect_via(bridge.addr, "example.i2p:80").await);
    assert_eq!(stream.peer_addr().port(), 80);
    assert_eq!(stream.peer_addr().dest().as_str(), common::peer_dest());

    stream.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");

    let connect = bridge.commands_starting_with("STREAM CONNECT");
    assert_eq!(connect.len(), 1);
    assert!(connect[0].ends_with(&format!(
        "DESTINATION={} SILENT=false TO_PORT=80",
        common::peer_dest()
    )));
}

#[tokio::test]
async fn test_stream_connect_unreachable_peer() {
    let bridge = MockBridge::start().await;
    let session = Session::transient(bridge.addr).await.unwrap();

    let dest = common::unreachable_dest();
    let err = assert_err!(I2pStream::connect_with_session(&session, (dest.as_str(), 80)).await);

    assert!(matches!(err, SamError::CantReachPeer(ref m) if m == "no route"));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_connect_falls_back_to_next_address() {
    let bridge = MockBridge::start().await;
    let unreachable = I2pSocketAddr::new(I2pAddr::new(&common::unreachable_dest()), 80);
    let reachable = I2pSocketAddr::new(I2pAddr::new("example.i2p"), 80);
    let addrs = [unreachable, reachable];

    let mut stream = assert_ok!(I2pStream::connect_via(bridge.addr, &addrs[..]).await);
    assert_eq!(stream.peer_addr().dest().as_str(), common::peer_dest());
    assert_eq!(bridge.commands_starting_with("STREAM CONNECT").len(), 2);

    stream.write_all(b"second").await.unwrap();
    let mut buf = [0u8; 6];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"second");
}

#[tokio::test]
async fn test_connect_reports_last_error() {
    let bridge = MockBridge::start().await;
    let gone = I2pSocketAddr::new(I2pAddr::new(&common::unreachable_dest()), 80);
    let addrs = [gone.clone(), gone];

    let err = assert_err!(I2pStream::connect_via(bridge.addr, &addrs[..]).await);
    assert!(matches!(err, SamError::CantReachPeer(_)));
    assert_eq!(bridge.commands_starting_with("STREAM CONNECT").len(), 2);
}

#[tokio::test]
async fn test_connect_without_addresses() {
    let bridge = MockBridge::start().await;
    let none: &[I2pSocketAddr] = &[];

    let err = assert_err!(I2pStream::connect_via(bridge.addr, none).await);
    assert!(matches!(err, SamError::UnresolvableAddress));
    assert!(bridge.commands().is_empty());
}

#[tokio::test]
async fn test_connect_rejects_address_without_port() {
    let bridge = MockBridge::start().await;

    let err = assert_err!(I2pStream::connect_via(bridge.addr, "example.i2p").await);

    assert!(matches!(err, SamError::InvalidAddress(_)));
    assert!(bridge.commands().is_empty());
}

#[tokio::test]
async fn test_listener_accept() {
    let bridge = MockBridge::start().await;
    let listener = I2pListener::bind_via(bridge.addr).await.unwrap();
    assert_eq!(
        listener.local_addr(),
        I2pSocketAddr::new(I2pAddr::new(&common::local_dest()), 0)
    );

    let (stream, peer) = assert_ok!(listener.accept().await);

    let expected = I2pAddr::from_b64(&common::peer_dest()).unwrap();
    assert_eq!(peer, I2pSocketAddr::new(expected, 1234));

    // the greeting arrives in the same segment as the peer header
    let mut reader = BufReader::new(stream);
    let mut greeting = String::new();
    reader.read_line(&mut greeting).await.unwrap();
    assert_eq!(greeting.as_bytes(), GREETING);

    reader.get_mut().write_all(b"echo me\n").await.unwrap();
    let mut echoed = String::new();
    reader.read_line(&mut echoed).await.unwrap();
    assert_eq!(echoed, "echo me\n");

    let accept = bridge.commands_starting_with("STREAM ACCEPT");
    assert_eq!(
        accept,
        vec![format!(
            "STREAM ACCEPT ID={} SILENT=false",
            listener.session().nickname()
        )]
    );
}

#[tokio::test]
async fn test_datagram_round_trip() {
    let bridge = MockBridge::start().await;
    let mut socket = assert_ok!(
        I2pDatagramSocket::bind_with(
            bridge.addr,
            TRANSIENT,
            &SamOptions::default(),
            bridge.udp_port,
        )
        .await
    );
    let nickname = socket.session().nickname().to_string();

    let create = bridge.commands_starting_with("SESSION CREATE");
    assert!(create[0].starts_with(&format!(
        "SESSION CREATE STYLE=DATAGRAM ID={} DESTINATION=TRANSIENT PORT=",
        nickname
    )));
    assert!(create[0].contains("HOST=127.0.0.1"));

    let sent = assert_ok!(socket.send_to(b"ping", ("peer.i2p", 5)).await);
    assert_eq!(sent, 4);

    let mut buf = [0u8; 32];
    let (n, from) = assert_ok!(socket.recv_from(&mut buf).await);
    assert_eq!(&buf[..n], b"ping");
    assert_eq!(from, I2pSocketAddr::new(I2pAddr::new(&common::peer_dest()), 5));
    assert!(bridge.commands().contains(&format!(
        "3.0 {} {} TO_PORT=5",
        nickname,
        common::peer_dest()
    )));

    // replying to the returned address skips the naming lookup
    socket.connect(&from).unwrap();
    assert_ok!(socket.send(b"pong").await);
    let n = assert_ok!(socket.recv(&mut buf).await);
    assert_eq!(&buf[..n], b"pong");
}

#[tokio::test]
async fn test_datagram_send_without_peer() {
    let bridge = MockBridge::start().await;
    let socket = I2pDatagramSocket::bind_with(
        bridge.addr,
        TRANSIENT,
        &SamOptions::default(),
        bridge.udp_port,
    )
    .await
    .unwrap();

    let err = assert_err!(socket.send(b"nowhere").await);
    assert!(matches!(err, SamError::UnresolvableAddress));
}

#[tokio::test]
async fn test_datagram_peek_leaves_datagram_queued() {
    let bridge = MockBridge::start().await;
    let socket = I2pDatagramSocket::bind_with(
        bridge.addr,
        TRANSIENT,
        &SamOptions::default(),
        bridge.udp_port,
    )
    .await
    .unwrap();
    socket.send_to(b"twice", ("peer.i2p", 9)).await.unwrap();

    let mut buf = [0u8; 16];
    let (n, peeked_from) = assert_ok!(socket.peek_from(&mut buf).await);
    assert_eq!(&buf[..n], b"twice");

    let mut buf = [0u8; 16];
    let (n, from) = assert_ok!(socket.recv_from(&mut buf).await);
    assert_eq!(&buf[..n], b"twice");
    assert_eq!(from, peeked_from);
    assert_eq!(from.port(), 9);
}

#[tokio::test]
async fn test_configured_datagram_socket() {
    let bridge = MockBridge::start().await;
    let config = SamConfig::from_toml_str(&format!(
        "[bridge]\nendpoint = \"{}\"\nudp_port = {}\nreply_timeout_seconds = 5\n\n[session]\nnickname = \"dgram\"\nstyle = \"datagram\"\n",
        bridge.addr, bridge.udp_port
    ))
    .unwrap();

    let socket = assert_ok!(config.datagram_socket(TRANSIENT).await);
    assert_eq!(socket.session().nickname(), "dgram");
    assert_eq!(socket.session().reply_timeout(), Some(Duration::from_secs(5)));

    // only reaches the bridge if the configured udp_port is used
    socket.send_to(b"cfg", ("peer.i2p", 3)).await.unwrap();
    let mut buf = [0u8; 8];
    let (n, _) = assert_ok!(socket.recv_from(&mut buf).await);
    assert_eq!(&buf[..n], b"cfg");
}
