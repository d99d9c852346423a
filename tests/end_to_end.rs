//! End-to-end tests against a real relay on a loopback port

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use relay_chat::codec;
use relay_chat::{serve, AppError, ChatServer, Envelope, EnvelopeCodec};

type Conn = Framed<TcpStream, EnvelopeCodec>;

const WAIT: Duration = Duration::from_secs(5);

struct Relay {
    addr: std::net::SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), AppError>>,
}

async fn start_relay() -> Relay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (server, _actor) = ChatServer::start(256);
    let (stop, stopped) = oneshot::channel::<()>();

    let task = tokio::spawn(serve(listener, server, async move {
        let _ = stopped.await;
    }));

    Relay {
        addr,
        stop: Some(stop),
        task,
    }
}

async fn connect(relay: &Relay) -> (Conn, String) {
    let stream = TcpStream::connect(relay.addr).await.unwrap();
    let name = format!("User_{}", stream.local_addr().unwrap().port());
    (Framed::new(stream, EnvelopeCodec::new()), name)
}

async fn next(conn: &mut Conn) -> Envelope {
    timeout(WAIT, conn.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection closed")
        .expect("decode error")
}

async fn next_system(conn: &mut Conn) -> String {
    match next(conn).await {
        Envelope::System { message, timestamp } => {
            assert!(!timestamp.is_empty());
            message
        }
        other => panic!("expected system envelope, got {:?}", other),
    }
}

async fn next_chat(conn: &mut Conn) -> (String, String) {
    match next(conn).await {
        Envelope::Chat {
            sender,
            message,
            timestamp,
        } => {
            assert!(timestamp.is_some_and(|t| !t.is_empty()));
            (sender.expect("broadcast chat carries a sender"), message)
        }
        other => panic!("expected chat envelope, got {:?}", other),
    }
}

#[tokio::test]
async fn test_join_chat_leave_scenario() {
    let relay = start_relay().await;

    let (mut a, a_name) = connect(&relay).await;
    assert_eq!(
        next_system(&mut a).await,
        format!("Welcome to the chat! Your name is {}", a_name)
    );

    let (mut b, b_name) = connect(&relay).await;
    assert_eq!(
        next_system(&mut b).await,
        format!("Welcome to the chat! Your name is {}", b_name)
    );
    assert_eq!(next_system(&mut a).await, format!("{} joined the chat", b_name));

    b.send(Envelope::outbound_chat("hi")).await.unwrap();
    assert_eq!(next_chat(&mut a).await, (b_name.clone(), "hi".to_string()));
    // The sender gets its own echo
    assert_eq!(next_chat(&mut b).await, (b_name.clone(), "hi".to_string()));

    drop(b);
    assert_eq!(next_system(&mut a).await, format!("{} left the chat", b_name));

    // Exactly one leave notice: the next frame is A's own echo
    a.send(Envelope::outbound_chat("still here")).await.unwrap();
    assert_eq!(next_chat(&mut a).await, (a_name, "still here".to_string()));
}

#[tokio::test]
async fn test_rename_is_broadcast_and_applied() {
    let relay = start_relay().await;

    let (mut a, a_name) = connect(&relay).await;
    next_system(&mut a).await;
    let (mut b, b_name) = connect(&relay).await;
    next_system(&mut b).await;
    next_system(&mut a).await;

    a.send(Envelope::rename("Alice")).await.unwrap();
    let notice = format!("{} changed their name to Alice", a_name);
    assert_eq!(next_system(&mut a).await, notice);
    assert_eq!(next_system(&mut b).await, notice);

    // A client-asserted sender is ignored
    a.send(Envelope::Chat {
        sender: Some(b_name),
        message: "who am I".to_string(),
        timestamp: None,
    })
    .await
    .unwrap();
    assert_eq!(next_chat(&mut b).await, ("Alice".to_string(), "who am I".to_string()));
}

#[tokio::test]
async fn test_fragmented_and_malformed_frames() {
    let relay = start_relay().await;

    let (mut a, _) = connect(&relay).await;
    next_system(&mut a).await;

    let mut raw = TcpStream::connect(relay.addr).await.unwrap();
    let b_name = format!("User_{}", raw.local_addr().unwrap().port());
    next_system(&mut a).await;

    // Garbage is discarded without dropping the connection
    raw.write_all(b"this is not json\n").await.unwrap();

    let frame = codec::encode(&Envelope::outbound_chat("split frame")).unwrap();
    let (head, tail) = frame.split_at(10);
    raw.write_all(head).await.unwrap();
    raw.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    raw.write_all(tail).await.unwrap();

    assert_eq!(next_chat(&mut a).await, (b_name, "split frame".to_string()));
}

#[tokio::test]
async fn test_shutdown_drains_peers() {
    let mut relay = start_relay().await;

    let (mut a, a_name) = connect(&relay).await;
    next_system(&mut a).await;
    let (mut b, _) = connect(&relay).await;
    next_system(&mut b).await;
    next_system(&mut a).await;

    relay.stop.take().unwrap().send(()).unwrap();

    // Peers leave in join order; B still sees A go
    assert_eq!(next_system(&mut b).await, format!("{} left the chat", a_name));

    for conn in [&mut a, &mut b] {
        let end = timeout(WAIT, conn.next()).await.expect("timed out waiting for close");
        assert!(end.is_none());
    }

    timeout(WAIT, relay.task).await.unwrap().unwrap().unwrap();
}
