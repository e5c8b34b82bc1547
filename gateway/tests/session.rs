use accord_gateway::{
    handler::{MessageCreate, ReadyEvent, Resumed},
    Config, Intents, Outcome, Session, Stage,
};
use accord_http::Client;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{
    net::{TcpListener, TcpStream},
    time,
};
use tokio_tungstenite::{
    accept_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame},
    tungstenite::Message,
    WebSocketStream,
};

type ServerStream = WebSocketStream<TcpStream>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerStream {
    let (stream, _) = listener.accept().await.unwrap();

    accept_async(stream).await.unwrap()
}

async fn recv_json(ws: &mut ServerStream) -> Value {
    loop {
        match ws.next().await.expect("stream ended").expect("read failed") {
            Message::Text(json) => return serde_json::from_str(&json).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Receive the next payload of the wanted op, skipping interleaved
/// heartbeats.
async fn recv_op(ws: &mut ServerStream, op: u64) -> Value {
    loop {
        let value = recv_json(ws).await;

        if value["op"] == 1_u64 && op != 1 {
            continue;
        }

        assert_eq!(value["op"], op, "unexpected payload: {value}");

        return value;
    }
}

async fn send_json(ws: &mut ServerStream, value: &Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

fn hello(interval_ms: u64) -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": interval_ms}})
}

fn ready(session_id: &str, seq: u64) -> Value {
    json!({
        "op": 0,
        "s": seq,
        "t": "READY",
        "d": {
            "v": 10,
            "user": {"id": "1", "username": "bot", "discriminator": "0001", "bot": true},
            "guilds": [],
            "session_id": session_id,
            "application": {"id": "9"},
        },
    })
}

fn message_create(seq: u64, content: &str) -> Value {
    json!({
        "op": 0,
        "s": seq,
        "t": "MESSAGE_CREATE",
        "d": {
            "id": "10",
            "channel_id": "2",
            "author": {"id": "3", "username": "user", "discriminator": "0002"},
            "content": content,
        },
    })
}

fn new_session(url: &str, intents: Intents) -> Session {
    let config = Config::builder("test", intents).gateway_url(url).build();

    Session::new(Client::new("test"), config)
}

/// Accept one connection and walk it through hello/identify/ready.
async fn serve_new_session(
    listener: &TcpListener,
    interval_ms: u64,
    session_id: &str,
    seq: u64,
) -> (ServerStream, Value) {
    let mut ws = accept(listener).await;
    send_json(&mut ws, &hello(interval_ms)).await;
    let identify = recv_op(&mut ws, 2).await;
    send_json(&mut ws, &ready(session_id, seq)).await;

    (ws, identify)
}

#[tokio::test]
async fn connect_sends_identify_and_handles_ready() {
    let (listener, url) = bind().await;
    let session = new_session(&url, Intents::GUILDS);

    let ready_count = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&ready_count);
    session.on::<ReadyEvent, _>(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    session.on::<MessageCreate, _>(|_| {});

    let server =
        tokio::spawn(async move { serve_new_session(&listener, 5_000, "sess1", 1).await });

    session.connect().await.unwrap();
    let (_ws, identify) = server.await.unwrap();

    assert_eq!(identify["d"]["token"], "Bot test");
    assert_eq!(identify["d"]["large_threshold"], 250_u64);

    let intents = identify["d"]["intents"].as_u64().unwrap();
    assert_ne!(0, intents & Intents::GUILDS.bits(), "configured intent missing");
    assert_ne!(
        0,
        intents & Intents::GUILD_MESSAGES.bits(),
        "intent inferred from the handler missing"
    );

    assert_eq!(Stage::Connected, session.stage());
    assert_eq!(1, session.seq());
    assert_eq!(Some("sess1"), session.session_id().as_deref());

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(1, ready_count.load(Ordering::SeqCst));

    session.disconnect();
    assert!(matches!(session.wait().await, Outcome::Disconnect));
}

#[tokio::test]
async fn missed_heartbeat_ack_closes_and_resumes() {
    let (listener, url) = bind().await;
    let session = new_session(&url, Intents::empty());

    let server = tokio::spawn(async move {
        // First connection: never acknowledge any heartbeat.
        let (mut ws, _identify) = serve_new_session(&listener, 200, "sess1", 3).await;
        recv_op(&mut ws, 1).await;

        // The session declares the link dead and closes with its own
        // reconnect code.
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(frame))) => {
                    let frame = frame.expect("close carries a frame");
                    assert_eq!(4000, u16::from(frame.code));

                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => panic!("connection ended without a close frame"),
            }
        }

        // Second connection: the session resumes with preserved id and seq.
        let mut ws = accept(&listener).await;
        send_json(&mut ws, &hello(200)).await;
        let resume = recv_op(&mut ws, 6).await;
        assert_eq!(resume["d"]["session_id"], "sess1");
        assert_eq!(resume["d"]["seq"], 3_u64);

        send_json(&mut ws, &json!({"op": 0, "s": 4, "t": "RESUMED", "d": null})).await;

        ws
    });

    session.connect().await.unwrap();
    assert!(matches!(session.wait().await, Outcome::Reconnect));

    session.connect().await.unwrap();
    let _ws = server.await.unwrap();

    assert_eq!(Some("sess1"), session.session_id().as_deref());
    assert_eq!(4, session.seq(), "resume must not reset the sequence");

    session.disconnect();
}

#[tokio::test]
async fn invalid_session_on_resume_reidentifies() {
    let (listener, url) = bind().await;
    let session = new_session(&url, Intents::empty());

    let ready_count = Arc::new(AtomicUsize::new(0));
    let resumed_count = Arc::new(AtomicUsize::new(0));

    let count = Arc::clone(&ready_count);
    session.on::<ReadyEvent, _>(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });
    let count = Arc::clone(&resumed_count);
    session.on::<Resumed, _>(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let server = tokio::spawn(async move {
        let (mut ws, _identify) = serve_new_session(&listener, 5_000, "sess1", 1).await;

        // Force a reconnectable close.
        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Library(4009),
            reason: "".into(),
        })))
        .await
        .unwrap();

        // Second connection: reject the resume.
        let mut ws = accept(&listener).await;
        send_json(&mut ws, &hello(5_000)).await;
        recv_op(&mut ws, 6).await;
        send_json(&mut ws, &json!({"op": 9, "d": false})).await;

        // After about a second the session identifies afresh.
        let identify = recv_op(&mut ws, 2).await;
        send_json(&mut ws, &ready("sess2", 7)).await;

        (ws, identify)
    });

    session.connect().await.unwrap();
    assert!(matches!(session.wait().await, Outcome::Reconnect));

    time::sleep(Duration::from_millis(50)).await;
    let before = ready_count.load(Ordering::SeqCst);

    let started = time::Instant::now();
    session.connect().await.unwrap();
    assert!(
        started.elapsed() >= Duration::from_millis(900),
        "fresh identify was not delayed after the invalid session"
    );

    let (_ws, _identify) = server.await.unwrap();
    assert_eq!(Some("sess2"), session.session_id().as_deref());
    assert_eq!(7, session.seq());

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(before + 1, ready_count.load(Ordering::SeqCst));
    assert_eq!(0, resumed_count.load(Ordering::SeqCst));

    session.disconnect();
}

#[tokio::test]
async fn resume_replays_events_in_order() {
    let (listener, url) = bind().await;
    let session = new_session(&url, Intents::empty());

    let order = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&order);
    session.on::<MessageCreate, _>(move |message| {
        sink.lock().unwrap().push(message.0.content.clone());
    });

    let server = tokio::spawn(async move {
        let (mut ws, _identify) = serve_new_session(&listener, 5_000, "sess1", 1).await;

        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Library(4000),
            reason: "".into(),
        })))
        .await
        .unwrap();

        // Second connection: replay two events before finalizing the resume.
        let mut ws = accept(&listener).await;
        send_json(&mut ws, &hello(5_000)).await;
        recv_op(&mut ws, 6).await;
        send_json(&mut ws, &message_create(2, "first")).await;
        send_json(&mut ws, &message_create(3, "second")).await;
        send_json(&mut ws, &json!({"op": 0, "s": 3, "t": "RESUMED", "d": null})).await;

        ws
    });

    session.connect().await.unwrap();
    assert!(matches!(session.wait().await, Outcome::Reconnect));

    session.connect().await.unwrap();
    let _ws = server.await.unwrap();

    assert_eq!(3, session.seq());

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        vec!["first".to_owned(), "second".to_owned()],
        *order.lock().unwrap()
    );

    session.disconnect();
}

#[tokio::test]
async fn server_heartbeat_request_is_answered_immediately() {
    let (listener, url) = bind().await;
    let session = new_session(&url, Intents::empty());

    let server = tokio::spawn(async move {
        // A long interval, so only requested beats arrive quickly.
        let (mut ws, _identify) = serve_new_session(&listener, 60_000, "sess1", 1).await;

        // The jitter beat arrives on connect.
        recv_op(&mut ws, 1).await;

        send_json(&mut ws, &json!({"op": 1, "d": null})).await;
        let started = time::Instant::now();
        let beat = recv_op(&mut ws, 1).await;
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "requested beat did not arrive promptly"
        );
        assert_eq!(beat["d"], 1_u64);

        ws
    });

    session.connect().await.unwrap();
    let _ws = server.await.unwrap();

    session.disconnect();
    assert!(matches!(session.wait().await, Outcome::Disconnect));
}

#[tokio::test]
async fn fatal_close_code_surfaces_an_error() {
    let (listener, url) = bind().await;
    let session = new_session(&url, Intents::empty());

    let server = tokio::spawn(async move {
        let (mut ws, _identify) = serve_new_session(&listener, 5_000, "sess1", 1).await;

        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Library(4004),
            reason: "authentication failed".into(),
        })))
        .await
        .unwrap();

        ws
    });

    session.connect().await.unwrap();
    let _ws = server.await.unwrap();

    assert!(matches!(session.wait().await, Outcome::Error(_)));
}
