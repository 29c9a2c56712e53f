use futures_util::{SinkExt, StreamExt};
use pincer::core::dispatch::{GatewayDispatch, OpCode};
use pincer::{Intents, PincerError};
use pincer::core::gateway::Gateway;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type Socket = WebSocketStream<TcpStream>;

async fn accept(listener: &TcpListener) -> Socket {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn send_json(ws: &mut Socket, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn next_json(ws: &mut Socket) -> Value {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            _ => continue,
        }
    }
}

async fn close_with(ws: &mut Socket, code: u16) {
    let _ = ws
        .close(Some(CloseFrame {
            code: CloseCode::from(code),
            reason: "bye".into(),
        }))
        .await;
}

#[tokio::test]
async fn test_identify_ready_then_fatal_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 45000}})).await;

        let identify = next_json(&mut ws).await;

        send_json(
            &mut ws,
            json!({
                "op": 0,
                "s": 1,
                "t": "READY",
                "d": {"v": 10, "session_id": "sess-1", "user": {"id": "1", "username": "bot"}, "guilds": []}
            }),
        )
        .await;
        close_with(&mut ws, 4004).await;
        identify
    });

    let mut gateway = Gateway::new(url, "secret", Intents::GUILDS | Intents::GUILD_MESSAGES)
        .reconnect_delay(Duration::from_millis(10));
    let (tx, mut rx) = mpsc::unbounded_channel::<GatewayDispatch>();
    let runner = tokio::spawn(async move {
        let result = gateway.run(tx).await;
        (gateway, result)
    });

    let ready = rx.recv().await.unwrap();
    assert_eq!(ready.op, OpCode::Dispatch);
    assert_eq!(ready.event_name(), Some("READY"));

    let identify = server.await.unwrap();
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], "secret");
    assert_eq!(identify["d"]["intents"], 513);
    assert_eq!(identify["d"]["properties"]["browser"], "pincer");

    let (gateway, result) = runner.await.unwrap();
    assert!(matches!(result, Err(PincerError::GatewayError { .. })));
    assert_eq!(gateway.session_id(), Some("sess-1"));
    assert_eq!(gateway.seq(), Some(1));
}

#[tokio::test]
async fn test_resumes_after_non_fatal_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let resume_url = url.clone();

    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        send_json(&mut first, json!({"op": 10, "d": {"heartbeat_interval": 45000}})).await;
        next_json(&mut first).await;
        send_json(
            &mut first,
            json!({
                "op": 0,
                "s": 5,
                "t": "READY",
                "d": {"session_id": "sess-2", "resume_gateway_url": resume_url}
            }),
        )
        .await;
        close_with(&mut first, 4000).await;

        let mut second = accept(&listener).await;
        send_json(&mut second, json!({"op": 10, "d": {"heartbeat_interval": 45000}})).await;
        let resume = next_json(&mut second).await;
        close_with(&mut second, 4004).await;
        resume
    });

    let mut gateway = Gateway::new(url, "secret", Intents::NONE).reconnect_delay(Duration::from_millis(10));
    let (tx, mut rx) = mpsc::unbounded_channel::<GatewayDispatch>();
    let runner = tokio::spawn(async move { gateway.run(tx).await });

    assert_eq!(rx.recv().await.unwrap().event_name(), Some("READY"));

    let resume = server.await.unwrap();
    assert_eq!(resume["op"], 6);
    assert_eq!(resume["d"]["session_id"], "sess-2");
    assert_eq!(resume["d"]["seq"], 5);

    assert!(runner.await.unwrap().is_err());
}

#[tokio::test]
async fn test_server_heartbeat_request_is_answered() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        send_json(&mut ws, json!({"op": 10, "d": {"heartbeat_interval": 45000}})).await;
        next_json(&mut ws).await;

        send_json(&mut ws, json!({"op": 1, "d": null})).await;
        let beat = next_json(&mut ws).await;
        close_with(&mut ws, 4014).await;
        beat
    });

    let mut gateway = Gateway::new(url, "secret", Intents::NONE);
    let (tx, _rx) = mpsc::unbounded_channel::<GatewayDispatch>();
    let runner = tokio::spawn(async move { gateway.run(tx).await });

    let beat = server.await.unwrap();
    assert_eq!(beat, json!({"op": 1, "d": null}));
    assert!(runner.await.unwrap().is_err());
}

async fn hello_and_ready(ws: &mut Socket, session_id: &str, seq: u64, resume_url: &str) -> Value {
    send_json(ws, json!({"op": 10, "d": {"heartbeat_interval": 45000}})).await;
    let identify = next_json(ws).await;
    send_json(
        ws,
        json!({
            "op": 0,
            "s": seq,
            "t": "READY",
            "d": {"session_id": session_id, "resume_gateway_url": resume_url}
        }),
    )
    .await;
    identify
}

#[tokio::test]
async fn test_reconnect_request_resumes_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let resume_url = url.clone();

    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        hello_and_ready(&mut first, "sess-7", 3, &resume_url).await;
        send_json(&mut first, json!({"op": 7, "d": null})).await;

        let mut second = accept(&listener).await;
        send_json(&mut second, json!({"op": 10, "d": {"heartbeat_interval": 45000}})).await;
        let resume = next_json(&mut second).await;
        close_with(&mut second, 4004).await;
        resume
    });

    let mut gateway = Gateway::new(url, "secret", Intents::NONE).reconnect_delay(Duration::from_millis(10));
    let (tx, mut rx) = mpsc::unbounded_channel::<GatewayDispatch>();
    let runner = tokio::spawn(async move { gateway.run(tx).await });

    assert_eq!(rx.recv().await.unwrap().event_name(), Some("READY"));

    let resume = server.await.unwrap();
    assert_eq!(resume["op"], 6);
    assert_eq!(resume["d"]["token"], "secret");
    assert_eq!(resume["d"]["session_id"], "sess-7");
    assert_eq!(resume["d"]["seq"], 3);

    assert!(runner.await.unwrap().is_err());
}

#[tokio::test]
async fn test_invalid_session_starts_fresh() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let resume_url = url.clone();

    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        hello_and_ready(&mut first, "sess-9", 4, &resume_url).await;
        send_json(&mut first, json!({"op": 9, "d": false})).await;

        let mut second = accept(&listener).await;
        send_json(&mut second, json!({"op": 10, "d": {"heartbeat_interval": 45000}})).await;
        let reply = next_json(&mut second).await;
        close_with(&mut second, 4004).await;
        reply
    });

    let mut gateway = Gateway::new(url, "secret", Intents::NONE).reconnect_delay(Duration::from_millis(10));
    let (tx, mut rx) = mpsc::unbounded_channel::<GatewayDispatch>();
    let runner = tokio::spawn(async move {
        let result = gateway.run(tx).await;
        (gateway, result)
    });

    assert_eq!(rx.recv().await.unwrap().event_name(), Some("READY"));

    let reply = server.await.unwrap();
    assert_eq!(reply["op"], 2);
    assert_eq!(reply["d"]["token"], "secret");

    let (gateway, result) = runner.await.unwrap();
    assert!(result.is_err());
    assert_eq!(gateway.session_id(), None);
    assert_eq!(gateway.seq(), None);
}
