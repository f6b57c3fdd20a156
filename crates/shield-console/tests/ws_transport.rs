//! # WebSocket Adapter Tests
//!
//! Runs [`WsFeedTransport`] against a local tokio-tungstenite server.

use futures_util::SinkExt;
use shield_console::{FeedTransport, WsFeedTransport};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

async fn serve_once(messages: Vec<Message>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for message in messages {
            ws.send(message).await.unwrap();
        }
        let _ = ws.close(None).await;
    });
    format!("ws://{addr}")
}

#[tokio::test]
async fn test_text_and_binary_frames_are_delivered() {
    let url = serve_once(vec![
        Message::Text(r#"{"type":"receipt","data":{}}"#.into()),
        Message::Binary(b"binary text".to_vec().into()),
        Message::Binary(vec![0xff, 0xfe].into()),
        Message::Text("last".into()),
    ])
    .await;

    let mut channel = WsFeedTransport::new().connect(&url).await.unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = timeout(Duration::from_secs(2), channel.next_frame())
        .await
        .expect("timed out reading frame")
    {
        frames.push(frame.unwrap());
    }

    // The invalid UTF-8 frame is skipped
    assert_eq!(
        frames,
        vec![
            r#"{"type":"receipt","data":{}}"#.to_string(),
            "binary text".to_string(),
            "last".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_connect_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = match WsFeedTransport::new().connect(&format!("ws://{addr}")).await {
        Ok(_) => panic!("connect should fail"),
        Err(e) => e,
    };
    assert!(matches!(err, shield_console::ConsoleError::Transport(_)));
}
