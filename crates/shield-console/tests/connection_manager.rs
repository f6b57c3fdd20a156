//! # Connection Manager Tests
//!
//! Reconnect and shutdown behaviour against the scripted mock transport.

use shield_console::ports::MockTransport;
use shield_console::{ConnectionManager, ConnectionState, FeedEvent, ReconnectPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        base_delay_ms: 5,
        max_delay_ms: 20,
        max_attempts,
    }
}

async fn collect_until_gave_up(rx: &mut mpsc::Receiver<FeedEvent>) -> Vec<FeedEvent> {
    let mut seen = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        let done = matches!(event, FeedEvent::GaveUp { .. });
        seen.push(event);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn test_counter_resets_after_successful_connect() {
    let transport = MockTransport::new();
    transport.push_refuse("down");
    transport.push_frames(["hello"]);
    // Empty script refuses from here on

    let (tx, mut rx) = mpsc::channel(32);
    let mut manager = ConnectionManager::new(Arc::new(transport.clone()), "ws://t", policy(2), tx);
    manager.start();

    let events = collect_until_gave_up(&mut rx).await;
    assert!(events.contains(&FeedEvent::Connected));
    assert!(events.contains(&FeedEvent::Message("hello".to_string())));

    // refuse, accept+close, then two refusals after the counter reset
    assert_eq!(transport.attempts(), 4);
    assert_eq!(events.last(), Some(&FeedEvent::GaveUp { attempts: 2 }));
    assert!(!manager.is_running());
}

#[tokio::test]
async fn test_shutdown_closes_active_channel() {
    let transport = MockTransport::new();
    let sender = transport.push_accept();
    let (tx, mut rx) = mpsc::channel(32);
    let mut manager = ConnectionManager::new(Arc::new(transport.clone()), "ws://t", policy(5), tx);
    let mut state = manager.watch_state();
    manager.start();

    timeout(Duration::from_secs(2), state.wait_for(|s| *s == ConnectionState::Connected))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rx.recv().await, Some(FeedEvent::Connected));

    manager.shutdown().await;
    assert_eq!(manager.state(), ConnectionState::Shutdown);
    assert!(sender.is_closed());
    assert_eq!(transport.closed(), 1);

    // No reconnect after shutdown
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.attempts(), 1);
}
