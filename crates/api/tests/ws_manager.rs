//! Unit tests for `WsManager`.
//!
//! These tests exercise the WebSocket connection manager directly, without
//! performing any HTTP upgrades.

use axum::extract::ws::Message;
use printrelay_api::ws::WsManager;

#[tokio::test]
async fn new_manager_has_zero_connections() {
    let manager = WsManager::new();

    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();

    let _rx = manager.add("conn-1".to_string()).await;
    assert_eq!(manager.connection_count().await, 1);
    assert!(manager.oldest_connected_at().await.is_some());

    manager.remove("conn-1").await;
    assert_eq!(manager.connection_count().await, 0);
    assert!(manager.oldest_connected_at().await.is_none());
}

#[tokio::test]
async fn oldest_connection_survives_newer_removals() {
    let manager = WsManager::new();

    let _rx1 = manager.add("conn-1".to_string()).await;
    let first = manager.oldest_connected_at().await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let _rx2 = manager.add("conn-2".to_string()).await;

    assert_eq!(manager.oldest_connected_at().await, first);

    manager.remove("conn-2").await;
    assert_eq!(manager.oldest_connected_at().await, first);
}

#[tokio::test]
async fn remove_unknown_id_is_noop() {
    let manager = WsManager::new();

    let _rx = manager.add("conn-1".to_string()).await;
    manager.remove("nonexistent").await;

    assert_eq!(manager.connection_count().await, 1);
}

#[tokio::test]
async fn send_to_reaches_only_the_target() {
    let manager = WsManager::new();

    let mut rx1 = manager.add("conn-1".to_string()).await;
    let mut rx2 = manager.add("conn-2".to_string()).await;

    assert!(manager.send_to("conn-2", Message::Text("for two".into())).await);

    let msg = rx2.recv().await.expect("rx2 should receive");
    assert!(matches!(&msg, Message::Text(t) if *t == "for two"));
    assert!(rx1.try_recv().is_err());
}

#[tokio::test]
async fn send_to_unknown_or_closed_connection_fails() {
    let manager = WsManager::new();

    assert!(!manager.send_to("ghost", Message::Text("x".into())).await);

    let rx = manager.add("conn-1".to_string()).await;
    drop(rx);
    assert!(!manager.send_to("conn-1", Message::Text("x".into())).await);
}

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();

    let mut rx1 = manager.add("conn-1".to_string()).await;
    let mut rx2 = manager.add("conn-2".to_string()).await;

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);

    let msg1 = rx1.recv().await.expect("rx1 should receive Close");
    assert!(matches!(msg1, Message::Close(None)), "Expected Close(None), got: {msg1:?}");
    let msg2 = rx2.recv().await.expect("rx2 should receive Close");
    assert!(matches!(msg2, Message::Close(None)), "Expected Close(None), got: {msg2:?}");

    // After Close, the channel should be closed (no more messages).
    assert!(rx1.recv().await.is_none(), "Channel should be closed after shutdown");
}

#[tokio::test]
async fn ping_all_pings_every_connection() {
    let manager = WsManager::new();

    let mut rx1 = manager.add("conn-1".to_string()).await;
    let mut rx2 = manager.add("conn-2".to_string()).await;

    manager.ping_all().await;

    assert!(matches!(rx1.recv().await, Some(Message::Ping(_))));
    assert!(matches!(rx2.recv().await, Some(Message::Ping(_))));
}

#[tokio::test]
async fn duplicate_id_replaces_previous_connection() {
    let manager = WsManager::new();

    let _rx_old = manager.add("conn-1".to_string()).await;
    let mut rx_new = manager.add("conn-1".to_string()).await;
    assert_eq!(manager.connection_count().await, 1);

    assert!(manager.send_to("conn-1", Message::Text("replaced".into())).await);
    let msg = rx_new.recv().await.expect("New rx should receive message");
    assert!(matches!(&msg, Message::Text(t) if *t == "replaced"));
}
