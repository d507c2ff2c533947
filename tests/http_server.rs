//! HTTP service lifecycle tests.

mod common;

use std::time::Duration;

use common::{coordinator, wait_for_state};
use graceful_shutdown::http::server::CLEANUP_NAME;
use graceful_shutdown::{HttpServer, ShutdownState, Signal};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_server_serves_until_cancelled() {
    let mut coordinator = coordinator(Vec::<Signal>::new());
    let server = HttpServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    server.spawn(&mut coordinator);
    assert_eq!(coordinator.cleanup_names(), vec![CLEANUP_NAME]);

    let token = coordinator.context();
    let mut state = coordinator.subscribe();
    let waiter = tokio::spawn(coordinator.wait(Duration::from_secs(5)));
    wait_for_state(&mut state, ShutdownState::Listening).await;

    let client = client();
    let response = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    let response = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert!(response.text().await.unwrap().starts_with("graceful-shutdown"));

    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("server did not drain")
        .unwrap();
    assert_eq!(*state.borrow(), ShutdownState::Drained);

    assert!(client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .is_err());
}

#[tokio::test]
async fn test_bind_failure_starts_shutdown() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = occupied.local_addr().unwrap();

    let mut coordinator = coordinator(Vec::<Signal>::new());
    HttpServer::launch(addr.to_string(), &mut coordinator);
    assert_eq!(coordinator.cleanup_names(), vec![CLEANUP_NAME]);

    let token = coordinator.context();
    let state = coordinator.subscribe();
    tokio::time::timeout(Duration::from_secs(5), coordinator.wait(Duration::from_secs(5)))
        .await
        .expect("bind failure should drain");

    assert!(token.is_cancelled());
    assert_eq!(*state.borrow(), ShutdownState::Drained);
    drop(occupied);
}
