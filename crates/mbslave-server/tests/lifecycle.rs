use mbslave_server::{BankDispatcher, BankSizes, DataBank, Master, Server, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

fn test_config() -> ServerConfig {
    ServerConfig::default().with_host("127.0.0.1").with_port(0)
}

fn small_bank() -> BankDispatcher {
    BankDispatcher::new(Arc::new(DataBank::with_sizes(BankSizes::uniform(64))))
}

#[tokio::test]
async fn idle_connection_is_closed_without_a_response_frame() {
    let config = test_config().with_idle_timeout(Duration::from_millis(100));
    let server = Server::bind(config, small_bank()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let task = tokio::spawn(server.run());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut received = Vec::new();
    let closed = timeout(Duration::from_secs(2), stream.read_to_end(&mut received)).await;

    assert!(matches!(closed, Ok(Ok(0)) | Ok(Err(_))));
    assert!(received.is_empty());

    task.abort();
}

#[tokio::test]
async fn excess_connections_are_refused() {
    let config = test_config().with_max_connections(1);
    let server = Server::bind(config, small_bank()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let task = tokio::spawn(server.run());

    // First connection holds the only slot.
    let mut first = Master::connect(addr).await.unwrap();
    assert_eq!(first.read_coils(1, 0, 1).await.unwrap(), vec![false]);

    // Second connection is accepted and immediately dropped.
    let mut second = TcpStream::connect(addr).await.unwrap();
    let mut byte = [0u8; 1];
    let read = timeout(Duration::from_secs(2), second.read(&mut byte)).await;
    assert!(matches!(read, Ok(Ok(0)) | Ok(Err(_))));

    // The first connection keeps working.
    assert_eq!(first.read_coils(1, 0, 1).await.unwrap(), vec![false]);

    task.abort();
}

#[tokio::test]
async fn shutdown_stops_accepting_and_releases_the_port() {
    let server = Server::bind(test_config(), small_bank()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    let task = tokio::spawn(server.run());

    handle.shutdown();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("run did not stop within grace")
        .unwrap()
        .unwrap();

    // The port is free again.
    let rebound = TcpListener::bind(addr).await;
    assert!(rebound.is_ok());
}

#[tokio::test]
async fn shutdown_closes_idle_connections() {
    let config = test_config().with_shutdown_grace(Duration::from_secs(1));
    let server = Server::bind(config, small_bank()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    let task = tokio::spawn(server.run());

    let mut stream = TcpStream::connect(addr).await.unwrap();
    // Make sure the connection is fully established server-side first.
    tokio::time::sleep(Duration::from_millis(50)).await;

    handle.shutdown();

    let mut byte = [0u8; 1];
    let read = timeout(Duration::from_secs(2), stream.read(&mut byte)).await;
    assert!(matches!(read, Ok(Ok(0)) | Ok(Err(_))));

    timeout(Duration::from_secs(2), task)
        .await
        .expect("run did not stop within grace")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn requests_complete_before_shutdown_finishes() {
    let server = Server::bind(test_config(), small_bank()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    let task = tokio::spawn(server.run());

    let mut master = Master::connect(addr).await.unwrap();
    master.write_single_coil(1, 3, true).await.unwrap();

    handle.shutdown();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("run did not stop within grace")
        .unwrap()
        .unwrap();
}
