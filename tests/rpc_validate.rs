//! Drive the RPC adapter over a real TCP socket.

use gardi::{
    rpc,
    session::Engine,
    store::memory::MemoryUserStore,
    token::{unix_now, TokenCodec},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::watch,
    task::JoinHandle,
    time::timeout,
};

async fn engine_with_alice() -> Engine {
    let engine = Engine::new(
        Arc::new(MemoryUserStore::new()),
        TokenCodec::new(SecretString::from("rpc-socket-secret".to_string())),
    );
    engine
        .create("alice", "wonderland")
        .await
        .expect("create should succeed");
    engine
}

async fn start_server(
    engine: Engine,
) -> (SocketAddr, watch::Sender<bool>, JoinHandle<anyhow::Result<()>>) {
    let server = rpc::Server::bind(0).await.expect("bind on an ephemeral port");
    let addr = server.local_addr().expect("bound address");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(server.serve(engine, shutdown_rx));
    (addr, shutdown_tx, handle)
}

async fn roundtrip(addr: SocketAddr, request: &Value) -> Value {
    let stream = TcpStream::connect(("127.0.0.1", addr.port()))
        .await
        .expect("connect to RPC server");
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    writer
        .write_all(format!("{request}\n").as_bytes())
        .await
        .expect("write request line");

    let mut line = String::new();
    reader.read_line(&mut line).await.expect("read response line");
    serde_json::from_str(&line).expect("response is json")
}

fn validate_request(id: u64, access: &str, refresh: &str) -> Value {
    json!({
        "id": id,
        "method": "validate",
        "params": { "accessToken": access, "refreshToken": refresh },
    })
}

#[tokio::test]
async fn fresh_pair_is_returned_unchanged() {
    let engine = engine_with_alice().await;
    let pair = engine
        .login("alice", "wonderland")
        .await
        .expect("login should succeed");
    let (addr, shutdown, _handle) = start_server(engine).await;

    let response = roundtrip(addr, &validate_request(1, &pair.access, &pair.refresh)).await;

    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["accessToken"], pair.access.as_str());
    assert_eq!(response["result"]["refreshToken"], pair.refresh.as_str());
    assert!(response.get("error").is_none());

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn expired_access_rotates_to_a_new_pair() {
    let engine = engine_with_alice().await;
    let now = unix_now();
    let expired_access = engine
        .codec()
        .sign_at("alice", now - 120, now - 60)
        .expect("sign expired access");
    let live_refresh = engine
        .codec()
        .sign_at("alice", now - 120, now + 3600)
        .expect("sign live refresh");
    let codec = engine.codec().clone();
    let (addr, shutdown, _handle) = start_server(engine).await;

    let response = roundtrip(addr, &validate_request(2, &expired_access, &live_refresh)).await;

    let access = response["result"]["accessToken"]
        .as_str()
        .expect("new access token");
    let refresh = response["result"]["refreshToken"]
        .as_str()
        .expect("new refresh token");
    assert_ne!(access, expired_access);
    assert_ne!(refresh, live_refresh);

    let claims = codec.parse(access).expect("new access parses");
    assert_eq!(claims.sub, "alice");
    assert!(claims.exp > now - 60);

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn fully_expired_session_is_an_error() {
    let engine = engine_with_alice().await;
    let now = unix_now();
    let expired_access = engine
        .codec()
        .sign_at("alice", now - 7200, now - 3660)
        .expect("sign expired access");
    let expired_refresh = engine
        .codec()
        .sign_at("alice", now - 7200, now - 60)
        .expect("sign expired refresh");
    let (addr, shutdown, _handle) = start_server(engine).await;

    let response = roundtrip(addr, &validate_request(3, &expired_access, &expired_refresh)).await;

    assert_eq!(response["error"]["code"], "session_expired");
    assert!(response.get("result").is_none());

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn protocol_errors_are_coded() {
    let engine = engine_with_alice().await;
    let (addr, shutdown, _handle) = start_server(engine).await;

    let response = roundtrip(addr, &validate_request(4, "garbage", "garbage")).await;
    assert_eq!(response["error"]["code"], "invalid_token");

    let response = roundtrip(addr, &json!({"id": 5, "method": "login"})).await;
    assert_eq!(response["error"]["code"], "invalid_request");

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn one_connection_serves_many_requests() {
    let engine = engine_with_alice().await;
    let pair = engine
        .login("alice", "wonderland")
        .await
        .expect("login should succeed");
    let (addr, shutdown, _handle) = start_server(engine).await;

    let stream = TcpStream::connect(("127.0.0.1", addr.port()))
        .await
        .expect("connect to RPC server");
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    for id in 1..=3_u64 {
        let request = validate_request(id, &pair.access, &pair.refresh);
        writer
            .write_all(format!("{request}\n").as_bytes())
            .await
            .expect("write request line");

        let mut line = String::new();
        reader.read_line(&mut line).await.expect("read response line");
        let response: Value = serde_json::from_str(&line).expect("response is json");
        assert_eq!(response["id"], id);
        assert_eq!(response["result"]["accessToken"], pair.access.as_str());
    }

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn shutdown_stops_the_accept_loop() {
    let engine = engine_with_alice().await;
    let (_addr, shutdown, handle) = start_server(engine).await;

    shutdown.send(true).expect("server is listening");

    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("server stops within the grace window")
        .expect("serve task joins");
    assert!(result.is_ok());
}
