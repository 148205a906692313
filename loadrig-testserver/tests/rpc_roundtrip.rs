use std::time::Duration;

use loadrig_rpc::{Error, RpcClient, RpcRequest, status};
use loadrig_testserver::{OP_GET_MESSAGES, OP_REGISTER, OP_SEND_MESSAGE, TestServer, TestServerConfig};
use serde_json::json;

fn client(server: &TestServer) -> RpcClient {
    RpcClient::new(server.base_url()).unwrap_or_else(|e| panic!("client: {e}"))
}

#[tokio::test]
async fn register_send_and_list_over_http() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start test server: {e}"));
    let rpc = client(&server);

    let mut user_ids = Vec::new();
    let mut tokens = Vec::new();
    for name in ["sender", "receiver"] {
        let reply = rpc
            .call(RpcRequest::new(
                OP_REGISTER,
                json!({ "username": name, "password": "pw", "device_name": "test" }),
            ))
            .await
            .unwrap_or_else(|e| panic!("register {name}: {e}"));
        assert!(reply.is_ok(), "register {name}: {reply:?}");
        user_ids.push(reply.message["user_id"].clone());
        tokens.push(reply.message["access_token"].as_str().unwrap_or_default().to_string());
    }

    let sent = rpc
        .call(
            RpcRequest::new(
                OP_SEND_MESSAGE,
                json!({ "recipient_user_id": user_ids[1], "encrypted_content": "hello" }),
            )
            .with_bearer(tokens[0].clone()),
        )
        .await
        .unwrap_or_else(|e| panic!("send: {e}"));
    assert!(sent.is_ok(), "send: {sent:?}");

    let listed = rpc
        .call(
            RpcRequest::new(
                OP_GET_MESSAGES,
                json!({ "other_user_id": user_ids[1], "limit": 10 }),
            )
            .with_bearer(tokens[0].clone()),
        )
        .await
        .unwrap_or_else(|e| panic!("list: {e}"));
    assert_eq!(
        listed.message["messages"][0]["message_id"],
        sent.message["message_id"]
    );

    assert_eq!(server.stats().requests_total(), 4);
    assert_eq!(server.stats().authorized_requests(), 2);
    drop(rpc);
    server.shutdown().await;
}

#[tokio::test]
async fn unknown_operation_is_an_http_error() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start test server: {e}"));
    let rpc = client(&server);

    let err = match rpc.call(RpcRequest::new("Nope", json!({}))).await {
        Ok(reply) => panic!("expected failure, got {reply:?}"),
        Err(e) => e,
    };
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }), "{err}");
    drop(rpc);
    server.shutdown().await;
}

#[tokio::test]
async fn injected_failures_and_timeouts() {
    let server = TestServer::start_with(TestServerConfig {
        latency: Duration::from_millis(50),
        fail_every: Some(2),
    })
    .await
    .unwrap_or_else(|e| panic!("start test server: {e}"));
    let rpc = client(&server);

    let first = rpc
        .call(RpcRequest::new(
            OP_REGISTER,
            json!({ "username": "a", "password": "pw" }),
        ))
        .await
        .unwrap_or_else(|e| panic!("first: {e}"));
    assert!(first.is_ok());

    let second = rpc
        .call(RpcRequest::new(
            OP_REGISTER,
            json!({ "username": "b", "password": "pw" }),
        ))
        .await
        .unwrap_or_else(|e| panic!("second: {e}"));
    assert_eq!(second.status, status::UNAVAILABLE);
    assert_eq!(server.stats().injected_failures(), 1);

    let slow = rpc.clone().with_timeout(Some(Duration::from_millis(5)));
    let err = match slow
        .call(RpcRequest::new(
            OP_REGISTER,
            json!({ "username": "c", "password": "pw" }),
        ))
        .await
    {
        Ok(reply) => panic!("expected timeout, got {reply:?}"),
        Err(e) => e,
    };
    assert!(matches!(err, Error::Timeout(_)), "{err}");

    drop((rpc, slow));
    server.shutdown().await;
}
