mod harness;

use std::time::Duration;

use harness::config::ConfigBuilder;
use harness::mock_upstream::MockUpstream;
use harness::server::TestServer;
use serde_json::json;

fn chat_body(model: &str) -> serde_json::Value {
    json!({"model": model, "messages": [{"role": "user", "content": "hi"}]})
}

#[tokio::test]
async fn union_keys_rotate_across_requests() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_toml(&format!(
            r#"
            [llm.key_providers.rotating]
            type = "union"
            members = [{{ type = "literal", key = "sk-a" }}, {{ type = "literal", key = "sk-b" }}]

            [llm.models.local]
            type = "genericoai"
            url = "{}"
            key_provider = "rotating"

            [llm.models.local.models.m]
            "#,
            mock.url()
        ))
        .build();
    let server = TestServer::start(config).await.unwrap();

    for _ in 0..3 {
        assert_eq!(server.chat(&chat_body("local/m")).await.status(), 200);
    }

    let keys: Vec<String> = mock.requests().into_iter().filter_map(|r| r.authorization).collect();
    assert_eq!(keys, vec!["Bearer sk-a", "Bearer sk-b", "Bearer sk-a"]);
}

#[tokio::test]
async fn pattern_targeted_key_is_used() {
    let mock = MockUpstream::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_toml(&format!(
            r#"
            [llm.key_providers.shared]
            type = "literal"
            key = "sk-shared"
            model_targets = ["^local/"]

            [llm.models.local]
            type = "genericoai"
            url = "{}"

            [llm.models.local.models.m]
            "#,
            mock.url()
        ))
        .build();
    let server = TestServer::start(config).await.unwrap();

    assert_eq!(server.chat(&chat_body("local/m")).await.status(), 200);
    assert_eq!(mock.last_request().authorization.as_deref(), Some("Bearer sk-shared"));
}

#[tokio::test]
async fn exhausted_pool_times_out_with_credential_error() {
    let mock = MockUpstream::start_slow(Duration::from_millis(500)).await.unwrap();
    let config = ConfigBuilder::new()
        .with_toml(&format!(
            r#"
            [llm.key_providers.single]
            type = "pool"
            members = [{{ type = "literal", key = "sk-only" }}]
            timeout = "50ms"

            [llm.models.local]
            type = "genericoai"
            url = "{}"
            key_provider = "single"

            [llm.models.local.models.m]
            "#,
            mock.url()
        ))
        .build();
    let server = TestServer::start(config).await.unwrap();

    let first_body = chat_body("local/m");
    let second_body = chat_body("local/m");
    let first = server.chat(&first_body);
    let second = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        server.chat(&second_body).await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 500);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["error"]["type"], "credential_error");
    assert_eq!(mock.requests().len(), 1);
}
