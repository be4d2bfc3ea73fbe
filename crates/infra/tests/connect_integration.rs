//! End-to-end tests: engine over the blocking HTTP client against wiremock
//!
//! The mock server runs on a tokio runtime while the blocking client is
//! driven from the test thread.

use std::sync::Arc;
use std::time::Duration;

use odatalink_core::testing::batch_response;
use odatalink_core::{ClientContext, EntityKind, ResourcePath};
use odatalink_domain::{ClientConfig, ClientError, HttpResponse, Value};
use odatalink_infra::{connect, connect_with_provider, IssuedToken, RefreshingTokenProvider};
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(format!("{}/v1.0", server.uri()))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("odatalink_infra=debug,odatalink_core=debug")
        .with_test_writer()
        .try_init();
}

fn users(ctx: &mut ClientContext) -> odatalink_domain::CollectionId {
    ctx.create_collection(EntityKind::builder("User").build(), Some(ResourcePath::root("users")))
}

#[test]
fn reads_and_creates_over_http() -> anyhow::Result<()> {
    let runtime = Runtime::new()?;
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path("/v1.0/users"))
            .and(query_param("$top", "2"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"id": "1", "displayName": "Ada"}, {"id": "2", "displayName": "Grace"}]
            })))
            .expect(1)
            .mount(&server),
    );
    runtime.block_on(
        Mock::given(method("POST"))
            .and(path("/v1.0/users"))
            .and(header("content-type", "application/json"))
            .and(body_string_contains("Edsger"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "3", "displayName": "Edsger"})),
            )
            .expect(1)
            .mount(&server),
    );

    let mut config = config_for(&server);
    config.access_token = Some("secret".into());
    let mut ctx = connect(config)?;
    let users = users(&mut ctx);

    ctx.collection_mut(users)?.top(2);
    ctx.get(users)?;
    ctx.execute_query()?;
    assert_eq!(ctx.collection(users)?.len(), 2);

    let created = ctx.add(users, [("displayName", "Edsger")])?;
    ctx.execute_query()?;
    assert_eq!(ctx.resource_path(created)?.map(ToString::to_string), Some("users/3".into()));
    assert_eq!(ctx.property(created, "displayName")?, Some(&Value::from("Edsger")));
    Ok(())
}

#[test]
fn server_errors_surface_as_transport_errors() -> anyhow::Result<()> {
    init_tracing();
    let runtime = Runtime::new()?;
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such user"))
            .mount(&server),
    );

    let mut ctx = connect(config_for(&server))?;
    let users = users(&mut ctx);
    let missing = ctx.item_by_id(users, "404")?;
    ctx.load(missing, &[])?;

    match ctx.execute_query() {
        Err(ClientError::Transport { status, url, body }) => {
            assert_eq!(status, Some(404));
            assert!(url.ends_with("/v1.0/users/404"));
            assert_eq!(body, "no such user");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn batch_round_trip_over_http() -> anyhow::Result<()> {
    init_tracing();
    let runtime = Runtime::new()?;
    let server = runtime.block_on(MockServer::start());
    let reply = batch_response(
        "batchresponse_1",
        &[
            HttpResponse::new(200, json!({"value": [{"id": "1"}]}).to_string())
                .with_header("Content-Type", "application/json"),
            HttpResponse::new(200, json!({"value": [{"id": "g1"}, {"id": "g2"}]}).to_string())
                .with_header("Content-Type", "application/json"),
        ],
    );
    runtime.block_on(
        Mock::given(method("POST"))
            .and(path("/v1.0/$batch"))
            .and(body_string_contains("GET "))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(reply.body.clone(), "multipart/mixed; boundary=batchresponse_1"),
            )
            .expect(1)
            .mount(&server),
    );

    let mut config = config_for(&server);
    config.batch_by_default = true;
    let mut ctx = connect(config)?;
    let users = users(&mut ctx);
    let groups =
        ctx.create_collection(EntityKind::generic(), Some(ResourcePath::root("groups")));

    ctx.get(users)?;
    ctx.get(groups)?;
    let summary = ctx.execute()?;

    assert_eq!(summary.requests_sent, 1);
    assert_eq!(ctx.collection(users)?.len(), 1);
    assert_eq!(ctx.collection(groups)?.len(), 2);
    Ok(())
}

#[test]
fn token_provider_signs_requests() -> anyhow::Result<()> {
    let runtime = Runtime::new()?;
    let server = runtime.block_on(MockServer::start());
    runtime.block_on(
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(2)
            .mount(&server),
    );

    let provider = RefreshingTokenProvider::new(|| {
        Ok(IssuedToken { access_token: "fresh".into(), expires_in: Duration::from_secs(3600) })
    });
    let mut ctx = connect_with_provider(config_for(&server), Arc::new(provider))?;
    let users = users(&mut ctx);

    ctx.get(users)?;
    ctx.get(users)?;
    let summary = ctx.execute_query()?;
    assert_eq!(summary.requests_sent, 2);
    Ok(())
}

#[test]
fn invalid_configuration_is_rejected_before_any_request() {
    let err = connect(ClientConfig::new("not-a-url")).unwrap_err();
    assert!(matches!(err, ClientError::Config { .. }));
}
