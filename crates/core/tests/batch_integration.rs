//! `$batch` execution over a scripted transport

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use odatalink_core::testing::{batch_response, MockTransport};
use odatalink_core::{ClientContext, EntityKind, NoAuthentication, ResourcePath};
use odatalink_domain::{ClientError, CollectionId, HttpMethod, HttpResponse, RequestOptions};
use serde_json::{json, Value as Json};

const ROOT: &str = "https://host/v1.0";

fn context(transport: &MockTransport) -> ClientContext {
    ClientContext::new(ROOT, Arc::new(transport.clone()), Arc::new(NoAuthentication)).unwrap()
}

fn collection(ctx: &mut ClientContext, name: &str) -> CollectionId {
    ctx.create_collection(EntityKind::builder("User").build(), Some(ResourcePath::root(name)))
}

fn json_part(status: u16, body: Json) -> HttpResponse {
    HttpResponse::new(status, body.to_string()).with_header("Content-Type", "application/json")
}

fn boundary_of(request: &RequestOptions) -> String {
    request
        .header("content-type")
        .and_then(|value| value.split("boundary=").nth(1))
        .unwrap_or_default()
        .to_string()
}

/// Answer each batch request with the next scripted list of parts.
fn reply_batches(transport: &MockTransport, batches: Vec<Vec<HttpResponse>>) {
    let mut batches = VecDeque::from(batches);
    transport.respond_with(move |request: &RequestOptions| {
        let parts = batches.pop_front().unwrap_or_default();
        batch_response(&boundary_of(request), &parts)
    });
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack.find(needle).unwrap_or_else(|| panic!("missing {needle:?} in batch body"))
}

#[test]
fn mixed_batch_round_trips_by_position() {
    let transport = MockTransport::new();
    reply_batches(
        &transport,
        vec![vec![
            json_part(200, json!({"value": [{"id": "g1"}, {"id": "g2"}]})),
            json_part(201, json!({"id": "u1", "displayName": "Ada"})),
            HttpResponse::new(204, ""),
        ]],
    );
    let mut ctx = context(&transport);
    let groups = collection(&mut ctx, "groups");
    let users = collection(&mut ctx, "users");
    let doomed = ctx.item_by_id(users, "9").unwrap();

    ctx.get(groups).unwrap();
    let created = ctx.add(users, [("displayName", "Ada")]).unwrap();
    ctx.delete_object(doomed).unwrap();
    let summary = ctx.execute_batch().unwrap();

    assert_eq!(summary.requests_sent, 1);
    assert_eq!(summary.queries_completed, 3);
    assert_eq!(transport.request_count(), 1);

    let request = &transport.requests()[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, "https://host/v1.0/$batch");
    assert!(request.header("content-type").unwrap().starts_with("multipart/mixed; boundary=batch_"));

    let body = request.body.as_deref().unwrap();
    let read = position(body, "GET https://host/v1.0/groups HTTP/1.1");
    let create = position(body, "POST https://host/v1.0/users HTTP/1.1");
    let delete = position(body, "DELETE https://host/v1.0/users/9 HTTP/1.1");
    assert!(read < create && create < delete);
    assert!(body.contains(r#"{"displayName":"Ada"}"#));

    assert_eq!(ctx.collection(groups).unwrap().len(), 2);
    assert_eq!(ctx.resource_path(created).unwrap().unwrap().to_url(), "users/u1");
    assert!(!ctx.entity(created).unwrap().has_changes());
}

#[test]
fn batch_by_default_routes_execute_through_batch() {
    let transport = MockTransport::new();
    reply_batches(&transport, vec![vec![json_part(200, json!({"value": []}))]]);
    let mut ctx = ClientContext::builder(ROOT)
        .transport(Arc::new(transport.clone()))
        .batch_by_default(true)
        .build()
        .unwrap();
    let users = collection(&mut ctx, "users");

    ctx.get(users).unwrap();
    ctx.execute().unwrap();

    assert_eq!(transport.requests()[0].url, "https://host/v1.0/$batch");
}

#[test]
fn follow_up_pages_drain_as_further_batches() {
    let transport = MockTransport::new();
    reply_batches(
        &transport,
        vec![
            vec![json_part(
                200,
                json!({
                    "value": [{"id": "1"}, {"id": "2"}],
                    "@odata.nextLink": "https://host/v1.0/users?$skiptoken=p2"
                }),
            )],
            vec![json_part(200, json!({"value": [{"id": "3"}]}))],
        ],
    );
    let mut ctx = context(&transport);
    let users = collection(&mut ctx, "users");

    ctx.get_all(users, Some(2)).unwrap();
    let summary = ctx.execute_batch().unwrap();

    assert_eq!(summary.requests_sent, 2);
    assert_eq!(ctx.collection(users).unwrap().len(), 3);
    let second = transport.requests()[1].body.clone().unwrap();
    assert!(second.contains("GET https://host/v1.0/users?$skiptoken=p2 HTTP/1.1"));
}

#[test]
fn part_count_mismatch_is_a_decode_error() {
    let transport = MockTransport::new();
    reply_batches(&transport, vec![vec![json_part(200, json!({"value": []}))]]);
    let mut ctx = context(&transport);
    let users = collection(&mut ctx, "users");
    let groups = collection(&mut ctx, "groups");

    ctx.get(users).unwrap();
    ctx.get(groups).unwrap();
    let err = ctx.execute_batch().unwrap_err();

    assert!(matches!(err, ClientError::Decode { .. }));
    assert!(!ctx.has_pending_request());
}

#[test]
fn outer_failure_is_a_transport_error() {
    let transport = MockTransport::new();
    transport.push_response(HttpResponse::new(503, "unavailable"));
    let mut ctx = context(&transport);
    let users = collection(&mut ctx, "users");

    ctx.get(users).unwrap();
    let err = ctx.execute_batch().unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(err.is_transport());
}

#[test]
fn failed_part_does_not_stop_later_parts() {
    let transport = MockTransport::new();
    reply_batches(
        &transport,
        vec![vec![
            HttpResponse::new(404, r#"{"error":{"code":"Request_ResourceNotFound"}}"#),
            json_part(200, json!({"value": [{"id": "g1"}]})),
        ]],
    );
    let mut ctx = context(&transport);
    let users = collection(&mut ctx, "users");
    let groups = collection(&mut ctx, "groups");

    ctx.get(users).unwrap();
    ctx.get(groups).unwrap();
    let err = ctx.execute_batch().unwrap_err();

    match err {
        ClientError::Transport { status, url, .. } => {
            assert_eq!(status, Some(404));
            assert_eq!(url, "https://host/v1.0/users");
        }
        other => panic!("expected a transport error, got {other:?}"),
    }
    assert_eq!(ctx.collection(groups).unwrap().len(), 1);
}

#[test]
fn hooks_run_per_part_and_only_the_envelope_is_signed() {
    let transport = MockTransport::new();
    reply_batches(
        &transport,
        vec![vec![json_part(200, json!({"value": []})), json_part(200, json!({"value": []}))]],
    );
    let signed = Arc::new(AtomicUsize::new(0));
    let sign_count = Arc::clone(&signed);
    let sign = move |request: &mut RequestOptions| -> odatalink_domain::Result<()> {
        sign_count.fetch_add(1, Ordering::SeqCst);
        request.set_header("Authorization", "Bearer token");
        Ok(())
    };
    let mut ctx = ClientContext::new(ROOT, Arc::new(transport.clone()), Arc::new(sign)).unwrap();
    let users = collection(&mut ctx, "users");
    let groups = collection(&mut ctx, "groups");

    let seen = Arc::new(AtomicUsize::new(0));
    let after = Arc::clone(&seen);
    ctx.before_execute(
        |request: &mut RequestOptions| request.set_header("client-request-id", "abc"),
        false,
    );
    ctx.after_execute(
        move |_: &HttpResponse| {
            after.fetch_add(1, Ordering::SeqCst);
        },
        false,
    );

    ctx.get(users).unwrap();
    ctx.get(groups).unwrap();
    ctx.execute_batch().unwrap();

    assert_eq!(signed.load(Ordering::SeqCst), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    let request = &transport.requests()[0];
    assert_eq!(request.header("authorization"), Some("Bearer token"));
    let body = request.body.as_deref().unwrap();
    assert_eq!(body.matches("client-request-id: abc").count(), 2);
    assert!(!body.contains("Authorization"));
}

#[test]
fn build_failure_sends_nothing() {
    let transport = MockTransport::new();
    let mut ctx = context(&transport);
    let users = collection(&mut ctx, "users");
    let pending = ctx.create_typed_object(users, None, None).unwrap();

    ctx.get(users).unwrap();
    ctx.load(pending, &[]).unwrap();
    let err = ctx.execute_batch().unwrap_err();

    assert!(matches!(err, ClientError::Addressing { .. }));
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn unsent_batch_fails_the_pass_and_frees_scratch() {
    let transport = MockTransport::new();
    let mut ctx = context(&transport);
    let users = collection(&mut ctx, "users");
    let before = ctx.arena_stats();

    ctx.get(users).unwrap();
    ctx.first(users, "mail eq 'a@host'").unwrap();
    let err = ctx.execute_batch().unwrap_err();

    assert!(matches!(err, ClientError::Transport { status: None, .. }));
    assert_eq!(transport.request_count(), 1);
    assert!(!ctx.has_pending_request());
    assert_eq!(ctx.arena_stats().collections, before.collections);
}

#[test]
fn signing_failure_sends_no_batch() {
    let transport = MockTransport::new();
    let authenticator = |_: &mut RequestOptions| -> Result<(), ClientError> {
        Err(ClientError::auth("token expired"))
    };
    let mut ctx =
        ClientContext::new(ROOT, Arc::new(transport.clone()), Arc::new(authenticator)).unwrap();
    let users = collection(&mut ctx, "users");

    ctx.get(users).unwrap();
    ctx.single(users, "mail eq 'a@host'").unwrap();
    let err = ctx.execute_batch().unwrap_err();

    assert!(matches!(err, ClientError::Auth { .. }));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(ctx.arena_stats().collections, 1);
}
