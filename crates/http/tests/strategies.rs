//! Strategy behaviour against a scripted pipeline.

mod common;

use std::time::Duration;

use http::header::HeaderName;
use http::{Method, StatusCode};
use lro_http::{
    ChainedStrategy, LocationStrategy, LroState, OperationResourceStrategy, PollingStrategy,
    StatusCheckStrategy, StrategyError,
};
use lro_poller::OperationStatus;
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;

use common::{ScriptedPipeline, reply};

const ENDPOINT: &str = "https://vault.example.net/";

fn state(method: Method) -> LroState {
    LroState::new(
        method,
        Url::parse("https://vault.example.net/certificates/c1/create").unwrap(),
    )
    .with_endpoint(Url::parse(ENDPOINT).unwrap())
}

fn url(raw: &str) -> Option<Url> {
    Some(Url::parse(raw).unwrap())
}

// ---------------------------------------------------------------------------
// Operation resource
// ---------------------------------------------------------------------------

#[test]
fn operation_resource_reads_initial_headers() {
    let strategy = OperationResourceStrategy::default();
    let initial = reply(
        202,
        &[
            ("Operation-Location", "/operations/op-1"),
            ("Location", "/certificates/c1"),
            ("retry-after-ms", "15"),
        ],
        "",
    );
    let mut state = state(Method::PUT);

    assert!(strategy.can_poll(&initial));
    let first = strategy.on_initial_response(&initial, &mut state).unwrap();

    assert_eq!(first.status(), &OperationStatus::IN_PROGRESS);
    assert_eq!(first.retry_after(), Some(Duration::from_millis(15)));
    assert_eq!(state.poll_url, url("https://vault.example.net/operations/op-1"));
    assert_eq!(state.location_url, url("https://vault.example.net/certificates/c1"));
}

#[test]
fn operation_location_wins_over_azure_async_operation() {
    let initial = reply(
        201,
        &[
            ("Azure-AsyncOperation", "https://vault.example.net/azure/1"),
            ("Operation-Location", "https://vault.example.net/operations/1"),
        ],
        "",
    );

    let mut state_default = state(Method::PUT);
    OperationResourceStrategy::default()
        .on_initial_response(&initial, &mut state_default)
        .unwrap();
    assert_eq!(state_default.poll_url, url("https://vault.example.net/operations/1"));

    let mut state_custom = state(Method::PUT);
    OperationResourceStrategy::with_headers([HeaderName::from_static("azure-asyncoperation")])
        .on_initial_response(&initial, &mut state_custom)
        .unwrap();
    assert_eq!(state_custom.poll_url, url("https://vault.example.net/azure/1"));
}

#[test]
fn operation_resource_rejects_error_status() {
    let initial = reply(409, &[("Operation-Location", "/operations/1")], "conflict");
    let err = OperationResourceStrategy::default()
        .on_initial_response(&initial, &mut state(Method::PUT))
        .unwrap_err();

    match err {
        StrategyError::UnexpectedStatus { status, body } => {
            assert_eq!(status, StatusCode::CONFLICT);
            assert_eq!(body, "conflict");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn operation_resource_maps_body_status() {
    let strategy = OperationResourceStrategy::default();
    let pipeline = ScriptedPipeline::new(vec![
        reply(200, &[], r#"{"status":"Running"}"#),
        reply(
            200,
            &[],
            r#"{"status":"Succeeded","resourceLocation":"/certificates/c1/result"}"#,
        ),
    ]);
    let mut state = state(Method::POST);
    state.poll_url = url("https://vault.example.net/operations/op-1");

    let running = strategy.poll(pipeline.as_ref(), &mut state).await.unwrap();
    assert_eq!(running.status(), &OperationStatus::IN_PROGRESS);

    let done = strategy.poll(pipeline.as_ref(), &mut state).await.unwrap();
    assert!(done.is_complete());
    assert_eq!(state.final_url, url("https://vault.example.net/certificates/c1/result"));
    assert_eq!(
        pipeline.requests(),
        vec![
            (Method::GET, "https://vault.example.net/operations/op-1".to_string()),
            (Method::GET, "https://vault.example.net/operations/op-1".to_string()),
        ]
    );
}

#[tokio::test]
async fn operation_resource_requires_status_field() {
    let pipeline = ScriptedPipeline::new(vec![reply(200, &[], r#"{"state":"done"}"#)]);
    let mut state = state(Method::POST);
    state.poll_url = url("https://vault.example.net/operations/op-1");

    let err = OperationResourceStrategy::default()
        .poll(pipeline.as_ref(), &mut state)
        .await
        .unwrap_err();
    assert!(matches!(err, StrategyError::Decode { .. }));
}

#[tokio::test]
async fn operation_resource_final_result_order() {
    let strategy = OperationResourceStrategy::default();

    // resourceLocation first
    let pipeline = ScriptedPipeline::new(vec![reply(200, &[], r#"{"id":"from-resource"}"#)]);
    let mut with_resource = state(Method::POST);
    with_resource.final_url = url("https://vault.example.net/certificates/c1/result");
    with_resource.location_url = url("https://vault.example.net/certificates/c1");
    let result = strategy
        .final_result(pipeline.as_ref(), &with_resource)
        .await
        .unwrap();
    assert_eq!(result, json!({"id": "from-resource"}));
    assert_eq!(
        pipeline.requests()[0].1,
        "https://vault.example.net/certificates/c1/result"
    );

    // PUT reads the original request URL, even with a Location header
    let pipeline = ScriptedPipeline::new(vec![reply(200, &[], r#"{"id":"c1"}"#)]);
    let mut put = state(Method::PUT);
    put.location_url = url("https://vault.example.net/certificates/c1/pending");
    let result = strategy.final_result(pipeline.as_ref(), &put).await.unwrap();
    assert_eq!(result, json!({"id": "c1"}));
    assert_eq!(
        pipeline.requests()[0].1,
        "https://vault.example.net/certificates/c1/create"
    );

    // POST reads the initial Location
    let pipeline = ScriptedPipeline::new(vec![reply(200, &[], r#"{"id":"from-location"}"#)]);
    let mut post = state(Method::POST);
    post.location_url = url("https://vault.example.net/certificates/c1/pending");
    let result = strategy.final_result(pipeline.as_ref(), &post).await.unwrap();
    assert_eq!(result, json!({"id": "from-location"}));
    assert_eq!(
        pipeline.requests()[0].1,
        "https://vault.example.net/certificates/c1/pending"
    );

    // POST without any URL returns the last body, no request
    let pipeline = ScriptedPipeline::new(vec![]);
    let mut post = state(Method::POST);
    post.last_body = json!({"status": "Succeeded", "result": 7});
    let result = strategy.final_result(pipeline.as_ref(), &post).await.unwrap();
    assert_eq!(result["result"], 7);
    assert!(pipeline.requests().is_empty());
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

#[tokio::test]
async fn location_follows_moving_header_until_done() {
    let strategy = LocationStrategy;
    let pipeline = ScriptedPipeline::new(vec![
        reply(202, &[("Location", "/queue/2"), ("Retry-After", "1")], ""),
        reply(200, &[], r#"{"id":"c1"}"#),
    ]);
    let mut state = state(Method::POST);

    let first = strategy
        .on_initial_response(&reply(202, &[("Location", "/queue/1")], ""), &mut state)
        .unwrap();
    assert_eq!(first.status(), &OperationStatus::IN_PROGRESS);

    let second = strategy.poll(pipeline.as_ref(), &mut state).await.unwrap();
    assert_eq!(second.status(), &OperationStatus::IN_PROGRESS);
    assert_eq!(second.retry_after(), Some(Duration::from_secs(1)));
    assert_eq!(state.poll_url, url("https://vault.example.net/queue/2"));

    let done = strategy.poll(pipeline.as_ref(), &mut state).await.unwrap();
    assert!(done.is_complete());

    let result = strategy.final_result(pipeline.as_ref(), &state).await.unwrap();
    assert_eq!(result, json!({"id": "c1"}));
    assert_eq!(
        pipeline
            .requests()
            .into_iter()
            .map(|(_, uri)| uri)
            .collect::<Vec<_>>(),
        vec![
            "https://vault.example.net/queue/1".to_string(),
            "https://vault.example.net/queue/2".to_string(),
        ]
    );
}

#[tokio::test]
async fn location_fetches_result_when_final_body_is_empty() {
    let strategy = LocationStrategy;
    let pipeline = ScriptedPipeline::new(vec![
        reply(204, &[], ""),
        reply(200, &[], r#"{"id":"c1"}"#),
    ]);
    let mut state = state(Method::POST);
    strategy
        .on_initial_response(&reply(202, &[("Location", "/queue/1")], ""), &mut state)
        .unwrap();

    assert!(strategy.poll(pipeline.as_ref(), &mut state).await.unwrap().is_complete());
    let result = strategy.final_result(pipeline.as_ref(), &state).await.unwrap();

    assert_eq!(result, json!({"id": "c1"}));
    assert_eq!(pipeline.remaining(), 0);
}

#[tokio::test]
async fn location_rejects_server_errors() {
    let pipeline = ScriptedPipeline::new(vec![reply(500, &[], "boom")]);
    let mut state = state(Method::POST);
    state.poll_url = url("https://vault.example.net/queue/1");

    let err = LocationStrategy
        .poll(pipeline.as_ref(), &mut state)
        .await
        .unwrap_err();
    assert!(matches!(err, StrategyError::UnexpectedStatus { .. }));
}

// ---------------------------------------------------------------------------
// Status check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_check_completes_with_initial_response() {
    let strategy = StatusCheckStrategy;
    let pipeline = ScriptedPipeline::new(vec![]);
    let mut state = state(Method::PUT);

    let first = strategy
        .on_initial_response(&reply(201, &[], r#"{"id":"c1"}"#), &mut state)
        .unwrap();
    assert_eq!(first.status(), &OperationStatus::SUCCESSFULLY_COMPLETED);

    let result = strategy.final_result(pipeline.as_ref(), &state).await.unwrap();
    assert_eq!(result, json!({"id": "c1"}));

    let err = strategy.poll(pipeline.as_ref(), &mut state).await.unwrap_err();
    assert!(matches!(err, StrategyError::Unsupported { .. }));
}

#[test]
fn status_check_rejects_failures() {
    let err = StatusCheckStrategy
        .on_initial_response(&reply(404, &[], "missing"), &mut state(Method::GET))
        .unwrap_err();
    assert!(matches!(err, StrategyError::UnexpectedStatus { .. }));
}

// ---------------------------------------------------------------------------
// Chained
// ---------------------------------------------------------------------------

#[rstest::rstest]
#[case::operation_resource(reply(202, &[("Operation-Location", "/operations/1"), ("Location", "/c1")], ""), 0)]
#[case::location(reply(202, &[("Location", "/queue/1")], ""), 1)]
#[case::status_check(reply(200, &[], "{}"), 2)]
fn default_chain_selects_first_match(
    #[case] initial: lro_http::HttpResponse,
    #[case] expected: usize,
) {
    let mut state = state(Method::PUT);
    ChainedStrategy::default()
        .on_initial_response(&initial, &mut state)
        .unwrap();
    assert_eq!(state.selected_strategy, Some(expected));
}

#[tokio::test]
async fn chain_delegates_to_selected_strategy() {
    let chain = ChainedStrategy::default();
    let pipeline = ScriptedPipeline::new(vec![reply(200, &[], r#"{"status":"Failed"}"#)]);
    let mut state = state(Method::PUT);

    chain
        .on_initial_response(
            &reply(202, &[("Operation-Location", "/operations/1")], ""),
            &mut state,
        )
        .unwrap();
    let polled = chain.poll(pipeline.as_ref(), &mut state).await.unwrap();

    assert_eq!(polled.status(), &OperationStatus::FAILED);
}

#[tokio::test]
async fn chain_refuses_to_poll_before_selection() {
    let pipeline = ScriptedPipeline::new(vec![]);
    let err = ChainedStrategy::default()
        .poll(pipeline.as_ref(), &mut state(Method::PUT))
        .await
        .unwrap_err();
    assert!(matches!(err, StrategyError::Unsupported { .. }));
}

#[test]
fn chain_without_match_is_rejected() {
    let chain = ChainedStrategy::new(vec![Box::new(LocationStrategy)]).unwrap();
    let initial = reply(200, &[], "{}");

    assert!(!chain.can_poll(&initial));
    assert!(chain.on_initial_response(&initial, &mut state(Method::PUT)).is_err());
    assert!(ChainedStrategy::new(Vec::new()).is_err());
}
