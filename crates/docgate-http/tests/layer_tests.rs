//! Integration tests for `DocValidationLayer` driving a tower service.

use bytes::Bytes;
use docgate_http::{DocValidationLayer, QueryParsing, ValidatedQuery};
use docgate_validate::{Doc, ParamSpec, ParamType, Rule};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::{service_fn, Layer, ServiceExt};
use tracing_subscriber::layer::SubscriberExt;

const TOKEN: &str = "fc6d20d49ec2f447a46bd56b8c89b6asfa316e82491c4f5f31a31cd5d819b71f";

fn listing_doc() -> Doc {
    Doc::new("get")
        .param(
            ParamSpec::new("token", ParamType::String)
                .required()
                .rule(Rule::MinLength {
                    min: 16,
                    message: None,
                }),
        )
        .param(ParamSpec::new("limit", ParamType::Number).rule(Rule::Natural { message: None }))
        .param(ParamSpec::new("offset", ParamType::Number).rule(Rule::Natural { message: None }))
}

fn request(method: Method, query: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(format!("/items?{query}"))
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Run one request through the layer; returns status, JSON body and how
/// many times the inner service ran.
async fn run(layer: DocValidationLayer, req: Request<Full<Bytes>>) -> (StatusCode, Value, usize) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let inner = service_fn(move |req: Request<Full<Bytes>>| {
        counter.fetch_add(1, Ordering::SeqCst);
        let query = req
            .extensions()
            .get::<ValidatedQuery>()
            .cloned()
            .unwrap_or_default();
        async move {
            let body = serde_json::to_vec(&json!({ "seen": query.into_inner() })).unwrap();
            Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(body))))
        }
    });

    let response = layer.layer(inner).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body, calls.load(Ordering::SeqCst))
}

#[tokio::test]
async fn valid_request_reaches_inner_service() {
    let query = format!("token={TOKEN}&limit=5&offset=25");
    let (status, body, calls) = run(DocValidationLayer::new(listing_doc()), request(Method::GET, &query)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls, 1);
    assert_eq!(body["seen"]["limit"], json!(5));
    assert_eq!(body["seen"]["offset"], json!(25));
    assert_eq!(body["seen"]["token"], json!(TOKEN));
}

#[tokio::test]
async fn wrong_method_is_405() {
    let query = format!("token={TOKEN}&limit=5&offset=25");
    let (status, body, calls) = run(DocValidationLayer::new(listing_doc()), request(Method::POST, &query)).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(calls, 0);
    assert_eq!(body["error"]["type"], "validation_error");
    assert_eq!(body["error"]["code"], 1);
}

#[tokio::test]
async fn missing_token_is_400() {
    let (status, body, calls) = run(DocValidationLayer::new(listing_doc()), request(Method::GET, "limit=5&offset=25")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(calls, 0);
    assert_eq!(body["error"]["code"], 2);
    assert_eq!(body["error"]["param"], "token");
}

#[tokio::test]
async fn non_numeric_limit_is_400() {
    let query = format!("token={TOKEN}&limit=haha&offset=25");
    let (status, body, _) = run(DocValidationLayer::new(listing_doc()), request(Method::GET, &query)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 3);
    assert_eq!(body["error"]["param"], "limit");
}

#[tokio::test]
async fn short_token_is_422_with_reason() {
    let (status, body, calls) = run(DocValidationLayer::new(listing_doc()), request(Method::GET, "token=fc6d&limit=5")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(calls, 0);
    assert_eq!(body["error"]["code"], 4);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("too short, must be at least 16 length"));
}

#[tokio::test]
async fn undecodable_query_is_400_bad_request() {
    let query = format!("token={TOKEN}&%ff=%fe");
    let (status, body, calls) = run(DocValidationLayer::new(listing_doc()), request(Method::GET, &query)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("UTF-8"));
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn wrong_method_wins_over_undecodable_query() {
    let (status, body, calls) = run(DocValidationLayer::new(listing_doc()), request(Method::POST, "%ff=%fe")).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["type"], "validation_error");
    assert_eq!(body["error"]["code"], 1);
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn numeric_looking_token_stays_a_string() {
    let (status, body, _) = run(
        DocValidationLayer::new(listing_doc()),
        request(Method::GET, "token=12345678901234567890"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seen"]["token"], json!("12345678901234567890"));
}

#[tokio::test]
async fn strings_mode_rejects_numeric_params() {
    let layer = DocValidationLayer::new(listing_doc()).with_parsing(QueryParsing::Strings);
    let query = format!("token={TOKEN}&limit=5");
    let (status, body, _) = run(layer, request(Method::GET, &query)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 3);
}

#[tokio::test]
async fn clones_share_one_validator() {
    let layer = DocValidationLayer::new(listing_doc());
    let other = layer.clone();
    assert!(std::ptr::eq(layer.validator().doc(), other.validator().doc()));
}

#[derive(Clone, Default)]
struct EventCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        struct Visitor<'a>(&'a mut Vec<String>);

        impl tracing::field::Visit for Visitor<'_> {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                self.0.push(format!("{}={:?}", field.name(), value));
            }
        }

        let mut fields = vec![event.metadata().level().to_string()];
        event.record(&mut Visitor(&mut fields));
        self.messages.lock().unwrap().push(fields.join(" "));
    }
}

#[tokio::test]
async fn rejection_logs_a_warning() {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let (status, _, _) = run(DocValidationLayer::new(listing_doc()), request(Method::DELETE, "")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let messages = capture.messages.lock().unwrap();
    let warnings: Vec<_> = messages.iter().filter(|m| m.starts_with("WARN ")).collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Request rejected by doc"));
    assert!(warnings[0].contains("code=1"));
    assert!(warnings[0].contains("status=405"));
}

#[tokio::test]
async fn rejection_debug_event_carries_reason() {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let (status, _, _) = run(DocValidationLayer::new(listing_doc()), request(Method::GET, "token=short")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let messages = capture.messages.lock().unwrap();
    let debug = messages
        .iter()
        .find(|m| m.starts_with("DEBUG ") && m.contains("request rejected"))
        .expect("debug event for the rejection");
    assert!(debug.contains("code=4"));
    assert!(debug.contains("param=\"token\""));
    assert!(debug.contains("reason=query parameter \"token\" failed validation"));
}

// **Property: Rejected Requests Never Reach The Inner Service**
//
// For any query whose `limit` is not a natural number, the layer answers
// itself and the inner service is never called.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_bad_limit_never_reaches_inner(limit in "-[1-9][0-9]{0,4}|[a-z]{1,6}|[0-9]{1,3}\\.[1-9]") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let query = format!("token={TOKEN}&limit={limit}");
        let (status, body, calls) = rt.block_on(run(
            DocValidationLayer::new(listing_doc()),
            request(Method::GET, &query),
        ));

        prop_assert!(status.is_client_error());
        prop_assert_eq!(calls, 0);
        prop_assert_eq!(&body["error"]["param"], &json!("limit"));
    }
}
