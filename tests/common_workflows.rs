//! Integration tests for common Girder workflows.
//!
//! These tests verify that the most common use cases work correctly through
//! the facade crate.

use girder::prelude::*;
use std::sync::Arc;

// =============================================================================
// Helpers
// =============================================================================

async fn list_orders(_req: HttpRequest) -> Result<HttpResponse> {
    HttpResponse::ok().with_json(&serde_json::json!([{"id": 1}, {"id": 2}]))
}

async fn show_order(req: HttpRequest) -> Result<HttpResponse> {
    match req.param("id").map(String::as_str) {
        Some("1") => HttpResponse::ok().with_json(&serde_json::json!({"id": 1})),
        Some(id) => Err(HttpExceptionResponse::not_found()
            .with_detail(format!("order {} does not exist", id))
            .with_additional("order_id", id)
            .into()),
        None => Err(Error::BadRequest("missing order id".into())),
    }
}

fn orders() -> Router {
    Router::new().with_provider(
        RouteCollection::new()
            .route(RouteDefinition::get("/orders", list_orders).name("orders.index"))
            .route(RouteDefinition::get("/orders/{id}", show_order).name("orders.show")),
    )
}

fn get(path: &str) -> HttpRequest {
    HttpRequest::new("GET".to_string(), path.to_string())
}

// =============================================================================
// Routing workflows
// =============================================================================

#[test]
fn test_resolve_request_and_name() {
    let router = orders();

    let found = router.resolve_for_request("GET", "/orders/1").unwrap();
    assert_eq!(found.route_match().route_name(), Some("orders.show"));

    let by_name = router.resolve_by_name("orders.index").unwrap();
    assert_eq!(by_name.route_match().definition().path(), "/orders");

    let not_allowed = router.resolve_for_request("POST", "/orders").unwrap();
    assert_eq!(not_allowed.allowed_methods(), &[HttpMethod::GET]);
}

// =============================================================================
// Pipeline workflows
// =============================================================================

#[tokio::test]
async fn test_handler_exception_becomes_problem_details() {
    let pipeline = HttpPipeline::builder(orders()).warm_up(true).build().unwrap();
    let response = pipeline.handle(get("/orders/9")).await;

    assert_eq!(response.status, 404);
    let body: serde_json::Value = serde_json::from_slice(response.body_bytes().unwrap()).unwrap();
    assert_eq!(body["detail"], "order 9 does not exist");
    assert_eq!(body["order_id"], "9");
    assert_eq!(body["type"], "https://httpstatuses.io/404");
}

struct RequireApiKey;

#[async_trait]
impl Middleware for RequireApiKey {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse> {
        if req.header("X-Api-Key") == Some("secret") {
            next(req).await
        } else {
            Err(Error::Unauthorized("missing API key".into()))
        }
    }
}

#[tokio::test]
async fn test_application_middleware_wraps_every_route() {
    let pipeline = HttpPipeline::builder(Arc::new(orders()))
        .middleware(RequireApiKey)
        .strategy(ErrorFormat::Text.strategy())
        .build()
        .unwrap();

    let rejected = pipeline.handle(get("/orders")).await;
    assert_eq!(rejected.status, 401);
    assert_eq!(rejected.body_string().as_deref(), Some("HTTP 401: Unauthorized"));

    let accepted = pipeline
        .handle(get("/orders").with_header("X-Api-Key", "secret"))
        .await;
    assert_eq!(accepted.status, 200);
}

#[tokio::test]
async fn test_preflight_skips_application_middleware() {
    let pipeline = HttpPipeline::builder(orders())
        .middleware(RequireApiKey)
        .build()
        .unwrap();

    let response = pipeline
        .handle(HttpRequest::new("OPTIONS".into(), "/orders".into()))
        .await;
    assert_eq!(response.status, 204);
    assert_eq!(response.header("Allow"), Some("OPTIONS, GET"));
}

#[tokio::test]
async fn test_full_response_is_written_with_content_length() {
    let pipeline = HttpPipeline::builder(orders()).build().unwrap();
    let mut output = Vec::new();
    pipeline.serve(get("/orders/1"), &mut output).await.unwrap();

    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Length: 8\r\n"));
    assert!(text.ends_with("{\"id\":1}"));
}

// =============================================================================
// Configuration workflows
// =============================================================================

#[cfg(feature = "config")]
#[tokio::test]
async fn test_pipeline_from_config_service() {
    let service = ConfigService::builder()
        .default_value("http.error_format", "text")
        .default_value("http.preflight_max_age", 60)
        .build()
        .unwrap();
    let settings = service.http_settings().unwrap();

    let pipeline = HttpPipelineBuilder::from_settings(orders(), &settings)
        .build()
        .unwrap();

    let missing = pipeline.handle(get("/customers")).await;
    assert_eq!(missing.body_string().as_deref(), Some("HTTP 404: Not Found"));

    let preflight = pipeline
        .handle(HttpRequest::new("OPTIONS".into(), "/orders/1".into()))
        .await;
    assert_eq!(preflight.header("Access-Control-Max-Age"), Some("60"));
}
