use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use lineupscout_web::router;
use serde_json::Value;
use tower::util::ServiceExt;

use crate::fixtures::Harness;

async fn body_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_route_responds() {
    let h = Harness::new();

    let response = router(h.state.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn dispatch_route_accepts_camel_case_body() {
    let h = Harness::new();
    h.artist(1, "Fever Ray", Some("UC1")).await;

    let response = router(h.state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/youtube/dispatch")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"artistIds": [1]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["total_jobs"], 1);
    assert_eq!(stats["quota_exhausted"], false);
}

#[tokio::test]
async fn unknown_artist_gets_error_body() {
    let h = Harness::new();

    let response = router(h.state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/artists/99/youtube/vevo-check")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "artist 99 not found");
}

#[tokio::test]
async fn quota_route_reports_the_daily_limit() {
    let h = Harness::new();

    let response = router(h.state.clone())
        .oneshot(Request::builder().uri("/api/youtube/quota").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = body_json(response).await;
    assert_eq!(status["limit"], 10_000);
    assert_eq!(status["used"], 0);
}
