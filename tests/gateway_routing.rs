//! End-to-end routing through the gateway front door.

use axum::http::StatusCode;
use serde_json::Value;

mod common;

use common::{
    client, closed_port, config, service, spawn_backend, spawn_backend_with_health, start_gateway,
};

#[tokio::test]
async fn test_routes_to_healthy_instances_and_aliases() {
    let a1 = spawn_backend("A1").await;
    let d1 = closed_port().await;
    let d2 = spawn_backend("D2").await;

    let mut cfg = config(vec![service("auth", &[a1]), service("documents", &[d1, d2])]);
    cfg.routing.aliases.insert("login".into(), "auth".into());
    let gw = start_gateway(cfg).await;
    gw.mark(a1, true);
    gw.mark(d1, false);
    gw.mark(d2, true);

    let client = client();

    for _ in 0..3 {
        let res = client.get(gw.url("/documents/list")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["backend"], "D2");
        assert_eq!(body["path"], "/list");
    }

    let res = client.get(gw.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["backend"], "A1");
    assert_eq!(body["path"], "/login");

    let health: Value = client
        .get(gw.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["healthy_services"], 2);
    assert_eq!(health["total_services"], 2);
    assert_eq!(health["services"]["documents"], "healthy");
}

#[tokio::test]
async fn test_round_robin_across_instances() {
    let b1 = spawn_backend("B1").await;
    let b2 = spawn_backend("B2").await;
    let gw = start_gateway(config(vec![service("analytics", &[b1, b2])])).await;
    gw.mark(b1, true);
    gw.mark(b2, true);

    let client = client();
    let mut seen = Vec::new();
    for _ in 0..4 {
        let body: Value = client
            .get(gw.url("/analytics/report"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        seen.push(body["backend"].as_str().unwrap().to_string());
    }
    assert_eq!(seen, vec!["B1", "B2", "B1", "B2"]);
}

#[tokio::test]
async fn test_forwards_method_body_query_and_headers() {
    let backend = spawn_backend("D").await;
    let gw = start_gateway(config(vec![service("documents", &[backend])])).await;
    gw.mark(backend, true);

    let res = client()
        .post(gw.url("/documents/upload?tag=invoice"))
        .header("authorization", "Bearer secret")
        .header("x-request-id", "req-42")
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "req-42");

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["method"], "POST");
    assert_eq!(body["path"], "/upload?tag=invoice");
    assert_eq!(body["body"], "payload");
    assert_eq!(body["authorization"], "Bearer secret");
    assert_eq!(body["x_request_id"], "req-42");
    assert_eq!(body["host"], backend.to_string());
    assert_eq!(body["x_forwarded_for"], "127.0.0.1");
}

#[tokio::test]
async fn test_generates_request_id() {
    let backend = spawn_backend("D").await;
    let gw = start_gateway(config(vec![service("documents", &[backend])])).await;

    let res = client().get(gw.url("/documents/1")).send().await.unwrap();
    let echoed = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["x_request_id"], echoed.as_str());
    assert!(uuid::Uuid::parse_str(&echoed).is_ok());
}

#[tokio::test]
async fn test_relays_backend_error_status_verbatim() {
    let backend = spawn_backend_with_health("D", StatusCode::SERVICE_UNAVAILABLE).await;
    let gw = start_gateway(config(vec![service("documents", &[backend])])).await;

    // `/documents/health` reaches the backend as `/health`, which answers 503.
    let res = client().get(gw.url("/documents/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_root_and_services_listing() {
    let a1 = spawn_backend("A1").await;
    let mut cfg = config(vec![service("auth", &[a1]), service("search", &[])]);
    cfg.gateway.name = "edge".into();
    cfg.routing.aliases.insert("profile".into(), "auth".into());
    cfg.services[0].priority = 2;
    let gw = start_gateway(cfg).await;
    gw.mark(a1, true);

    let client = client();
    let root: Value = client.get(gw.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(root["service"], "edge");
    assert_eq!(root["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(root["services"], serde_json::json!(["auth", "search"]));

    let services: Value = client
        .get(gw.url("/services"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let auth = &services["auth"];
    assert_eq!(auth["healthy_instances"], 1);
    assert_eq!(auth["priority"], 2);
    assert_eq!(auth["health_endpoint"], "/health");
    assert_eq!(auth["status"], "healthy");
    assert_eq!(auth["aliases"], serde_json::json!(["profile"]));
    assert_eq!(auth["instances"][0]["address"], format!("http://{}", a1));
    assert_eq!(auth["instances"][0]["healthy"], true);
    assert_eq!(services["search"]["status"], "unhealthy");
    assert_eq!(services["search"]["instances"], serde_json::json!([]));
}

#[tokio::test]
async fn test_health_degraded_below_threshold() {
    let a = spawn_backend("A").await;
    let b = spawn_backend("B").await;
    let c = spawn_backend("C").await;
    let gw = start_gateway(config(vec![
        service("auth", &[a]),
        service("documents", &[b]),
        service("ocr", &[c]),
    ]))
    .await;
    gw.mark(a, true);
    gw.mark(b, true);
    gw.mark(c, false);

    let health: Value = client()
        .get(gw.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // 2/3 < 0.7
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["healthy_services"], 2);
    assert_eq!(health["services"]["ocr"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_dump() {
    let a1 = spawn_backend("A1").await;
    let d1 = closed_port().await;
    let gw = start_gateway(config(vec![service("auth", &[a1]), service("documents", &[d1])])).await;
    gw.mark(a1, true);
    gw.mark(d1, false);

    let res = client().get(gw.url("/metrics")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let text = res.text().await.unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        format!("gateway_service_health{{service=\"auth\",instance=\"http://{}\"}} 1", a1)
    );
    assert_eq!(
        lines[1],
        format!("gateway_service_health{{service=\"documents\",instance=\"http://{}\"}} 0", d1)
    );
    assert!(lines[2].starts_with("gateway_uptime_seconds "));
}
