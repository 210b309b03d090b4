use astro_core::{EngineConfig, Language};
use astro_server::{build_app, AppState};
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn tiny_app() -> (TempDir, Router) {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("texts");
    fs::create_dir_all(&corpus).unwrap();
    fs::write(
        corpus.join("signos.txt"),
        "O Sol em Áries traz coragem.\n\n\
         A Lua em Câncer traz sensibilidade.\n\n\
         O signo de Áries tem características de liderança.",
    )
    .unwrap();
    let app = app_on(dir.path());
    (dir, app)
}

/// A fresh process over `root/texts`, sharing the cache directory `root/cache`.
fn app_on(root: &Path) -> Router {
    let config = EngineConfig {
        corpus_dir: root.join("texts"),
        corpus_language: Language::Pt,
        cache_dir: root.join("cache"),
        ..EngineConfig::default()
    };
    build_app(AppState::new(config, Some("secret".into())))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Bytes) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Bytes) {
    let req = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (_dir, app) = tiny_app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn search_ranks_and_caches() {
    let (_dir, app) = tiny_app();
    let uri = "/api/v1/search?q=Sol%20%C3%81ries";

    let (status, body) = get(&app, uri).await;
    assert_eq!(status, StatusCode::OK);
    let first = json(&body);
    assert_eq!(first["total_hits"], 1);
    assert_eq!(first["cached"], false);
    let hit = &first["results"][0];
    assert_eq!(hit["source"], "signos.txt");
    assert_eq!(hit["paragraph_index"], 0);
    assert_eq!(hit["highlighted"], "O **SOL** em **ÁRIES** traz coragem.");

    let (_, body) = get(&app, uri).await;
    let second = json(&body);
    assert_eq!(second["cached"], true);
    assert_eq!(second["results"], first["results"]);
}

#[tokio::test]
async fn restart_on_edited_corpus_ignores_earlier_answers() {
    let (dir, app) = tiny_app();
    let (_, body) = get(&app, "/api/v1/search?q=Sol").await;
    assert_eq!(json(&body)["total_hits"], 1);

    fs::write(
        dir.path().join("texts/signos.txt"),
        "A Lua em Câncer traz sensibilidade.\n\nMarte em Leão age rápido.",
    )
    .unwrap();
    let restarted = app_on(dir.path());
    let (status, body) = get(&restarted, "/api/v1/search?q=Sol").await;
    assert_eq!(status, StatusCode::OK);
    let out = json(&body);
    assert_eq!(out["cached"], false);
    assert_eq!(out["total_hits"], 0);

    // An unchanged corpus still reuses the disk entry after a restart.
    let (_, body) = get(&app_on(dir.path()), "/api/v1/search?q=Sol").await;
    assert_eq!(json(&body)["cached"], true);
}

#[tokio::test]
async fn search_limit_is_clamped() {
    let (_dir, app) = tiny_app();
    let (status, body) = get(&app, "/api/v1/search?q=traz&limit=0&min_score=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["total_hits"], 1);
}

#[tokio::test]
async fn legacy_interpret_groups_by_file() {
    let (_dir, app) = tiny_app();
    let (status, body) = get(&app, "/api/v1/interpret?query=Lua").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json(&body);
    let arr = arr.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["source"], "signos.txt");
    assert_eq!(arr[0]["matched_terms"][0], "lua");
}

#[tokio::test]
async fn sign_lookup_uses_corpus_language() {
    let (_dir, app) = tiny_app();
    let (status, body) = get(&app, "/api/v1/interpretations/sign?sign=Aries&lang=pt").await;
    assert_eq!(status, StatusCode::OK);
    let interp = json(&body);
    assert_eq!(interp["source"], "signos.txt");
    assert_eq!(interp["text"], "O signo de Áries tem características de liderança.");
}

#[tokio::test]
async fn unmatched_planet_is_null() {
    let (_dir, app) = tiny_app();
    let (status, body) = get(&app, "/api/v1/interpretations/planet?planet=Pluto&sign=Leo&house=5&lang=pt").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json(&body)["interpretation"].is_null());
}

#[tokio::test]
async fn house_out_of_range_is_rejected() {
    let (_dir, app) = tiny_app();
    let (status, _) = get(&app, "/api/v1/interpretations/house?house=13").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/api/v1/interpretations/house?house=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn term_translation() {
    let (_dir, app) = tiny_app();
    let (status, body) = get(&app, "/api/v1/translate/term?term=Sun&category=planet&lang=pt").await;
    assert_eq!(status, StatusCode::OK);
    let out = json(&body);
    assert_eq!(out["translation"], "Sol");
    assert_eq!(out["category"], "planet");

    let (status, _) = get(&app, "/api/v1/translate/term?term=Sun&category=comet&lang=pt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn text_translation_defaults_to_english_source() {
    let (_dir, app) = tiny_app();
    let (status, body) = post_json(
        &app,
        "/api/v1/translate/text",
        serde_json::json!({ "text": "The Sun in Aries", "target": "pt" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["text"], "The Sol in Áries");
}

#[tokio::test]
async fn lists_six_languages() {
    let (_dir, app) = tiny_app();
    let (_, body) = get(&app, "/api/v1/languages").await;
    assert_eq!(json(&body).as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn admin_routes_require_token() {
    let (_dir, app) = tiny_app();
    let (status, _) = send(&app, Request::post("/admin/reindex").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/admin/reindex")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let stats = json(&body);
    assert_eq!(stats["documents"], 1);
    assert_eq!(stats["paragraphs"], 3);

    let req = Request::post("/admin/cache/sweep")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["removed"], 0);
}
