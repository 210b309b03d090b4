use astro_core::interpret::{self, ChartInterpretations, ChartSummary, Interpretation};
use astro_core::search::search;
use astro_core::translate::{supported_languages, translate_term, translate_text, LanguageInfo};
use astro_core::{
    key_for, Category, EngineConfig, IndexService, Language, LegacyMatch, ResultCache, SearchMatch,
    SearchOptions,
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}
fn default_limit() -> usize { SearchOptions::default().limit }
fn default_min_score() -> f64 { SearchOptions::default().min_score }
fn default_lang() -> Language { Language::Pt }
fn default_source_lang() -> Language { Language::En }

#[derive(Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    /// Served from the result cache.
    pub cached: bool,
    pub results: Vec<SearchMatch>,
}

#[derive(Deserialize)]
pub struct InterpretParams {
    pub query: String,
}

#[derive(Deserialize)]
pub struct PlanetParams {
    pub planet: String,
    pub sign: String,
    pub house: u8,
    #[serde(default = "default_lang")]
    pub lang: Language,
}

#[derive(Deserialize)]
pub struct AspectParams {
    pub planet1: String,
    pub planet2: String,
    pub aspect: String,
    #[serde(default = "default_lang")]
    pub lang: Language,
}

#[derive(Deserialize)]
pub struct SignParams {
    pub sign: String,
    #[serde(default = "default_lang")]
    pub lang: Language,
}

#[derive(Deserialize)]
pub struct HouseParams {
    pub house: u8,
    #[serde(default = "default_lang")]
    pub lang: Language,
}

#[derive(Deserialize)]
pub struct TransitParams {
    pub transit_planet: String,
    pub natal_planet: String,
    pub aspect: String,
    #[serde(default = "default_lang")]
    pub lang: Language,
}

#[derive(Deserialize)]
pub struct LangParams {
    #[serde(default = "default_lang")]
    pub lang: Language,
}

#[derive(Serialize, Deserialize)]
pub struct TextInterpretation {
    pub interpretation: Option<String>,
}

#[derive(Deserialize)]
pub struct TermParams {
    pub term: String,
    pub category: String,
    #[serde(default = "default_lang")]
    pub lang: Language,
}

#[derive(Serialize, Deserialize)]
pub struct TermTranslation {
    pub term: String,
    pub category: Category,
    pub language: Language,
    pub translation: String,
}

#[derive(Deserialize)]
pub struct TextTranslationRequest {
    pub text: String,
    pub target: Language,
    #[serde(default = "default_source_lang")]
    pub source: Language,
}

#[derive(Serialize, Deserialize)]
pub struct TextTranslation {
    pub text: String,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IndexService>,
    pub cache: Arc<ResultCache>,
    pub admin_token: Option<String>,
}

impl AppState {
    /// Build the shared state and warm the index. Blocking; run it off the async runtime.
    pub fn new(config: EngineConfig, admin_token: Option<String>) -> Self {
        let cache = Arc::new(ResultCache::new(&config.cache_dir, config.cache_ttl));
        let service = Arc::new(IndexService::new(config));
        service.warm();
        Self { service, cache, admin_token }
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/search", get(search_handler))
        .route("/api/v1/interpret", get(interpret_handler))
        .route("/api/v1/interpretations/planet", get(planet_handler))
        .route("/api/v1/interpretations/aspect", get(aspect_handler))
        .route("/api/v1/interpretations/sign", get(sign_handler))
        .route("/api/v1/interpretations/house", get(house_handler))
        .route("/api/v1/interpretations/transit", get(transit_handler))
        .route("/api/v1/interpretations/chart", post(chart_handler))
        .route("/api/v1/translate/term", get(translate_term_handler))
        .route("/api/v1/translate/text", post(translate_text_handler))
        .route("/api/v1/languages", get(languages_handler))
        .route("/admin/reindex", post(reindex))
        .route("/admin/cache/clear", post(cache_clear))
        .route("/admin/cache/sweep", post(cache_sweep))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let opts = SearchOptions { limit: params.limit.clamp(1, 100), min_score: params.min_score };
    let q = params.q.clone();
    let (results, cached) = tokio::task::spawn_blocking(move || cached_search(&state, &q, opts))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let took_s = start.elapsed().as_secs_f64();
    Ok(Json(SearchResponse { query: params.q, took_s, total_hits: results.len(), cached, results }))
}

/// Search through the result cache. The key carries the index fingerprint, so answers
/// computed against different corpus contents never match, even across restarts.
fn cached_search(state: &AppState, q: &str, opts: SearchOptions) -> (Vec<SearchMatch>, bool) {
    let index = state.service.index();
    let key = key_for(
        "search",
        &serde_json::json!({
            "q": q,
            "limit": opts.limit,
            "min_score": opts.min_score,
            "index": index.fingerprint(),
        }),
    );
    let Some(key) = key else {
        return (search(&index, q, opts), false);
    };
    if let Some(hit) = state.cache.get::<Vec<SearchMatch>>(&key) {
        return (hit, true);
    }
    let results = search(&index, q, opts);
    state.cache.put(&key, &results);
    (results, false)
}

pub async fn interpret_handler(State(state): State<AppState>, Query(params): Query<InterpretParams>) -> Json<Vec<LegacyMatch>> {
    Json(state.service.simple_search(&params.query, default_limit()))
}

pub async fn planet_handler(State(state): State<AppState>, Query(p): Query<PlanetParams>) -> Result<Json<TextInterpretation>, ApiError> {
    check_house(p.house)?;
    let interpretation = interpret::planet(&state.service, &p.planet, &p.sign, p.house, p.lang);
    Ok(Json(TextInterpretation { interpretation }))
}

pub async fn aspect_handler(State(state): State<AppState>, Query(p): Query<AspectParams>) -> Json<TextInterpretation> {
    let interpretation = interpret::aspect(&state.service, &p.planet1, &p.planet2, &p.aspect, p.lang);
    Json(TextInterpretation { interpretation })
}

pub async fn sign_handler(State(state): State<AppState>, Query(p): Query<SignParams>) -> Json<Option<Interpretation>> {
    Json(interpret::sign(&state.service, &p.sign, p.lang))
}

pub async fn house_handler(State(state): State<AppState>, Query(p): Query<HouseParams>) -> Result<Json<Option<Interpretation>>, ApiError> {
    check_house(p.house)?;
    Ok(Json(interpret::house(&state.service, p.house, p.lang)))
}

pub async fn transit_handler(State(state): State<AppState>, Query(p): Query<TransitParams>) -> Json<Option<Interpretation>> {
    Json(interpret::transit(&state.service, &p.transit_planet, &p.natal_planet, &p.aspect, p.lang))
}

pub async fn chart_handler(
    State(state): State<AppState>,
    Query(p): Query<LangParams>,
    Json(summary): Json<ChartSummary>,
) -> Result<Json<ChartInterpretations>, ApiError> {
    for placement in &summary.placements {
        check_house(placement.house)?;
    }
    for &house in &summary.houses {
        check_house(house)?;
    }
    Ok(Json(interpret::chart(&state.service, &summary, p.lang)))
}

pub async fn translate_term_handler(Query(p): Query<TermParams>) -> Result<Json<TermTranslation>, ApiError> {
    let category: Category = p.category.parse().map_err(|e: anyhow::Error| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let translation = translate_term(&p.term, category, p.lang);
    Ok(Json(TermTranslation { term: p.term, category, language: p.lang, translation }))
}

pub async fn translate_text_handler(Json(req): Json<TextTranslationRequest>) -> Json<TextTranslation> {
    Json(TextTranslation { text: translate_text(&req.text, req.target, req.source) })
}

pub async fn languages_handler() -> Json<Vec<LanguageInfo>> {
    Json(supported_languages())
}

fn check_house(house: u8) -> Result<(), ApiError> {
    if (1..=12).contains(&house) {
        Ok(())
    } else {
        Err((StatusCode::BAD_REQUEST, format!("house must be between 1 and 12, got {house}")))
    }
}

// --- Admin endpoints ---
async fn reindex(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let service = state.service.clone();
    let index = tokio::task::spawn_blocking(move || service.rebuild())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(serde_json::json!({
        "documents": index.num_documents(),
        "paragraphs": index.num_paragraphs(),
        "terms": index.num_terms(),
    })))
}

async fn cache_clear(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    state.cache.clear();
    Ok(Json(serde_json::json!({ "cleared": true })))
}

async fn cache_sweep(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let removed = state.cache.clear_expired();
    Ok(Json(serde_json::json!({ "removed": removed })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
