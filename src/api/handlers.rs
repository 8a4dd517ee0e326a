use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::data_models::SearchResult;
use crate::web_context::{WebContextService, extract_web_search_parameter};

use super::models::{EnhanceResponse, HealthResponse, RetrieveRequest};

pub async fn health_handler(State(service): State<Arc<WebContextService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        available: service.is_available().await,
        rag_enabled: service.resolver().is_rag_enabled(),
    })
}

pub async fn retrieve_handler(
    State(service): State<Arc<WebContextService>>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<SearchResult>, (StatusCode, String)> {
    let start = Instant::now();

    if request.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query cannot be empty".to_string()));
    }

    let pipeline = service.resolver().pipeline().await.ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Web retrieval is not available".to_string(),
        )
    })?;

    let max_results = request
        .max_results
        .unwrap_or(service.resolver().config().max_results);
    let result = pipeline
        .retrieve_context(request.query.trim(), max_results)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("Retrieval error: {:#}", e)))?;

    log::info!(
        "retrieve {:?} answered in {}ms",
        request.query,
        start.elapsed().as_millis()
    );
    Ok(Json(result))
}

fn body_to_value(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

pub async fn enhance_handler(
    State(service): State<Arc<WebContextService>>,
    raw: Bytes,
) -> Json<EnhanceResponse> {
    let (body, enabled) = extract_web_search_parameter(&raw);
    // an explicit `enable_web_search: false` opts the request out
    let opted_out = body.as_slice() != raw.as_ref() && !enabled;
    if opted_out {
        return Json(EnhanceResponse {
            body: body_to_value(&body),
            sources: BTreeMap::new(),
            success: false,
        });
    }

    let outcome = service.enhance_request(&body).await;
    Json(EnhanceResponse {
        body: body_to_value(&outcome.body),
        sources: outcome.sources,
        success: outcome.success,
    })
}
