//! Request handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::Html;
use axum::Json;
use ndarray::Array2;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::PREDICTION_FEATURES;

use super::error::{Result, ServerError};
use super::state::AppState;

const POSITIVE_TEXT: &str = "Survived";
const NEGATIVE_TEXT: &str = "Did not survive";

// ============================================================================
// Prediction
// ============================================================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let payload = parse_payload(&headers, &body)?;

    // Coerce each expected feature independently; anything absent or
    // non-numeric becomes 0.0.
    let mut input_data = Map::new();
    let mut features = Vec::with_capacity(PREDICTION_FEATURES.len());
    for name in PREDICTION_FEATURES {
        let value = payload.get(name).map_or(0.0, coerce_to_f64);
        input_data.insert(name.to_string(), json!(value));
        features.push(value);
    }

    let x = Array2::from_shape_vec((1, features.len()), features)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;

    let classifier = &state.model.artifact.classifier;
    let prediction = classifier
        .predict(&x)
        .map_err(|e| ServerError::BadRequest(e.to_string()))?[0]
        .round() as i64;

    // Best effort only; families without probability estimates are fine
    let probability = classifier.predict_proba(&x).ok().map(|p| p[0]);

    debug!(prediction, ?probability, "Served prediction");

    let mut response = Map::new();
    response.insert("prediction".to_string(), json!(prediction));
    response.insert(
        "prediction_text".to_string(),
        json!(if prediction == 1 {
            POSITIVE_TEXT
        } else {
            NEGATIVE_TEXT
        }),
    );
    response.insert("input_data".to_string(), Value::Object(input_data));
    if let Some(p) = probability {
        response.insert("probability".to_string(), json!(p));
    }

    Ok(Json(Value::Object(response)))
}

/// Accepts a JSON object or a form-encoded body. Requests without a usable
/// content type get one parse attempt of each before rejection.
fn parse_payload(headers: &HeaderMap, body: &[u8]) -> Result<Map<String, Value>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") {
        return parse_json(body);
    }
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return parse_form(body);
    }
    parse_json(body).or_else(|_| parse_form(body)).map_err(|_| {
        ServerError::BadRequest(format!(
            "unsupported request body (content type '{}'); send a JSON object or form data",
            content_type
        ))
    })
}

fn parse_json(body: &[u8]) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("invalid JSON body: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ServerError::BadRequest(format!(
            "expected a JSON object, got: {}",
            other
        ))),
    }
}

fn parse_form(body: &[u8]) -> Result<Map<String, Value>> {
    // Reject bodies that are clearly not key=value pairs: serde_urlencoded
    // happily parses arbitrary text as a single valueless key.
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| ServerError::BadRequest(format!("invalid form body: {}", e)))?;
    if !pairs.is_empty() && pairs.iter().all(|(_, v)| v.is_empty()) {
        return Err(ServerError::BadRequest(
            "request body is not form-encoded".to_string(),
        ));
    }
    Ok(pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect())
}

fn coerce_to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

// ============================================================================
// Health and metadata
// ============================================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model_status": state.model_status(),
        "port": state.config.port,
    }))
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let artifact = &state.model.artifact;

    let (feature_names, feature_count) = match &artifact.feature_names {
        Some(names) => (json!(names), names.len()),
        None => (json!("not available"), artifact.classifier.n_features()),
    };

    Ok(Json(json!({
        "model": artifact.classifier.class_name(),
        "feature_names": feature_names,
        "feature_count": feature_count,
    })))
}

// ============================================================================
// Landing page
// ============================================================================

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>tabflow</title>
  <style>
    body { font-family: system-ui, sans-serif; max-width: 40rem; margin: 4rem auto; color: #222; }
    code { background: #f4f4f4; padding: 0.1rem 0.3rem; border-radius: 3px; }
    li { margin: 0.4rem 0; }
  </style>
</head>
<body>
  <h1>tabflow</h1>
  <p>Model is running.</p>
  <ul>
    <li><code>GET /health</code> &mdash; liveness and model status</li>
    <li><code>GET /model-info</code> &mdash; served model metadata</li>
    <li><code>POST /predict</code> &mdash; JSON or form payload with
        Pclass, Sex, Age, SibSp, Parch, Fare, Embarked</li>
  </ul>
</body>
</html>
"#;
