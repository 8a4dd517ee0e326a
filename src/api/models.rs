use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub available: bool,
    pub rag_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnhanceResponse {
    /// The request to forward: a JSON value, or a string when the input was not JSON.
    pub body: Value,
    pub sources: BTreeMap<String, String>,
    pub success: bool,
}
