use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::context::{extract_query, inject_context};
use crate::resolver::ProviderResolver;

/// Result of enhancing one request. `body` is always safe to forward upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhanceOutcome {
    pub body: Vec<u8>,
    pub sources: BTreeMap<String, String>,
    pub success: bool,
}

impl EnhanceOutcome {
    fn unchanged(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            sources: BTreeMap::new(),
            success: false,
        }
    }
}

/// Removes a client supplied `enable_web_search` flag and reports its value.
/// Non-JSON bodies and bodies without the flag come back unchanged.
pub fn extract_web_search_parameter(body: &[u8]) -> (Vec<u8>, bool) {
    let Ok(mut data) = serde_json::from_slice::<Value>(body) else {
        return (body.to_vec(), false);
    };
    let Some(flag) = data
        .as_object_mut()
        .and_then(|obj| obj.shift_remove("enable_web_search"))
    else {
        return (body.to_vec(), false);
    };
    let enabled = match flag {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    };
    match serde_json::to_vec(&data) {
        Ok(bytes) => (bytes, enabled),
        Err(_) => (body.to_vec(), enabled),
    }
}

/// Request-level entry point: find the question, run the pipeline, inject the
/// context. Every failure fails open and hands back the original body.
pub struct WebContextService {
    resolver: Arc<ProviderResolver>,
}

impl WebContextService {
    pub fn new(resolver: Arc<ProviderResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<ProviderResolver> {
        &self.resolver
    }

    pub async fn is_available(&self) -> bool {
        match self.resolver.pipeline().await {
            Some(pipeline) => pipeline.check_availability().await,
            None => false,
        }
    }

    pub async fn enhance_request(&self, body: &[u8]) -> EnhanceOutcome {
        self.enhance_request_with_cancel(body, CancellationToken::new())
            .await
    }

    pub async fn enhance_request_with_cancel(
        &self,
        body: &[u8],
        cancel: CancellationToken,
    ) -> EnhanceOutcome {
        if !self.resolver.is_rag_enabled() {
            log::debug!("web rag disabled, forwarding request unchanged");
            return EnhanceOutcome::unchanged(body);
        }

        let query = match serde_json::from_slice::<Value>(body) {
            Ok(data) => data
                .get("messages")
                .and_then(Value::as_array)
                .and_then(|messages| extract_query(messages)),
            Err(e) => {
                log::warn!("cannot parse request body for web context: {e}");
                return EnhanceOutcome::unchanged(body);
            }
        };
        let Some(query) = query else {
            log::warn!("no user query found for web search enhancement");
            return EnhanceOutcome::unchanged(body);
        };

        let Some(pipeline) = self.resolver.pipeline().await else {
            log::warn!("web rag pipeline unavailable, forwarding request unchanged");
            return EnhanceOutcome::unchanged(body);
        };

        let max_results = self.resolver.config().max_results;
        let result = match pipeline
            .retrieve_context_with_cancel(&query, max_results, cancel)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                log::error!("web context retrieval failed for {query:?}: {e:#}");
                return EnhanceOutcome::unchanged(body);
            }
        };

        let (body, sources) = inject_context(body, &result, &query);
        let success = !sources.is_empty();
        EnhanceOutcome {
            body,
            sources,
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_web_search_parameter() {
        let body = serde_json::to_vec(&json!({"model": "m", "enable_web_search": true})).unwrap();
        let (stripped, enabled) = extract_web_search_parameter(&body);
        assert!(enabled);
        let value: Value = serde_json::from_slice(&stripped).unwrap();
        assert_eq!(value, json!({"model": "m"}));

        let (same, enabled) = extract_web_search_parameter(b"not json");
        assert_eq!(same, b"not json");
        assert!(!enabled);

        let body = br#"{"model":"m"}"#;
        assert_eq!(extract_web_search_parameter(body), (body.to_vec(), false));
    }

    #[test]
    fn test_stripping_the_flag_keeps_key_order() {
        let body = br#"{"stream":true,"enable_web_search":"yes","model":"m","messages":[]}"#;
        let (stripped, enabled) = extract_web_search_parameter(body);
        assert!(enabled);
        assert_eq!(stripped, br#"{"stream":true,"model":"m","messages":[]}"#);
    }
}
