//! Best-effort translation of applicant-facing text into Indian languages.
//!
//! An external provider is tried first when credentials are configured; the
//! local dictionary of credit terms covers Hindi, Telugu and Tamil otherwise.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response};
use axum::{routing::get, routing::post, Router};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::TranslationConfig;

pub const SUPPORTED_LANGUAGES: [(&str, &str); 13] = [
    ("en", "English"),
    ("hi", "Hindi"),
    ("bn", "Bengali"),
    ("te", "Telugu"),
    ("ta", "Tamil"),
    ("gu", "Gujarati"),
    ("kn", "Kannada"),
    ("ml", "Malayalam"),
    ("mr", "Marathi"),
    ("or", "Odia"),
    ("pa", "Punjabi"),
    ("as", "Assamese"),
    ("ur", "Urdu"),
];

const DICTIONARY_CONFIDENCE: f64 = 0.7;
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

const HINDI_TERMS: &[(&str, &str)] = &[
    ("credit score", "क्रेडिट स्कोर"),
    ("loan application", "ऋण आवेदन"),
    ("interest rate", "ब्याज दर"),
    ("monthly income", "मासिक आय"),
    ("approved", "स्वीकृत"),
    ("rejected", "अस्वीकृत"),
    ("pending", "लंबित"),
    ("documents required", "आवश्यक दस्तावेज"),
    ("repayment", "पुनर्भुगतान"),
    ("financial guidance", "वित्तीय मार्गदर्शन"),
];

const TELUGU_TERMS: &[(&str, &str)] = &[
    ("credit score", "క్రెడిట్ స్కోర్"),
    ("loan application", "రుణ దరఖాస్తు"),
    ("interest rate", "వడ్డీ రేటు"),
    ("monthly income", "నెలవారీ ఆదాయం"),
    ("approved", "ఆమోదించబడింది"),
    ("rejected", "తిరస్కరించబడింది"),
    ("pending", "పెండింగ్"),
    ("documents required", "అవసరమైన పత్రాలు"),
    ("repayment", "తిరిగి చెల్లింపు"),
    ("financial guidance", "ఆర్థిక మార్గదర్శకత్వం"),
];

const TAMIL_TERMS: &[(&str, &str)] = &[
    ("credit score", "கடன் மதிப்பெண்"),
    ("loan application", "கடன் விண்ணப்பம்"),
    ("interest rate", "வட்டி விகிதம்"),
    ("monthly income", "மாதாந்திர வருமானம்"),
    ("approved", "அங்கீகரிக்கப்பட்டது"),
    ("rejected", "நிராகரிக்கப்பட்டது"),
    ("pending", "நிலுவையில்"),
    ("documents required", "தேவையான ஆவணங்கள்"),
    ("repayment", "திருப்பிச் செலுத்துதல்"),
    ("financial guidance", "நிதி வழிகாட்டுதல்"),
];

pub fn is_supported(code: &str) -> bool {
    language_name(code).is_some()
}

pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, name)| *name)
}

fn dictionary(target: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match target {
        "hi" => Some(HINDI_TERMS),
        "te" => Some(TELUGU_TERMS),
        "ta" => Some(TAMIL_TERMS),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationMethod {
    ExternalApi,
    FallbackDictionary,
    NoTranslationNeeded,
    NoTranslation,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationOutcome {
    pub success: bool,
    pub original_text: String,
    /// Always populated; equals the input when nothing was translated.
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub translation_method: TranslationMethod,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedLanguage {
    pub detected_language: &'static str,
    pub language_name: &'static str,
    pub confidence: f64,
    pub method: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("translation provider returned status {0}")]
    Status(u16),
    #[error("translation provider response had no `translated_text`")]
    MissingText,
}

/// External translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError>;
}

/// Bearer-authenticated JSON provider.
pub struct HttpTranslationProvider {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpTranslationProvider {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(PROVIDER_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl TranslationProvider for HttpTranslationProvider {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "text": text,
                "source_language": source,
                "target_language": target,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        body.get("translated_text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(TranslationError::MissingText)
    }
}

#[derive(Clone, Default)]
pub struct TranslationService {
    provider: Option<Arc<dyn TranslationProvider>>,
}

impl TranslationService {
    pub fn new(provider: Option<Arc<dyn TranslationProvider>>) -> Self {
        Self { provider }
    }

    /// Dictionary-only service.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn from_config(config: &TranslationConfig) -> Result<Self, reqwest::Error> {
        let provider = match (&config.api_url, &config.api_key) {
            (Some(url), Some(key)) => {
                let provider: Arc<dyn TranslationProvider> =
                    Arc::new(HttpTranslationProvider::new(url.clone(), key.clone())?);
                Some(provider)
            }
            _ => None,
        };
        Ok(Self::new(provider))
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn translate(&self, text: &str, source: &str, target: &str) -> TranslationOutcome {
        let outcome = |success, translated: String, method, confidence, error: Option<String>| {
            TranslationOutcome {
                success,
                original_text: text.to_string(),
                translated_text: translated,
                source_language: source.to_string(),
                target_language: target.to_string(),
                translation_method: method,
                confidence,
                error,
            }
        };

        for (role, code) in [("source", source), ("target", target)] {
            if !is_supported(code) {
                return outcome(
                    false,
                    text.to_string(),
                    TranslationMethod::Unsupported,
                    0.0,
                    Some(format!("Unsupported {role} language: {code}")),
                );
            }
        }

        if source == target {
            return outcome(
                true,
                text.to_string(),
                TranslationMethod::NoTranslationNeeded,
                1.0,
                None,
            );
        }

        if let Some(provider) = &self.provider {
            match provider.translate(text, source, target).await {
                Ok(translated) => {
                    debug!(source, target, "translated via provider");
                    return outcome(true, translated, TranslationMethod::ExternalApi, 0.95, None);
                }
                Err(err) => warn!(error = %err, "translation provider failed, using dictionary"),
            }
        }

        match dictionary_translate(text, target) {
            Some(translated) => outcome(
                true,
                translated,
                TranslationMethod::FallbackDictionary,
                DICTIONARY_CONFIDENCE,
                None,
            ),
            None => outcome(
                false,
                text.to_string(),
                TranslationMethod::NoTranslation,
                0.0,
                Some("No fallback translation available".to_string()),
            ),
        }
    }

    pub async fn translate_batch(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> Vec<TranslationOutcome> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.translate(text, source, target).await);
        }
        results
    }
}

/// Replaces every dictionary phrase found in `text`, ignoring ASCII case.
///
/// Returns `None` when no phrase matched.
pub fn dictionary_translate(text: &str, target: &str) -> Option<String> {
    let terms = dictionary(target)?;
    let mut translated = text.to_string();
    let mut matched = false;

    for (phrase, replacement) in terms {
        let mut result = String::with_capacity(translated.len());
        let lowered = translated.to_ascii_lowercase();
        let mut cursor = 0;
        while let Some(offset) = lowered[cursor..].find(phrase) {
            let start = cursor + offset;
            result.push_str(&translated[cursor..start]);
            result.push_str(replacement);
            cursor = start + phrase.len();
            matched = true;
        }
        result.push_str(&translated[cursor..]);
        translated = result;
    }

    matched.then_some(translated)
}

/// Guesses the language from the first Indic script block present.
pub fn detect_language(text: &str) -> DetectedLanguage {
    let contains = |start: u32, end: u32| text.chars().any(|c| (start..=end).contains(&(c as u32)));

    let detected = if contains(0x0900, 0x097F) {
        Some("hi")
    } else if contains(0x0980, 0x09FF) {
        Some("bn")
    } else if contains(0x0B80, 0x0BFF) {
        Some("ta")
    } else if contains(0x0C00, 0x0C7F) {
        Some("te")
    } else {
        None
    };

    match detected {
        Some(code) => DetectedLanguage {
            detected_language: code,
            language_name: language_name(code).unwrap_or("Unknown"),
            confidence: 0.8,
            method: "script_detection",
        },
        None => DetectedLanguage {
            detected_language: "en",
            language_name: "English",
            confidence: 0.6,
            method: "default_detection",
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default = "default_source")]
    pub source_language: String,
    #[serde(default = "default_target")]
    pub target_language: String,
}

fn default_source() -> String {
    "en".to_string()
}

fn default_target() -> String {
    "hi".to_string()
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub text: String,
}

pub fn translation_router(service: Arc<TranslationService>) -> Router {
    Router::new()
        .route("/api/v1/translate", post(translate_handler))
        .route("/api/v1/translate/detect", post(detect_handler))
        .route("/api/v1/translate/languages", get(languages_handler))
        .with_state(service)
}

pub(crate) async fn translate_handler(
    State(service): State<Arc<TranslationService>>,
    axum::Json(request): axum::Json<TranslateRequest>,
) -> Response {
    let source = request.source_language.as_str();
    let target = request.target_language.as_str();

    if !request.texts.is_empty() {
        let results = service.translate_batch(&request.texts, source, target).await;
        let successful = results.iter().filter(|result| result.success).count();
        let payload = json!({
            "success": true,
            "total_texts": results.len(),
            "successful_translations": successful,
            "results": results,
            "timestamp": Utc::now(),
        });
        return (StatusCode::OK, axum::Json(payload)).into_response();
    }

    match request.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            let outcome = service.translate(text, source, target).await;
            let payload = TranslateResponse {
                outcome,
                timestamp: Utc::now(),
            };
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        _ => {
            let payload = json!({ "error": "No text provided for translation" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
    }
}

#[derive(Serialize)]
struct TranslateResponse {
    #[serde(flatten)]
    outcome: TranslationOutcome,
    timestamp: DateTime<Utc>,
}

async fn detect_handler(axum::Json(request): axum::Json<DetectRequest>) -> Response {
    (StatusCode::OK, axum::Json(detect_language(&request.text))).into_response()
}

async fn languages_handler() -> Response {
    let languages: serde_json::Map<String, Value> = SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, name)| (code.to_string(), Value::String(name.to_string())))
        .collect();
    (StatusCode::OK, axum::Json(json!({ "languages": languages }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    struct FailingProvider;

    #[async_trait]
    impl TranslationProvider for FailingProvider {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslationError> {
            Err(TranslationError::Status(503))
        }
    }

    struct EchoProvider;

    #[async_trait]
    impl TranslationProvider for EchoProvider {
        async fn translate(&self, text: &str, _: &str, target: &str) -> Result<String, TranslationError> {
            Ok(format!("[{target}] {text}"))
        }
    }

    #[tokio::test]
    async fn same_language_is_returned_unchanged() {
        let outcome = TranslationService::offline()
            .translate("Credit score", "hi", "hi")
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.translated_text, "Credit score");
        assert_eq!(outcome.translation_method, TranslationMethod::NoTranslationNeeded);
    }

    #[tokio::test]
    async fn unsupported_language_returns_original_text() {
        let outcome = TranslationService::offline()
            .translate("Credit score", "en", "fr")
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.translated_text, "Credit score");
        assert_eq!(
            outcome.error.as_deref(),
            Some("Unsupported target language: fr")
        );
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_dictionary() {
        let service = TranslationService::new(Some(Arc::new(FailingProvider)));
        let outcome = service.translate("Your Credit Score", "en", "hi").await;
        assert!(outcome.success);
        assert_eq!(outcome.translated_text, "Your क्रेडिट स्कोर");
        assert_eq!(outcome.translation_method, TranslationMethod::FallbackDictionary);
        assert_eq!(outcome.confidence, 0.7);
    }

    #[tokio::test]
    async fn provider_result_is_preferred() {
        let service = TranslationService::new(Some(Arc::new(EchoProvider)));
        let outcome = service.translate("Hello", "en", "te").await;
        assert_eq!(outcome.translated_text, "[te] Hello");
        assert_eq!(outcome.translation_method, TranslationMethod::ExternalApi);
    }

    #[tokio::test]
    async fn unmatched_text_reports_no_translation() {
        let outcome = TranslationService::offline()
            .translate("Good morning", "en", "ta")
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.translated_text, "Good morning");
        assert_eq!(outcome.translation_method, TranslationMethod::NoTranslation);
        assert_eq!(outcome.confidence, 0.0);
    }

    #[test]
    fn dictionary_replaces_every_known_phrase() {
        let translated = dictionary_translate("Loan application approved", "ta")
            .expect("phrases matched");
        assert_eq!(translated, "கடன் விண்ணப்பம் அங்கீகரிக்கப்பட்டது");
        assert_eq!(dictionary_translate("approved", "gu"), None);
    }

    #[test]
    fn detects_language_by_script() {
        assert_eq!(detect_language("नमस्ते").detected_language, "hi");
        assert_eq!(detect_language("নমস্কার").detected_language, "bn");
        assert_eq!(detect_language("வணக்கம்").detected_language, "ta");
        assert_eq!(detect_language("నమస్కారం").detected_language, "te");
        let english = detect_language("hello");
        assert_eq!(english.detected_language, "en");
        assert_eq!(english.method, "default_detection");
    }

    #[tokio::test]
    async fn translate_route_requires_text() {
        let router = translation_router(Arc::new(TranslationService::offline()));
        let response = router
            .oneshot(
                Request::post("/api/v1/translate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"target_language":"hi"}"#))
                    .expect("valid request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn translate_route_returns_outcome() {
        let router = translation_router(Arc::new(TranslationService::offline()));
        let response = router
            .oneshot(
                Request::post("/api/v1/translate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"text":"Interest rate","target_language":"hi"}"#))
                    .expect("valid request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .expect("read body");
        let payload: Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload["translated_text"], "ब्याज दर");
        assert_eq!(payload["original_text"], "Interest rate");
        assert_eq!(payload["translation_method"], "fallback_dictionary");
    }
}
