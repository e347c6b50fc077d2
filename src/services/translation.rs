use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Translation capability consumed by the content localizer.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;

    /// Translate several texts in one call. The default implementation loops
    /// over `translate`; HTTP implementations can batch per request.
    async fn translate_batch(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<String>, TranslationError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.translate(text, source_lang, target_lang).await?);
        }
        Ok(out)
    }
}

/// Client for an HTTP machine-translation service.
pub struct HttpTranslationClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslationClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl TranslationProvider for HttpTranslationClient {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let url = format!("{}/translate", self.base_url);
        let request_body = TranslateRequest {
            q: text,
            source: source_lang,
            target: target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .http
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(TranslationError::Http)?;

        if !response.status().is_success() {
            return Err(TranslationError::Api(format!(
                "translation service returned {}",
                response.status()
            )));
        }

        let body: TranslateResponse = response.json().await.map_err(TranslationError::Http)?;
        Ok(body.translated_text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translation service error: {0}")]
    Api(String),
}
