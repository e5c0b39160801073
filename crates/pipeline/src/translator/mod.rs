//! Translator fan-out: a registry of credential-gated back-ends dispatched
//! concurrently per target language.
//!
//! Grounded in `models.py`'s `Translator` ABC and its three concrete
//! implementations (`DeepLTranslator`/`PapagoTranslator`/`GoogleTranslator`)
//! plus the `TRANSLATORS` factory dict, restructured around the corpus's
//! provider-enum + `Arc<dyn Translator>` registry pattern
//! (`text_processing/src/translation/mod.rs`'s `create_translator`).

mod deepl;
mod google;
mod papago;

use async_trait::async_trait;
use liveasr_config::TranslationConfig;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub use deepl::DeepLTranslator;
pub use google::GoogleTranslator;
pub use papago::PapagoTranslator;

#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("translation back-end returned an error response: {0}")]
    BackendError(String),
}

/// A single-language translation back-end. Source language is always
/// Korean; only the target varies (§4.5).
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslatorError>;
}

/// Registry of translation engines, keyed by engine name (`"deepl"`,
/// `"papago"`, `"google"`), built from whichever credentials are present in
/// [`TranslationConfig`]. An engine with missing credentials is simply
/// absent from the map — this is not an error, matching the original's
/// `TRANSLATORS` factory which only logs a startup warning if the map ends
/// up completely empty.
pub struct TranslatorRegistry {
    engines: HashMap<String, Arc<dyn Translator>>,
}

impl TranslatorRegistry {
    pub fn from_config(config: &TranslationConfig) -> Self {
        let mut engines: HashMap<String, Arc<dyn Translator>> = HashMap::new();

        if let Some(key) = &config.deepl_api_key {
            engines.insert(
                "deepl".to_string(),
                Arc::new(DeepLTranslator::new(key.clone())),
            );
        }
        if let (Some(id), Some(secret)) = (&config.naver_client_id, &config.naver_client_secret) {
            engines.insert(
                "papago".to_string(),
                Arc::new(PapagoTranslator::new(id.clone(), secret.clone())),
            );
        }
        if let Some(creds) = &config.google_application_credentials {
            engines.insert(
                "google".to_string(),
                Arc::new(GoogleTranslator::new(creds.clone())),
            );
        }

        if engines.is_empty() {
            tracing::warn!("no translation engines configured; translation_result will never be emitted");
        }

        Self { engines }
    }

    pub fn get(&self, engine: &str) -> Option<Arc<dyn Translator>> {
        self.engines.get(engine).cloned()
    }

    /// Translate one source text into every requested language concurrently,
    /// using the named engine. Returns `(lang, text)` pairs in arbitrary
    /// completion order; each per-language failure is converted to the
    /// spec's uniform synthetic failure marker rather than propagated, so
    /// one bad language never suppresses the others (§4.5).
    pub async fn translate_all(
        &self,
        engine: &str,
        text: &str,
        target_langs: &[String],
    ) -> Vec<(String, String)> {
        let Some(translator) = self.get(engine) else {
            tracing::warn!(engine, "translation engine selected but not configured");
            return Vec::new();
        };

        let tasks = target_langs.iter().map(|lang| {
            let translator = translator.clone();
            let lang = lang.clone();
            let text = text.to_string();
            async move {
                let result = translator.translate(&text, &lang).await;
                let out = result.unwrap_or_else(|e| {
                    tracing::warn!(lang, error = %e, "translation failed");
                    failure_marker(&lang)
                });
                (lang, out)
            }
        });

        futures::future::join_all(tasks).await
    }
}

/// Uniform synthetic failure marker for every back-end (§4.5); the original
/// Python varies this string per back-end, but the distilled specification
/// fixes a single format, which this implementation follows.
fn failure_marker(target_lang: &str) -> String {
    format!("[{} 번역 실패]", target_lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;

    #[async_trait]
    impl Translator for AlwaysFails {
        async fn translate(
            &self,
            _text: &str,
            _target_lang: &str,
        ) -> Result<String, TranslatorError> {
            Err(TranslatorError::BackendError("boom".to_string()))
        }
    }

    #[test]
    fn empty_config_yields_empty_registry() {
        let registry = TranslatorRegistry::from_config(&TranslationConfig::default());
        assert!(registry.get("deepl").is_none());
        assert!(registry.get("papago").is_none());
        assert!(registry.get("google").is_none());
    }

    #[test]
    fn deepl_key_alone_only_enables_deepl() {
        let config = TranslationConfig {
            deepl_api_key: Some("key".to_string()),
            ..Default::default()
        };
        let registry = TranslatorRegistry::from_config(&config);
        assert!(registry.get("deepl").is_some());
        assert!(registry.get("papago").is_none());
    }

    #[test]
    fn partial_papago_credentials_do_not_enable_it() {
        let config = TranslationConfig {
            naver_client_id: Some("id".to_string()),
            ..Default::default()
        };
        let registry = TranslatorRegistry::from_config(&config);
        assert!(registry.get("papago").is_none());
    }

    #[tokio::test]
    async fn failed_translation_falls_back_to_uniform_marker() {
        let translator: Arc<dyn Translator> = Arc::new(AlwaysFails);
        let result = translator.translate("hello", "en").await;
        assert!(result.is_err());
        assert_eq!(failure_marker("en"), "[en 번역 실패]");
    }

    #[tokio::test]
    async fn unknown_engine_returns_no_results() {
        let registry = TranslatorRegistry::from_config(&TranslationConfig::default());
        let results = registry
            .translate_all("deepl", "hello", &["en".to_string()])
            .await;
        assert!(results.is_empty());
    }
}
