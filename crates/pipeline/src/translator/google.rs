//! Google Cloud Translate back-end, grounded in `models.py`'s
//! `GoogleTranslator`.
//!
//! The original authenticates via the `google-cloud-translate` client
//! library against `GOOGLE_APPLICATION_CREDENTIALS` (a service-account key
//! file). This implementation reaches the Translate v2 REST endpoint
//! directly with an API key sourced from that same setting, which keeps the
//! credential-presence gating identical without pulling in a full GCP SDK.

use super::{Translator, TranslatorError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Debug, Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
struct GoogleTranslation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

pub struct GoogleTranslator {
    client: reqwest::Client,
    api_key: String,
    lang_map: HashMap<&'static str, &'static str>,
}

impl GoogleTranslator {
    pub fn new(api_key: String) -> Self {
        let lang_map = HashMap::from([
            ("en", "en"),
            ("ja", "ja"),
            ("zh", "zh-CN"),
            ("vi", "vi"),
            ("id", "id"),
            ("th", "th"),
            ("mn", "mn"),
            ("uz", "uz"),
            ("tr", "tr"),
            ("de", "de"),
            ("it", "it"),
            ("fr", "fr"),
            ("es", "es"),
            ("ru", "ru"),
            ("pt", "pt"),
        ]);
        Self {
            client: reqwest::Client::new(),
            api_key,
            lang_map,
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslatorError> {
        let Some(google_lang) = self.lang_map.get(target_lang) else {
            return Ok(String::new());
        };
        if text.is_empty() {
            return Ok(String::new());
        }

        let response = self
            .client
            .post("https://translation.googleapis.com/language/translate/v2")
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("q", text),
                ("source", "ko"),
                ("target", google_lang),
                ("format", "text"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let parsed: GoogleResponse = response.json().await?;
        let translated = parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .unwrap_or_default();
        Ok(html_unescape(&translated))
    }
}

/// Decodes the small set of HTML entities the Google API is known to emit
/// in translated text (`html.unescape` in the original).
fn html_unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_unescape_handles_common_entities() {
        assert_eq!(html_unescape("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(html_unescape("&quot;hi&quot;"), "\"hi\"");
    }

    #[test]
    fn lang_map_includes_mongolian_and_uzbek() {
        let translator = GoogleTranslator::new("key".to_string());
        assert_eq!(translator.lang_map.get("mn"), Some(&"mn"));
        assert_eq!(translator.lang_map.get("uz"), Some(&"uz"));
    }
}
