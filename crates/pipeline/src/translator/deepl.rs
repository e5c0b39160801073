//! DeepL back-end, grounded in `models.py`'s `DeepLTranslator`.

use super::{Translator, TranslatorError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

pub struct DeepLTranslator {
    client: reqwest::Client,
    api_key: String,
    lang_map: HashMap<&'static str, &'static str>,
}

impl DeepLTranslator {
    pub fn new(api_key: String) -> Self {
        let lang_map = HashMap::from([
            ("en", "EN-US"),
            ("ja", "JA"),
            ("zh", "ZH"),
            ("vi", "VI"),
            ("id", "ID"),
            ("tr", "TR"),
            ("de", "DE"),
            ("it", "IT"),
            ("fr", "FR"),
            ("es", "ES"),
            ("ru", "RU"),
            ("pt", "PT"),
        ]);
        Self {
            client: reqwest::Client::new(),
            api_key,
            lang_map,
        }
    }
}

#[async_trait]
impl Translator for DeepLTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslatorError> {
        let Some(deepl_lang) = self.lang_map.get(target_lang) else {
            return Ok(String::new());
        };
        if text.is_empty() {
            return Ok(String::new());
        }

        let response = self
            .client
            .post("https://api-free.deepl.com/v2/translate")
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&[
                ("text", text),
                ("source_lang", "KO"),
                ("target_lang", deepl_lang),
            ])
            .send()
            .await?
            .error_for_status()?;

        let parsed: DeepLResponse = response.json().await?;
        Ok(parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_map_covers_spec_supported_languages() {
        let translator = DeepLTranslator::new("key".to_string());
        assert_eq!(translator.lang_map.get("en"), Some(&"EN-US"));
        assert_eq!(translator.lang_map.get("pt"), Some(&"PT"));
        assert!(translator.lang_map.get("th").is_none());
    }
}
