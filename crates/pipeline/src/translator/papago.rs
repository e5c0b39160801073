//! Naver Papago back-end, grounded in `models.py`'s `PapagoTranslator`.

use super::{Translator, TranslatorError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct PapagoResponse {
    message: PapagoMessage,
}

#[derive(Debug, Deserialize)]
struct PapagoMessage {
    result: PapagoResult,
}

#[derive(Debug, Deserialize)]
struct PapagoResult {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

pub struct PapagoTranslator {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    lang_map: HashMap<&'static str, &'static str>,
}

impl PapagoTranslator {
    pub fn new(client_id: String, client_secret: String) -> Self {
        let lang_map = HashMap::from([
            ("en", "en"),
            ("ja", "ja"),
            ("zh", "zh-CN"),
            ("vi", "vi"),
            ("id", "id"),
            ("th", "th"),
            ("de", "de"),
            ("it", "it"),
            ("fr", "fr"),
            ("es", "es"),
            ("ru", "ru"),
        ]);
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            lang_map,
        }
    }
}

#[async_trait]
impl Translator for PapagoTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslatorError> {
        let Some(papago_lang) = self.lang_map.get(target_lang) else {
            return Ok(String::new());
        };
        if text.is_empty() {
            return Ok(String::new());
        }

        let response = self
            .client
            .post("https://papago.apigw.ntruss.com/nmt/v1/translation")
            .header("X-NCP-APIGW-API-KEY-ID", &self.client_id)
            .header("X-NCP-APIGW-API-KEY", &self.client_secret)
            .form(&[("source", "ko"), ("target", papago_lang), ("text", text)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranslatorError::BackendError(format!(
                "papago returned {}",
                response.status()
            )));
        }

        let parsed: PapagoResponse = response.json().await?;
        Ok(parsed.message.result.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_map_uses_simplified_chinese_code() {
        let translator = PapagoTranslator::new("id".to_string(), "secret".to_string());
        assert_eq!(translator.lang_map.get("zh"), Some(&"zh-CN"));
        assert!(translator.lang_map.get("pt").is_none());
    }
}
