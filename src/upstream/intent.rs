use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::{IntentClassification, IntentClassifier};

/// `POST {url}` with `{"query": ..}`, answered by an [`IntentClassification`].
pub struct HttpIntentClassifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpIntentClassifier {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    query: &'a str,
}

#[async_trait]
impl IntentClassifier for HttpIntentClassifier {
    async fn classify(&self, query: &str) -> Result<IntentClassification> {
        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&ClassifyRequest { query })
            .send()
            .await
            .context("Failed to call intent classifier")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Intent classifier returned {status}: {body}");
        }

        let mut classification: IntentClassification = resp
            .json()
            .await
            .context("Failed to parse intent classification")?;

        let mut seen = std::collections::HashSet::new();
        classification
            .combined_taxonomy_codes
            .retain(|c| !c.trim().is_empty() && seen.insert(c.clone()));
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_classify_parses_contract() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({"query": "help paying rent"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "primary_intent": "rent payment assistance",
                "confidence": 0.87,
                "combined_taxonomy_codes": ["BH-3800.7000", "", "BH-3800.7000", "BV-8900"],
                "is_low_information_query": false,
                "top_intents": [
                    {"intent": "rent payment assistance", "confidence": 0.87},
                    {"intent": "eviction prevention", "confidence": 0.41}
                ]
            })))
            .mount(&server)
            .await;

        let classifier = HttpIntentClassifier::new(
            reqwest::Client::new(),
            server.uri(),
            Duration::from_secs(2),
        );
        let c = classifier.classify("help paying rent").await.unwrap();
        assert_eq!(c.primary_intent, "rent payment assistance");
        assert_eq!(c.combined_taxonomy_codes, vec!["BH-3800.7000", "BV-8900"]);
        assert_eq!(c.top_intents.len(), 2);
        assert!(!c.is_low_information_query);
    }

    #[tokio::test]
    async fn test_classify_missing_fields_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"is_low_information_query": true})),
            )
            .mount(&server)
            .await;

        let classifier = HttpIntentClassifier::new(
            reqwest::Client::new(),
            server.uri(),
            Duration::from_secs(2),
        );
        let c = classifier.classify("stuff").await.unwrap();
        assert!(c.is_low_information_query);
        assert!(c.combined_taxonomy_codes.is_empty());
    }

    #[tokio::test]
    async fn test_classify_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let classifier = HttpIntentClassifier::new(
            reqwest::Client::new(),
            server.uri(),
            Duration::from_secs(2),
        );
        assert!(classifier.classify("food").await.is_err());
    }
}
