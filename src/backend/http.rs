//! HTTP client for the study service
//!
//! Endpoints:
//! - `POST /api/flashcards/generate` `{content, num_cards, user_id}`
//! - `POST /api/distractors` `{question, answer, count}`
//! - `POST /api/xp/award` `{user_id, activity, amount}`
//! - `GET  /api/progress/{user_id}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{BackendError, CardSource, DistractorSource, DurableAward, ProgressService, Result};
use crate::flashcards::CardDraft;
use crate::progress::UserProgress;

pub struct HttpBackend {
    client: Client,
    base_url: String,
    user_id: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, user_id: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BackendError::InvalidUrl(base_url));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(concat!("studyquest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            user_id: user_id.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl CardSource for HttpBackend {
    async fn generate_cards(&self, topic: &str, count: usize) -> Result<Vec<CardDraft>> {
        let body = json!({
            "content": topic,
            "num_cards": count,
            "user_id": self.user_id,
        });
        let data: Value = self.post_json("api/flashcards/generate", &body).await?;
        let cards = parse_generated_cards(data)?;
        log::info!("backend: generated {} cards for {:?}", cards.len(), topic);
        Ok(cards)
    }
}

#[async_trait]
impl DistractorSource for HttpBackend {
    async fn generate_distractors(
        &self,
        question: &str,
        answer: &str,
        count: usize,
    ) -> Result<Vec<String>> {
        let body = json!({
            "question": question,
            "answer": answer,
            "count": count,
        });
        let data: Value = self.post_json("api/distractors", &body).await?;
        Ok(parse_distractors(&data))
    }
}

#[async_trait]
impl ProgressService for HttpBackend {
    async fn apply_xp(&self, user_id: &str, activity: &str, amount: u64) -> Result<DurableAward> {
        let body = json!({
            "user_id": user_id,
            "activity": activity,
            "amount": amount,
        });
        self.post_json("api/xp/award", &body).await
    }

    async fn get_progress(&self, user_id: &str) -> Result<UserProgress> {
        let response = self
            .client
            .get(self.url(&format!("api/progress/{}", user_id)))
            .send()
            .await?;
        Self::read_json(response).await
    }
}

/// Extract cards from a generation response.
///
/// Accepted shapes: a bare array, `{"flashcards": [...]}`, or `{"flashcards": "<json>"}`
/// where the string may have been cut off mid-array. A `status` other than `"success"`
/// is a failure. Cards use `front`/`question` and `back`/`answer`; cards missing either
/// side are dropped.
pub fn parse_generated_cards(data: Value) -> Result<Vec<CardDraft>> {
    if let Some(status) = data.get("status").and_then(Value::as_str) {
        if status != "success" {
            let message = data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or(status)
                .to_string();
            return Err(BackendError::Service(message));
        }
    }

    let raw = match data {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("flashcards") {
            Some(Value::Array(items)) => items,
            Some(Value::String(text)) => parse_card_array(&text),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let total = raw.len();
    let cards: Vec<CardDraft> = raw.iter().filter_map(normalize_card).collect();
    if cards.len() < total {
        log::warn!("backend: dropped {} incomplete cards", total - cards.len());
    }
    Ok(cards)
}

/// Parse a JSON array of cards, repairing a truncated tail once
fn parse_card_array(text: &str) -> Vec<Value> {
    match serde_json::from_str::<Vec<Value>>(text) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("backend: flashcards string is not valid JSON ({}), repairing", e);
            let repaired = format!("{}}}]", text.trim_end().trim_end_matches(','));
            serde_json::from_str::<Vec<Value>>(&repaired).unwrap_or_else(|e| {
                log::error!("backend: flashcards string unreadable after repair: {}", e);
                Vec::new()
            })
        }
    }
}

fn normalize_card(card: &Value) -> Option<CardDraft> {
    let side = |keys: [&str; 2]| {
        keys.iter()
            .filter_map(|key| card.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(str::to_string)
    };
    Some(CardDraft::new(side(["front", "question"])?, side(["back", "answer"])?))
}

fn parse_distractors(data: &Value) -> Vec<String> {
    let items = match data {
        Value::Array(items) => Some(items),
        other => other.get("distractors").and_then(Value::as_array),
    };
    items
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
