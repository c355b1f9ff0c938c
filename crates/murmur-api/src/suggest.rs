use std::time::Duration;

use anyhow::{Context, Result};
use axum::{Json, extract::State};
use rand::seq::IndexedRandom;

use murmur_types::api::SuggestResponse;

use crate::error::ApiError;
use crate::state::AppState;

const SUGGEST_PROMPT: &str = "Create a list of three open-ended and engaging questions \
formatted as a single string. Each question should be separated by '||'. These questions \
are for an anonymous social messaging platform and should be suitable for a diverse \
audience. Avoid personal or sensitive topics, focusing instead on universal themes that \
encourage friendly interaction. Ensure the questions are intriguing, foster curiosity, \
and contribute to a positive and welcoming conversational environment.";

/// Served when no text-generation provider is configured, and usable as
/// offline seed content either way.
const STARTER_QUESTIONS: &[&str] = &[
    "What's a hobby you've recently started?",
    "If you could have dinner with any historical figure, who would it be?",
    "What's a simple thing that makes you happy?",
    "What song have you had on repeat lately?",
    "If you could instantly master one skill, what would you pick?",
    "What's the best piece of advice you've ever received?",
    "What place would you love to visit at least once?",
    "What's a book or film that changed how you think?",
    "What small win are you proud of this week?",
];

/// Ice-breaker generation collaborator. Strictly decoupled from account
/// and message state: a failure here is reported to the caller and
/// nothing else.
pub enum Suggester {
    Http {
        client: reqwest::Client,
        api_url: String,
        api_key: String,
    },
    Static,
}

impl Suggester {
    pub fn http(api_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Suggester::Http {
            client,
            api_url,
            api_key,
        })
    }

    pub async fn suggest(&self) -> Result<String> {
        match self {
            Suggester::Static => {
                let picks: Vec<&str> = STARTER_QUESTIONS
                    .choose_multiple(&mut rand::rng(), 3)
                    .copied()
                    .collect();
                Ok(picks.join("||"))
            }
            Suggester::Http {
                client,
                api_url,
                api_key,
            } => {
                let body = serde_json::json!({
                    "contents": [{ "parts": [{ "text": SUGGEST_PROMPT }] }]
                });

                let resp = client
                    .post(format!("{api_url}?key={api_key}"))
                    .json(&body)
                    .send()
                    .await?;

                if !resp.status().is_success() {
                    anyhow::bail!("suggestion provider returned {}", resp.status());
                }

                let value: serde_json::Value = resp.json().await?;
                let text = value["candidates"][0]["content"]["parts"][0]["text"]
                    .as_str()
                    .context("suggestion provider response had no text candidate")?;

                Ok(text.trim().to_string())
            }
        }
    }
}

pub async fn suggest_messages(
    State(state): State<AppState>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let suggestions = state.suggester.suggest().await.map_err(ApiError::Upstream)?;

    Ok(Json(SuggestResponse {
        success: true,
        message: "Suggestions generated".into(),
        suggestions,
    }))
}
