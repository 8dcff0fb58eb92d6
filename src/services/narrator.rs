//! Natural-language recommendation generation for a composite insider signal.
//!
//! Generalizes the teacher's `LlmProvider` trait (`services/llm_service.rs`)
//! down to the single call [`CompositeEngine`](crate::services::composite_engine::CompositeEngine)
//! actually needs. `LlmNarrator` calls an OpenAI-compatible chat completion
//! endpoint with the same retry/backoff shape as `llm_service.rs`;
//! `TemplateNarrator` is the deterministic fallback used whenever the LLM
//! call fails or is disabled.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::models::InsiderSignal;
use crate::services::filing_sentiment::FilingSentiment;

const SYSTEM_PROMPT: &str = "You are a senior quantitative analyst. Produce a concise recommendation \
combining SEC filing sentiment analysis with insider trading anomaly data. \
Include: (1) what the insiders did, (2) what the filings say, \
(3) suggested position, (4) confidence and time horizon, (5) key risk caveats. \
Output plain text, 3-5 sentences.";

#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(
        &self,
        ticker: &str,
        filing: Option<&FilingSentiment>,
        signal: &InsiderSignal,
        composite: f64,
    ) -> String;
}

fn user_prompt(ticker: &str, filing: Option<&FilingSentiment>, signal: &InsiderSignal, composite: f64) -> String {
    let filing_summary = filing
        .map(|f| format!("Filing drift score: {:.2} (confidence {:.2}). Summary: {}", f.signal_score, f.confidence, f.summary))
        .unwrap_or_else(|| "No filing analysis available.".to_string());

    let anomaly_descriptions = if signal.anomalies.is_empty() {
        "No anomalies detected.".to_string()
    } else {
        signal
            .anomalies
            .iter()
            .map(|a| format!("- [{}] {} (severity {:.2})", a.anomaly_type.as_str(), a.description, a.severity_score))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Ticker: {ticker}\nComposite Alpha Score: {composite:.2}\nInsider Sentiment: {}\nInsider Anomaly Score: {:.2}\nAnomalies:\n{anomaly_descriptions}\n\nFiling Analysis:\n{filing_summary}",
        signal.insider_sentiment.as_str(),
        signal.anomaly_score,
    )
}

/// Deterministic fallback: no LLM call, template-filled sentence.
pub struct TemplateNarrator;

#[async_trait]
impl Narrator for TemplateNarrator {
    async fn narrate(&self, ticker: &str, _filing: Option<&FilingSentiment>, signal: &InsiderSignal, composite: f64) -> String {
        fallback_recommendation(ticker, signal, composite)
    }
}

pub fn fallback_recommendation(ticker: &str, signal: &InsiderSignal, composite: f64) -> String {
    let action = if composite > 0.7 {
        "Strong sell signal"
    } else if composite > 0.4 {
        "Elevated caution"
    } else {
        "No immediate action"
    };
    format!(
        "{action} for {ticker}. Composite score: {composite:.2}, insider sentiment: {}, anomalies detected: {}.",
        signal.insider_sentiment.as_str(),
        signal.anomalies.len(),
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Calls an OpenAI-compatible chat completions endpoint, falling back to
/// [`TemplateNarrator`] on any failure rather than surfacing it.
pub struct LlmNarrator {
    client: Client,
    api_key: String,
    model: String,
}

impl LlmNarrator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build().expect("failed to build LLM HTTP client"),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    async fn call_with_retry(&self, request: &ChatRequest) -> Result<ChatResponse, String> {
        let mut delay = Duration::from_secs(1);
        let max_retries = 3;

        for attempt in 0..=max_retries {
            match self.call(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt == max_retries => {
                    error!(error = %e, attempts = attempt + 1, "LLM call failed, giving up");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, attempt = attempt + 1, "LLM call failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
        unreachable!()
    }

    async fn call(&self, request: &ChatRequest) -> Result<ChatResponse, String> {
        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response.json::<ChatResponse>().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Narrator for LlmNarrator {
    async fn narrate(&self, ticker: &str, filing: Option<&FilingSentiment>, signal: &InsiderSignal, composite: f64) -> String {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: SYSTEM_PROMPT.to_string() },
                ChatMessage { role: "user".to_string(), content: user_prompt(ticker, filing, signal, composite) },
            ],
            max_tokens: 400,
            temperature: 0.1,
        };

        match self.call_with_retry(&request).await {
            Ok(response) => match response.choices.into_iter().next() {
                Some(choice) => {
                    info!(ticker, "generated LLM recommendation");
                    choice.message.content
                }
                None => fallback_recommendation(ticker, signal, composite),
            },
            Err(_) => fallback_recommendation(ticker, signal, composite),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InsiderSignal;

    #[tokio::test]
    async fn template_narrator_flags_strong_sell_above_0_7() {
        let signal = InsiderSignal::empty("ACME");
        let text = TemplateNarrator.narrate("ACME", None, &signal, 0.85).await;
        assert!(text.contains("Strong sell signal"));
    }

    #[tokio::test]
    async fn template_narrator_no_action_below_0_4() {
        let signal = InsiderSignal::empty("ACME");
        let text = TemplateNarrator.narrate("ACME", None, &signal, 0.1).await;
        assert!(text.contains("No immediate action"));
    }
}
