//! OpenAI-compatible Chat Completions judge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::prompt::JudgeBatch;
use super::{JudgeError, RelevanceJudge};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat Completions judge. `api_base` is overridable for proxies and tests.
pub struct OpenAiJudge {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiJudge {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<&str>,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, JudgeError> {
        let http = reqwest::Client::builder()
            .user_agent("slide-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .map_err(|e| JudgeError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            api_base: api_base.unwrap_or(DEFAULT_API_BASE).trim_end_matches('/').to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            temperature: 0.3,
            max_tokens: 1000,
        })
    }

    pub fn sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl RelevanceJudge for OpenAiJudge {
    async fn judge(&self, batch: &JudgeBatch) -> Result<String, JudgeError> {
        if self.api_key.is_empty() {
            return Err(JudgeError::Unconfigured);
        }
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg { role: "system", content: &batch.system },
                Msg { role: "user", content: &batch.user },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| JudgeError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(JudgeError::Status(status.as_u16()));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| JudgeError::Transport(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or(JudgeError::EmptyResponse)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
