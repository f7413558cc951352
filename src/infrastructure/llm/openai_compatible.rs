use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::http_client::HttpClientTrait;
use crate::config::LlmSettings;
use crate::domain::embedding::Embedder;
use crate::domain::llm::{
    AnswerGenerator, CategoryDecision, CategoryRouter, GeneratedAnswer, RelevanceJudge,
};
use crate::domain::retrieval::Chunk;
use crate::domain::tool::{ToolError, ToolName};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const ROUTER_PROMPT: &str = "You route questions to the single most relevant category. \
Reply with JSON only: {\"category\": <one of the listed categories>, \
\"confidence\": <number between 0 and 1>, \"reason\": <short explanation>}.";

const GENERATOR_PROMPT: &str = "Answer the question using only the numbered context passages. \
Cite every passage you rely on by its id in square brackets, for example [chunk-3]. \
If the context does not contain the answer, say so.";

const JUDGE_PROMPT: &str = "Rate how relevant each passage is to the question on a scale from 1 \
(irrelevant) to 10 (directly answers it). Reply with JSON only: \
{\"scores\": [{\"id\": <passage id>, \"score\": <integer 1-10>}]} covering every passage.";

/// Client for any OpenAI-compatible API.
///
/// One client serves as category router, embedder, answer generator and
/// relevance judge.
#[derive(Debug)]
pub struct OpenAiCompatibleClient<C: HttpClientTrait> {
    client: C,
    auth_header: Option<String>,
    base_url: String,
    chat_model: String,
    embedding_model: String,
}

impl<C: HttpClientTrait> OpenAiCompatibleClient<C> {
    pub fn new(
        client: C,
        api_key: Option<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self::with_base_url(client, api_key, chat_model, embedding_model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: Option<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_header: api_key.map(|key| format!("Bearer {}", key)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    pub fn from_settings(client: C, settings: &LlmSettings) -> Self {
        Self::with_base_url(
            client,
            settings.api_key.clone(),
            settings.chat_model.clone(),
            settings.embedding_model.clone(),
            settings.base_url.clone(),
        )
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("Content-Type", "application/json")];
        if let Some(ref auth) = self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }
        headers
    }

    /// One chat completion; returns the first choice's text
    async fn complete(
        &self,
        tool: ToolName,
        system: &str,
        user: String,
        json_reply: bool,
    ) -> Result<String, ToolError> {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: system.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ];

        let mut body = json!({
            "model": self.chat_model,
            "messages": messages,
            "temperature": 0.0,
        });

        if json_reply {
            body["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .client
            .post_json(&self.chat_completions_url(), self.headers(), &body)
            .await
            .map_err(|e| e.into_tool_error(tool))?;

        let response: ChatResponse = serde_json::from_value(response).map_err(|e| {
            ToolError::malformed(tool.as_str(), format!("Failed to parse response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ToolError::malformed(tool.as_str(), "No content in response"))
    }
}

/// Passages rendered for a prompt, one per line, prefixed by id
fn render_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. [{}] {}", i + 1, c.id, c.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a router reply, tolerating prose around the JSON object
fn parse_decision(raw: &str) -> Result<CategoryDecision, ToolError> {
    let tool = ToolName::CategoryRouter.as_str();

    let start = raw.find('{');
    let end = raw.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => return Err(ToolError::malformed(tool, "No JSON object in router reply")),
    };

    let reply: RouterReply = serde_json::from_str(json)
        .map_err(|e| ToolError::malformed(tool, format!("Invalid router reply: {}", e)))?;

    if reply.category.trim().is_empty() {
        return Err(ToolError::malformed(tool, "Router reply names no category"));
    }

    let confidence = if reply.confidence.is_finite() {
        reply.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(CategoryDecision::new(reply.category.trim(), confidence).with_reason(reply.reason))
}

#[async_trait]
impl<C: HttpClientTrait> CategoryRouter for OpenAiCompatibleClient<C> {
    async fn decide(
        &self,
        question: &str,
        categories: &[String],
    ) -> Result<CategoryDecision, ToolError> {
        let user = format!(
            "Categories: {}\n\nQuestion: {}",
            categories.join(", "),
            question
        );

        let raw = self
            .complete(ToolName::CategoryRouter, ROUTER_PROMPT, user, true)
            .await?;

        parse_decision(&raw)
    }
}

#[async_trait]
impl<C: HttpClientTrait> Embedder for OpenAiCompatibleClient<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ToolError> {
        let tool = ToolName::Embedder;
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let response = self
            .client
            .post_json(&self.embeddings_url(), self.headers(), &body)
            .await
            .map_err(|e| e.into_tool_error(tool))?;

        let response: EmbeddingResponse = serde_json::from_value(response).map_err(|e| {
            ToolError::malformed(tool.as_str(), format!("Failed to parse response: {}", e))
        })?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ToolError::malformed(tool.as_str(), "No embedding in response"))
    }

    fn embedder_name(&self) -> &'static str {
        "openai_compatible"
    }
}

#[async_trait]
impl<C: HttpClientTrait> AnswerGenerator for OpenAiCompatibleClient<C> {
    async fn generate(
        &self,
        question: &str,
        chunks: &[Chunk],
        category: Option<&str>,
    ) -> Result<GeneratedAnswer, ToolError> {
        let mut user = format!("Context:\n{}\n\n", render_context(chunks));
        if let Some(category) = category {
            user.push_str(&format!("Category: {}\n", category));
        }
        user.push_str(&format!("Question: {}", question));

        let text = self
            .complete(ToolName::AnswerGenerator, GENERATOR_PROMPT, user, false)
            .await?;

        Ok(GeneratedAnswer::from_text(text))
    }
}

#[async_trait]
impl<C: HttpClientTrait> RelevanceJudge for OpenAiCompatibleClient<C> {
    async fn judge(&self, question: &str, chunks: &[Chunk]) -> Result<String, ToolError> {
        let user = format!(
            "Question: {}\n\nPassages:\n{}",
            question,
            render_context(chunks)
        );

        self.complete(ToolName::RelevanceJudge, JUDGE_PROMPT, user, true)
            .await
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
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
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct RouterReply {
    category: String,
    confidence: f32,
    #[serde(default)]
    reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tool::ToolErrorKind;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use crate::infrastructure::llm::http_client::HttpError;

    const CHAT_URL: &str = "http://llm.local/v1/chat/completions";
    const EMBEDDINGS_URL: &str = "http://llm.local/v1/embeddings";

    fn chat_reply(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "model": "test-model",
            "choices": [{
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    fn client(http: MockHttpClient) -> OpenAiCompatibleClient<MockHttpClient> {
        OpenAiCompatibleClient::with_base_url(
            http,
            Some("sk-test".to_string()),
            "test-model",
            "test-embedding",
            "http://llm.local/v1/",
        )
    }

    fn context() -> Vec<Chunk> {
        vec![
            Chunk::new("c1", "Refunds take 30 days", "policy", 0.8),
            Chunk::new("c2", "Shipping is free", "shipping", 0.4),
        ]
    }

    #[tokio::test]
    async fn test_router_parses_decision() {
        let http = MockHttpClient::new().with_response(
            CHAT_URL,
            chat_reply(r#"{"category": "billing", "confidence": 0.82, "reason": "refunds"}"#),
        );
        let client = client(http);

        let decision = client
            .decide("How do refunds work?", &["billing".to_string(), "shipping".to_string()])
            .await
            .unwrap();

        assert_eq!(decision.category, "billing");
        assert!((decision.confidence - 0.82).abs() < 1e-6);
        assert_eq!(decision.reason, "refunds");

        let requests = client.client.requests();
        assert_eq!(requests[0].1["model"], "test-model");
        assert_eq!(requests[0].1["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn test_router_clamps_confidence_and_tolerates_prose() {
        let http = MockHttpClient::new().with_response(
            CHAT_URL,
            chat_reply("Sure! {\"category\": \"shipping\", \"confidence\": 3}"),
        );

        let decision = client(http)
            .decide("Where is my parcel?", &["shipping".to_string()])
            .await
            .unwrap();

        assert_eq!(decision.category, "shipping");
        assert_eq!(decision.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_router_rejects_reply_without_json() {
        let http = MockHttpClient::new().with_response(CHAT_URL, chat_reply("billing, probably"));

        let error = client(http)
            .decide("q", &["billing".to_string()])
            .await
            .unwrap_err();

        assert_eq!(error.kind, ToolErrorKind::MalformedResponse);
        assert_eq!(error.tool, "category_router");
    }

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let http = MockHttpClient::new().with_response(
            EMBEDDINGS_URL,
            json!({"data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}], "model": "test-embedding"}),
        );
        let client = client(http);

        let vector = client.embed("refund policy").await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(client.client.requests()[0].1["input"], "refund policy");
    }

    #[tokio::test]
    async fn test_embed_empty_data_is_malformed() {
        let http = MockHttpClient::new().with_response(EMBEDDINGS_URL, json!({"data": []}));

        let error = client(http).embed("q").await.unwrap_err();

        assert_eq!(error.kind, ToolErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_generate_extracts_citation_markers() {
        let http = MockHttpClient::new().with_response(
            CHAT_URL,
            chat_reply("Refunds are processed within 30 days [c1]."),
        );
        let client = client(http);

        let answer = client
            .generate("How long do refunds take?", &context(), Some("billing"))
            .await
            .unwrap();

        assert_eq!(answer.citation_markers, vec!["c1"]);
        let prompt = client.client.requests()[0].1["messages"][1]["content"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(prompt.contains("[c1] Refunds take 30 days"));
        assert!(prompt.contains("Category: billing"));
    }

    #[tokio::test]
    async fn test_judge_returns_raw_reply() {
        let reply = r#"{"scores": [{"id": "c1", "score": 9}, {"id": "c2", "score": 2}]}"#;
        let http = MockHttpClient::new().with_response(CHAT_URL, chat_reply(reply));

        let raw = client(http).judge("q", &context()).await.unwrap();

        assert_eq!(raw, reply);
    }

    #[tokio::test]
    async fn test_http_errors_keep_classification() {
        let http = MockHttpClient::new()
            .with_error(CHAT_URL, HttpError::from_status(429, "slow down"))
            .with_error(EMBEDDINGS_URL, HttpError::from_status(400, "bad input"));
        let client = client(http);

        let error = client.judge("q", &context()).await.unwrap_err();
        assert_eq!(error.kind, ToolErrorKind::RateLimited);
        assert_eq!(error.tool, "relevance_judge");

        let error = client.embed("q").await.unwrap_err();
        assert_eq!(error.kind, ToolErrorKind::Validation);
        assert!(!error.is_recoverable());
    }

    #[tokio::test]
    async fn test_empty_completion_is_malformed() {
        let http = MockHttpClient::new().with_response(CHAT_URL, json!({"choices": []}));

        let error = client(http)
            .generate("q", &context(), None)
            .await
            .unwrap_err();

        assert_eq!(error.kind, ToolErrorKind::MalformedResponse);
        assert_eq!(error.tool, "answer_generator");
    }
}
