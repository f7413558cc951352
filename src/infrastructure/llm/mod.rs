//! Language-model adapters for an OpenAI-compatible API

mod http_client;
mod openai_compatible;

pub use http_client::{HttpClient, HttpClientTrait, HttpError};
pub use openai_compatible::OpenAiCompatibleClient;
