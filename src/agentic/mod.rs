//! LLM-assisted mention proposal
//!
//! Provider clients behind one `LlmClient` trait, and the proposer that turns
//! a question into candidate spans for the resolution engine.

pub mod backend;
pub mod client_factory;
pub mod gemini_client;
pub mod llm_client;
pub mod mention_proposer;
pub mod ollama_client;

pub use backend::LlmBackend;
pub use client_factory::{create_llm_client, create_llm_client_with_settings, current_backend};
pub use llm_client::LlmClient;
pub use mention_proposer::{reconcile, LlmMentionProposer, ProposedMention};
