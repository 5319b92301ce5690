// CV optimizer: analysis, optimization and tailoring through the LLM gateway,
// plus the per-user workspace and export formats.
// All model calls go through gateway.rs; no direct llm_client use elsewhere.

pub mod export;
pub mod extract;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod validation;
pub mod workflow;
pub mod workspace;

#[cfg(test)]
pub mod fake;
