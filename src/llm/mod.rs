//! Summary generation through an external completion API.

pub mod openai_summarizer;

pub use openai_summarizer::{
    GenerateFuture, LlmError, LlmResult, OpenAiSessionSummarizer, SummaryGenerator,
    build_session_summary_prompt,
};
