//! Text-generation layer for the Terrarium simulation.
//!
//! Everything that touches the LLM lives here: the HTTP client with its
//! retry policy, the prompt templates, the response parser, the decision
//! planner, and the memory summarizer. The rest of the workspace only
//! sees [`Action`] values and the single [`GenerationUnavailable`]
//! failure condition.
//!
//! # Modules
//!
//! - [`client`] -- enum-dispatched generation backends (HTTP + scripted)
//! - [`prompt`] -- embedded minijinja templates
//! - [`parse`] -- two-outcome response parsing
//! - [`planner`] -- per-agent decision planner with deterministic fallback
//! - [`summarize`] -- memory consolidation summaries
//! - [`error`] -- the [`GenerationUnavailable`] condition
//!
//! [`Action`]: terrarium_types::Action
//! [`GenerationUnavailable`]: error::GenerationUnavailable

pub mod client;
pub mod error;
pub mod parse;
pub mod planner;
pub mod prompt;
pub mod summarize;

pub use client::{OpenAiGenerator, ScriptedGenerator, TextGenerator};
pub use error::GenerationUnavailable;
pub use parse::{ParseFailure, extract_action};
pub use planner::Planner;
pub use prompt::{PromptError, PromptSet};
pub use summarize::Summarizer;
