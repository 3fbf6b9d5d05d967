//! LLM response parsing into typed actions.
//!
//! The model is asked for a bare JSON object but routinely wraps it in
//! prose or a markdown fence. [`extract_action`] is an explicit
//! two-outcome parse: either a well-formed [`Action`] with all required
//! fields, or a [`ParseFailure`] describing what was wrong. The caller
//! (the planner) decides what to do with a failure; nothing is swallowed
//! here.

use serde::Deserialize;

use terrarium_types::Action;

/// Why a response could not be turned into an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// The response contained no bracketed structure at all.
    #[error("no bracketed structure in response")]
    NoJson,
    /// A bracketed structure was found but was not valid JSON.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
    /// The JSON was valid but a required field was absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    /// The `type` tag named an action this system does not know.
    #[error("unknown action type: {0}")]
    UnknownType(String),
}

/// Raw shape of the model's JSON before validation.
///
/// All fields beyond `type` are optional here so that a missing field is
/// reported as [`ParseFailure::MissingField`] rather than a generic
/// deserialization error.
#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

/// Extract a typed [`Action`] from a raw model response.
///
/// Recovery order:
/// 1. Parse the trimmed response directly.
/// 2. Slice from the first `{` to the last `}` (covers prose wrapping
///    and markdown fences) and parse that.
///
/// # Errors
///
/// Returns a [`ParseFailure`] when no strategy yields a structurally
/// valid action.
pub fn extract_action(raw: &str) -> Result<Action, ParseFailure> {
    let trimmed = raw.trim();

    if let Ok(parsed) = serde_json::from_str::<RawAction>(trimmed) {
        return validate(parsed);
    }

    let start = trimmed.find('{').ok_or(ParseFailure::NoJson)?;
    let end = trimmed.rfind('}').ok_or(ParseFailure::NoJson)?;
    let slice = trimmed.get(start..=end).ok_or(ParseFailure::NoJson)?;

    let parsed = serde_json::from_str::<RawAction>(slice)
        .map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    validate(parsed)
}

/// Check required fields per action type.
fn validate(raw: RawAction) -> Result<Action, ParseFailure> {
    match raw.kind.to_lowercase().as_str() {
        "message" => {
            let target = raw
                .target
                .filter(|t| !t.trim().is_empty())
                .ok_or(ParseFailure::MissingField("target"))?;
            let content = raw
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or(ParseFailure::MissingField("content"))?;
            Ok(Action::Message { target, content })
        }
        "reflect" => Ok(Action::Reflect),
        other => Err(ParseFailure::UnknownType(other.to_owned())),
    }
}
