//! Classified result of one command.

use super::frame::is_prompt;

/// Advisory numeric reading of a textual response.
///
/// Some Operator commands report booleans as text rather than exit codes:
/// - contains "true" (any case) → `1`
/// - otherwise contains "false" → `0`
/// - blank → `1` (success with no output)
/// - anything else → `-1`
pub fn legacy_code(text: &str) -> i32 {
    let lower = text.to_ascii_lowercase();
    if lower.contains("true") {
        1
    } else if lower.contains("false") {
        0
    } else if text.trim().is_empty() {
        1
    } else {
        -1
    }
}

/// Result of one command sent over the command channel.
///
/// An `Outcome` only exists for exchanges that completed at the transport
/// level; failures are reported as [`CommandError`](crate::core::CommandError).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    response: String,
    exit_code: Option<i32>,
    legacy_code: i32,
    terminated: bool,
}

impl Outcome {
    /// Build an outcome from collected response text.
    pub fn new(response: String, exit_code: Option<i32>) -> Self {
        let legacy_code = legacy_code(&response);
        Self {
            response,
            exit_code,
            legacy_code,
            terminated: false,
        }
    }

    /// Build the outcome of an exchange that ended with the Operator shutting down.
    pub fn terminated(response: String, exit_code: Option<i32>) -> Self {
        Self {
            terminated: true,
            ..Self::new(response, exit_code)
        }
    }

    /// Response text, plain lines joined with `\n`.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Consume the outcome and return the response text.
    pub fn into_response(self) -> String {
        self.response
    }

    /// Exit code reported by the Operator, if any.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Advisory boolean reading of the response, see [`legacy_code`].
    pub fn legacy_code(&self) -> i32 {
        self.legacy_code
    }

    /// Check if the Operator ended the session during this exchange.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Check if the response is blank.
    pub fn is_blank(&self) -> bool {
        self.response.trim().is_empty()
    }

    /// Session-level success.
    ///
    /// The Operator signals "ok" by silence, by a textual true/non-zero echo,
    /// or by answering with nothing but the prompt. Any one of the three counts.
    pub fn session_succeeded(&self) -> bool {
        self.is_blank() || self.legacy_code != 0 || is_prompt(&self.response)
    }

    /// Response with surrounding whitespace and prompt characters removed.
    pub fn trimmed_response(&self) -> &str {
        self.response
            .trim_matches(|c: char| matches!(c, '\r' | '\n' | ' ' | '>'))
    }
}
