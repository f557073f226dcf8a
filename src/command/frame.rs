//! Line classification for the command channel.
//!
//! Every completed response line maps to exactly one [`Frame`]. Tags are
//! substring matches anywhere in the line and are checked in a fixed
//! precedence: input request, exit code, termination, acknowledgement.

use crate::core::{
    ACK_TAG, CommandError, EXIT_CODE_TAG, INPUT_REQUEST_TAG, PROMPT, TERMINATION_TAG,
};

/// One logical unit recognized while scanning a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Ordinary response text.
    PlainLine(String),
    /// The Operator waits for a line of input; carries the text after the tag.
    InputRequest(String),
    /// Input acknowledgement outside of an input exchange.
    Acknowledgement,
    /// Explicit exit code of the running command.
    ExitCode(i32),
    /// The Operator is shutting down.
    Termination,
    /// A line holding nothing but the prompt.
    PromptOnly,
}

impl Frame {
    /// Classify a completed line (without its line terminator).
    ///
    /// Fails only for an exit-code tag that is not followed by an integer.
    pub fn classify(line: &str) -> Result<Self, CommandError> {
        if let Some(pos) = line.find(INPUT_REQUEST_TAG) {
            let prompt = line[pos + INPUT_REQUEST_TAG.len()..].trim();
            return Ok(Frame::InputRequest(prompt.to_string()));
        }

        if let Some(pos) = line.find(EXIT_CODE_TAG) {
            return parse_exit_code(&line[pos + EXIT_CODE_TAG.len()..])
                .map(Frame::ExitCode)
                .ok_or_else(|| CommandError::MalformedExitCode(line.to_string()));
        }

        if line.contains(TERMINATION_TAG) {
            return Ok(Frame::Termination);
        }

        if line.contains(ACK_TAG) {
            return Ok(Frame::Acknowledgement);
        }

        if is_prompt(line) {
            return Ok(Frame::PromptOnly);
        }

        Ok(Frame::PlainLine(line.to_string()))
    }
}

/// Check if `text` is the bare prompt, ignoring surrounding whitespace.
pub fn is_prompt(text: &str) -> bool {
    text.trim() == PROMPT
}

/// Parse the integer trailing an exit-code tag, e.g. `" 3"` or `":-1"`.
fn parse_exit_code(rest: &str) -> Option<i32> {
    rest.trim_start_matches(|c: char| c == ':' || c == '=' || c.is_whitespace())
        .trim_end()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line() {
        assert_eq!(
            Frame::classify("Running").unwrap(),
            Frame::PlainLine("Running".into())
        );
        assert_eq!(Frame::classify("").unwrap(), Frame::PlainLine(String::new()));
    }

    #[test]
    fn test_prompt_only() {
        assert_eq!(Frame::classify(">").unwrap(), Frame::PromptOnly);
        assert_eq!(Frame::classify(" > ").unwrap(), Frame::PromptOnly);
        assert_eq!(Frame::classify(">>").unwrap(), Frame::PlainLine(">>".into()));
    }

    #[test]
    fn test_input_request_carries_prompt() {
        assert_eq!(
            Frame::classify("\\AwaitingInput: Subject name?").unwrap(),
            Frame::InputRequest("Subject name?".into())
        );
    }

    #[test]
    fn test_exit_code_is_trailing_integer() {
        assert_eq!(
            Frame::classify("\\ExitCode 3").unwrap(),
            Frame::ExitCode(3)
        );
        assert_eq!(
            Frame::classify("prefix \\ExitCode:-1").unwrap(),
            Frame::ExitCode(-1)
        );
        // Not derived from the line length.
        assert_eq!(
            Frame::classify("\\ExitCode 0").unwrap(),
            Frame::ExitCode(0)
        );
    }

    #[test]
    fn test_exit_code_without_integer() {
        let err = Frame::classify("\\ExitCode").unwrap_err();
        assert!(matches!(err, CommandError::MalformedExitCode(_)));

        let err = Frame::classify("\\ExitCode twelve").unwrap_err();
        assert!(matches!(err, CommandError::MalformedExitCode(_)));
    }

    #[test]
    fn test_tag_precedence() {
        // Input request wins over everything else on the same line.
        assert_eq!(
            Frame::classify("\\Terminating \\AwaitingInput:x").unwrap(),
            Frame::InputRequest("x".into())
        );
        // Exit code wins over termination.
        assert_eq!(
            Frame::classify("\\Terminating \\ExitCode 2").unwrap(),
            Frame::ExitCode(2)
        );
        assert_eq!(
            Frame::classify("bye \\Terminating").unwrap(),
            Frame::Termination
        );
        assert_eq!(
            Frame::classify("\\AcknowledgedInput").unwrap(),
            Frame::Acknowledgement
        );
    }
}
