//! Parse options: the interpretations produced by traversal.

use serde::Serialize;

use crate::value::Value;

/// A fragment of an interpretation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    /// The fragment's text.
    pub text: String,
    /// `true` if the fragment was matched from the input, `false` if it is a
    /// suggested completion.
    pub input: bool,
}

impl Word {
    /// A fragment matched from the input.
    pub fn matched(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input: true,
        }
    }

    /// A fragment suggested beyond the end of the input.
    pub fn suggested(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input: false,
        }
    }
}

/// One interpretation of (a prefix of) the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOption {
    /// Unconsumed input, or `None` once the input has been exhausted and the
    /// interpretation continues as a completion.
    pub text: Option<String>,
    /// Fragments matched or suggested so far, in order.
    pub words: Vec<Word>,
    /// The interpretation's result value.
    pub result: Value,
    /// Opaque score, multiplied along the way by scored nodes.
    pub score: f64,
}

impl ParseOption {
    /// The starting option for parsing `input`.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            text: Some(input.into()),
            words: Vec::new(),
            result: Value::Null,
            score: 1.0,
        }
    }

    /// Returns `true` if the whole input was consumed exactly.
    pub fn is_complete(&self) -> bool {
        matches!(&self.text, Some(rest) if rest.is_empty())
    }

    /// Returns `true` if the interpretation suggests text beyond the input.
    pub fn is_suggestion(&self) -> bool {
        self.text.is_none()
    }

    /// Returns `true` if a parse call should report this option.
    pub fn is_accepted(&self) -> bool {
        self.is_complete() || self.is_suggestion()
    }

    /// Returns this option with `result` replaced.
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    /// Concatenated text of all words.
    pub fn phrase(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect()
    }
}
