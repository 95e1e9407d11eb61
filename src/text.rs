//! A small text state shipped with the crate.
//!
//! `TextState` is the reference [`Snapshot`] implementation used throughout
//! the documentation, tests, and benches. It is deliberately tiny — a string
//! with append/remove-last operations — but it exercises every apply
//! outcome: removing from empty text skips, and removing a character that no
//! longer matches the trailing one applies partially with the real inverse.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::state::{Operation, Outcome, Snapshot};

/// An operation on a [`TextState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextOp {
    /// Append a character to the end of the text.
    Append(char),
    /// Remove the trailing character, which the author believed to be the
    /// given one.
    RemoveLast(char),
}

impl Operation for TextOp {
    fn describe(&self) -> Option<String> {
        Some(match self {
            Self::Append(c) => format!("append '{c}'"),
            Self::RemoveLast(c) => format!("remove trailing '{c}'"),
        })
    }
}

/// A string built by folding [`TextOp`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextState {
    text: String,
}

impl TextState {
    /// The current text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The current text length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for TextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Snapshot for TextState {
    type Op = TextOp;

    fn empty() -> Self {
        Self::default()
    }

    fn apply(&self, op: &TextOp) -> (Self, Outcome<TextOp>) {
        match *op {
            TextOp::Append(c) => {
                let mut next = self.clone();
                next.text.push(c);
                (
                    next,
                    Outcome::Full {
                        undo: TextOp::RemoveLast(c),
                    },
                )
            }
            TextOp::RemoveLast(c) => {
                let mut next = self.clone();
                match next.text.pop() {
                    None => (
                        self.clone(),
                        Outcome::Skipped {
                            reason: "text is empty".into(),
                        },
                    ),
                    Some(last) if last == c => (
                        next,
                        Outcome::Full {
                            undo: TextOp::Append(c),
                        },
                    ),
                    Some(last) => (
                        next,
                        Outcome::Partial {
                            undo: TextOp::Append(last),
                            reason: format!("expected trailing '{c}', removed '{last}'"),
                        },
                    ),
                }
            }
        }
    }
}
