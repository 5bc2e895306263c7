//! Separator ladder: priority-ordered delimiters used to pick cut points.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default ladder: paragraph, line, then CJK sentence enders and clause marks.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", "。", "！", "？", "，", "、"];

/// Ordered delimiter strings, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SeparatorLadder {
    separators: Vec<String>,
}

impl SeparatorLadder {
    /// Build a ladder. Rejects an empty ladder and empty separators.
    pub fn new<I, S>(separators: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let separators: Vec<String> = separators.into_iter().map(Into::into).collect();

        if separators.is_empty() {
            return Err(CoreError::InvalidParameter(
                "separator ladder must not be empty".to_string(),
            ));
        }
        if let Some(pos) = separators.iter().position(|s| s.is_empty()) {
            return Err(CoreError::InvalidParameter(format!(
                "separator at position {} is empty",
                pos
            )));
        }

        Ok(Self { separators })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.separators.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.separators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.separators.is_empty()
    }

    /// Separators decoded to code points, in ladder order.
    pub(crate) fn to_char_vecs(&self) -> Vec<Vec<char>> {
        self.separators.iter().map(|s| s.chars().collect()).collect()
    }
}

impl Default for SeparatorLadder {
    fn default() -> Self {
        Self {
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for SeparatorLadder {
    type Error = CoreError;

    fn try_from(separators: Vec<String>) -> Result<Self> {
        Self::new(separators)
    }
}

impl From<SeparatorLadder> for Vec<String> {
    fn from(ladder: SeparatorLadder) -> Self {
        ladder.separators
    }
}
