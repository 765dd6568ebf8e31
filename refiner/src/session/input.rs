//! Idea input rules
//!
//! Markup tags are stripped before anything else looks at the idea, then the
//! result is trimmed and checked against the length cap.

use regex::Regex;
use tracing::debug;

use super::state::SessionError;

/// Longest accepted idea, in characters
pub const MAX_IDEA_CHARS: usize = 2000;

/// An opening or closing tag, or a dangling `<tag` at the very end
const TAG_PATTERN: &str = r"</?[^>]+(>|$)";

pub struct IdeaSanitizer {
    tags: Regex,
}

impl IdeaSanitizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            tags: Regex::new(TAG_PATTERN)?,
        })
    }

    /// Strip tags and surrounding whitespace
    pub fn clean(&self, raw: &str) -> String {
        self.tags.replace_all(raw, "").trim().to_string()
    }

    /// The cleaned idea, or why it cannot start a refinement
    pub fn accept(&self, raw: &str) -> Result<String, SessionError> {
        let idea = self.clean(raw);
        let len = idea.chars().count();
        debug!(raw_len = raw.len(), len, "IdeaSanitizer::accept: called");
        if idea.is_empty() {
            return Err(SessionError::EmptyIdea);
        }
        if len > MAX_IDEA_CHARS {
            return Err(SessionError::IdeaTooLong {
                len,
                max: MAX_IDEA_CHARS,
            });
        }
        Ok(idea)
    }
}
