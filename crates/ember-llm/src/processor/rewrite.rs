use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;
use crate::types::Message;

/// Replaces every match of one pattern in all message text
#[derive(Debug)]
pub struct RegexRewrite {
    regex: Regex,
    replacement: String,
}

impl RegexRewrite {
    /// Compile `pattern` with single-letter `flags`
    ///
    /// `i`, `m`, `s` and `x` toggle the matching regex options; `u` and `g`
    /// are accepted and always in effect.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRegex` for unknown flags or a pattern
    /// that does not compile
    pub fn new(pattern: &str, flags: &str, replacement: String) -> Result<Self, ConfigError> {
        let mut builder = RegexBuilder::new(pattern);

        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                'u' | 'g' => &mut builder,
                other => {
                    return Err(ConfigError::InvalidRegex {
                        pattern: pattern.to_owned(),
                        reason: format!("unsupported flag '{other}'"),
                    });
                }
            };
        }

        let regex = builder.build().map_err(|e| ConfigError::InvalidRegex {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { regex, replacement })
    }

    pub(super) fn apply(&self, messages: &mut [Message]) {
        for message in messages {
            message
                .content
                .map_text(|text| self.regex.replace_all(text, self.replacement.as_str()).into_owned());
        }
    }
}
