//! Structured parsing of free-text selection responses.
//!
//! A selection response names which cast to render, the token name, and an
//! image description, as loose `key: value` lines:
//!
//! ```text
//! **Cast index:** 2
//! - Token name: "MoonCat"
//! Image description: a cat on the moon
//! ```
//!
//! Every field is optional. [`SelectionFields::resolve`] applies the
//! documented defaults; nothing else is guessed.

/// Token name used when a response does not name one.
pub const DEFAULT_TOKEN_NAME: &str = "CAST";

/// Fields found in a selection response, each independently optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionFields {
    pub cast_index: Option<usize>,
    pub token_name: Option<String>,
    pub image_description: Option<String>,
}

/// Selection with defaults applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub cast_index: usize,
    pub token_name: String,
    pub image_description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldKey {
    CastIndex,
    TokenName,
    ImageDescription,
}

impl FieldKey {
    fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .chars()
            .filter(|ch| ch.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "castindex" | "index" | "selectedcast" | "cast" | "castnumber" => Some(Self::CastIndex),
            "tokenname" | "name" | "token" => Some(Self::TokenName),
            "imagedescription" | "description" | "image" => Some(Self::ImageDescription),
            _ => None,
        }
    }
}

/// Parse a selection response. The first occurrence of each field wins.
pub fn parse_selection(response: &str) -> SelectionFields {
    let mut fields = SelectionFields::default();
    for raw_line in response.lines() {
        let line = strip_markup(raw_line);
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let Some(key) = FieldKey::from_label(label) else {
            continue;
        };
        let value = clean_value(value);
        if value.is_empty() {
            continue;
        }
        match key {
            FieldKey::CastIndex => {
                if fields.cast_index.is_none() {
                    fields.cast_index = first_integer(value);
                }
            }
            FieldKey::TokenName => {
                if fields.token_name.is_none() {
                    fields.token_name = Some(value.to_string());
                }
            }
            FieldKey::ImageDescription => {
                if fields.image_description.is_none() {
                    fields.image_description = Some(value.to_string());
                }
            }
        }
    }
    fields
}

impl SelectionFields {
    /// Apply defaults against a feed of `cast_count` casts.
    ///
    /// A missing or out-of-range index selects cast 0, a missing token name
    /// becomes [`DEFAULT_TOKEN_NAME`], and a missing description is empty.
    pub fn resolve(self, cast_count: usize) -> ResolvedSelection {
        let cast_index = match self.cast_index {
            Some(idx) if idx < cast_count => idx,
            Some(idx) => {
                log::warn!(
                    "selection index {} out of range for {} cast(s); using 0",
                    idx,
                    cast_count
                );
                0
            }
            None => 0,
        };
        ResolvedSelection {
            cast_index,
            token_name: self
                .token_name
                .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string()),
            image_description: self.image_description.unwrap_or_default(),
        }
    }
}

fn strip_markup(line: &str) -> String {
    let trimmed = line.trim_start_matches(|ch: char| {
        ch.is_whitespace() || matches!(ch, '-' | '*' | '#' | '>' | '•')
    });
    trimmed.replace("**", "").replace('`', "")
}

fn clean_value(value: &str) -> &str {
    value
        .trim()
        .trim_matches(|ch: char| matches!(ch, '"' | '\'' | '*' | '_'))
        .trim()
}

fn first_integer(value: &str) -> Option<usize> {
    let digits: String = value
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
