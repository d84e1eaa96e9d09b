//! Field name to document key conversion

use serde::{Deserialize, Serialize};

/// How Rust field names become document keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum NamingStrategy {
    /// `max_players`
    #[default]
    SnakeCase,
    /// `max-players`
    KebabCase,
    /// `maxPlayers`
    CamelCase,
    /// `MaxPlayers`
    PascalCase,
    /// Field name used as-is
    Identity,
}

impl NamingStrategy {
    /// Convert a field (or parameter) name into a key
    #[must_use]
    pub fn apply(self, name: &str) -> String {
        if self == Self::Identity {
            return name.to_owned();
        }

        let words = split_words(name);
        match self {
            Self::SnakeCase => words.join("_"),
            Self::KebabCase => words.join("-"),
            Self::CamelCase => words
                .iter()
                .enumerate()
                .map(|(index, word)| {
                    if index == 0 {
                        word.clone()
                    } else {
                        capitalize(word)
                    }
                })
                .collect(),
            Self::PascalCase | Self::Identity => words.iter().map(|word| capitalize(word)).collect(),
        }
    }
}

/// Lowercase words of an identifier in any common casing
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (index, &ch) in chars.iter().enumerate() {
        if matches!(ch, '_' | '-' | ' ' | '.') {
            if !current.is_empty() {
                words.push(core::mem::take(&mut current));
            }
            continue;
        }

        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(|c| c.is_lowercase());
            // "maxPlayers" splits before P, "HTTPServer" splits before S
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(core::mem::take(&mut current));
            }
        }

        current.extend(ch.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_is_default() {
        assert_eq!(NamingStrategy::default(), NamingStrategy::SnakeCase);
        assert_eq!(NamingStrategy::SnakeCase.apply("max_players"), "max_players");
        assert_eq!(NamingStrategy::SnakeCase.apply("maxPlayers"), "max_players");
        assert_eq!(NamingStrategy::SnakeCase.apply("HTTPServer"), "http_server");
        assert_eq!(NamingStrategy::SnakeCase.apply("slot2Item"), "slot2_item");
    }

    #[test]
    fn other_strategies() {
        assert_eq!(NamingStrategy::KebabCase.apply("max_players"), "max-players");
        assert_eq!(NamingStrategy::CamelCase.apply("max_players"), "maxPlayers");
        assert_eq!(NamingStrategy::PascalCase.apply("max_players"), "MaxPlayers");
        assert_eq!(NamingStrategy::Identity.apply("max_Players"), "max_Players");
    }
}
