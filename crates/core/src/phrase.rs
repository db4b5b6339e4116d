//! Conversion between utterance templates such as `"hi {name}"` and token sequences.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub is_placeholder: bool,
}

impl Token {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_placeholder: false,
        }
    }

    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            text: name.into(),
            is_placeholder: true,
        }
    }
}

/// Splits a phrase into literal and placeholder tokens.
///
/// A placeholder is a `{...}` segment whose body holds no other brace. Anything
/// else, unmatched braces included, stays literal. Every placeholder is
/// preceded by a literal token, empty when the placeholder opens the phrase or
/// directly follows another one. The text after the last placeholder only
/// becomes a token when it is non-empty, and a phrase without placeholders
/// yields exactly one literal token.
pub fn to_tokens(phrase: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(open) = phrase[cursor..].find('{').map(|offset| cursor + offset) {
        let body_start = open + 1;
        let rest = &phrase[body_start..];
        let close = match rest.find(['{', '}']) {
            Some(offset) if rest.as_bytes()[offset] == b'}' => body_start + offset,
            Some(offset) => {
                // another `{` before any `}`: this one is literal
                cursor = body_start + offset;
                continue;
            }
            None => break,
        };

        tokens.push(Token::literal(&phrase[literal_start..open]));
        tokens.push(Token::placeholder(&phrase[body_start..close]));

        cursor = close + 1;
        literal_start = cursor;
    }

    if literal_start < phrase.len() || tokens.is_empty() {
        tokens.push(Token::literal(&phrase[literal_start..]));
    }

    tokens
}

pub fn to_phrase(tokens: &[Token]) -> String {
    let mut phrase = String::new();
    for token in tokens {
        if token.is_placeholder {
            phrase.push('{');
            phrase.push_str(&token.text);
            phrase.push('}');
        } else {
            phrase.push_str(&token.text);
        }
    }
    phrase
}

pub fn placeholders(phrase: &str) -> Vec<String> {
    to_tokens(phrase)
        .into_iter()
        .filter(|token| token.is_placeholder)
        .map(|token| token.text)
        .collect()
}
