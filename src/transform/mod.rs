//! Transform chain: one tokenizer followed by an ordered list of token mappers.
//!
//! `TransformChain::preprocess` is a left fold of the mappers over the
//! tokenizer's output. Every built-in step is pure, so running the chain twice
//! on the same text yields the same tokens.

use std::fmt;
use std::sync::Arc;

use crate::constants::transform::{NONASCII_TOKEN, NUM_TOKEN};
use crate::types::TokenSequence;

/// Vocabulary impact estimation for mappers.
pub mod estimate;
/// Punctuation-, emoticon- and elongation-aware tokenizer.
pub mod social;

pub use social::SocialTokenizer;

/// User-supplied tokenizer.
pub type TokenizeFn = Arc<dyn Fn(&str) -> TokenSequence + Send + Sync + 'static>;

/// User-supplied token mapper.
pub type MapFn = Arc<dyn Fn(TokenSequence) -> TokenSequence + Send + Sync + 'static>;

/// Turns raw text into an ordered token sequence.
#[derive(Clone)]
pub enum Tokenizer {
    /// Split on Unicode whitespace; punctuation stays attached.
    Whitespace,
    /// Social-media aware splitting (see `SocialTokenizer`).
    Social(SocialTokenizer),
    /// Arbitrary pure tokenizer.
    Custom(TokenizeFn),
}

impl Tokenizer {
    /// Tokenize `text`.
    pub fn tokenize(&self, text: &str) -> TokenSequence {
        match self {
            Tokenizer::Whitespace => text.split_whitespace().map(str::to_string).collect(),
            Tokenizer::Social(tokenizer) => tokenizer.tokenize(text),
            Tokenizer::Custom(tokenize) => tokenize(text),
        }
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tokenizer::Whitespace => f.write_str("Whitespace"),
            Tokenizer::Social(tokenizer) => f.debug_tuple("Social").field(tokenizer).finish(),
            Tokenizer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Rewrites a token sequence into another token sequence.
#[derive(Clone)]
pub enum TokenMapper {
    /// Replace numeral tokens (`25`, `3.14`, `1,000`) with `NUM`.
    MaskNumerals,
    /// Replace tokens containing any non-ASCII character with `NONASCII`.
    MaskNonAscii,
    /// Lower-case every token.
    Lowercase,
    /// Split leading and trailing punctuation runs off word tokens.
    SplitPunctuation,
    /// Arbitrary pure mapper.
    Custom(MapFn),
}

impl TokenMapper {
    /// Apply the mapper to a whole sequence.
    pub fn apply(&self, tokens: TokenSequence) -> TokenSequence {
        match self {
            TokenMapper::MaskNumerals => tokens
                .into_iter()
                .map(|token| {
                    if is_numeral(&token) {
                        NUM_TOKEN.to_string()
                    } else {
                        token
                    }
                })
                .collect(),
            TokenMapper::MaskNonAscii => tokens
                .into_iter()
                .map(|token| {
                    if token.is_ascii() {
                        token
                    } else {
                        NONASCII_TOKEN.to_string()
                    }
                })
                .collect(),
            TokenMapper::Lowercase => tokens
                .into_iter()
                .map(|token| token.to_lowercase())
                .collect(),
            TokenMapper::SplitPunctuation => {
                let mut out = Vec::with_capacity(tokens.len());
                for token in &tokens {
                    split_punctuation(token, &mut out);
                }
                out
            }
            TokenMapper::Custom(map) => map(tokens),
        }
    }

    /// Apply the mapper to a single token.
    pub fn map_token(&self, token: &str) -> TokenSequence {
        self.apply(vec![token.to_string()])
    }
}

impl fmt::Debug for TokenMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenMapper::MaskNumerals => "MaskNumerals",
            TokenMapper::MaskNonAscii => "MaskNonAscii",
            TokenMapper::Lowercase => "Lowercase",
            TokenMapper::SplitPunctuation => "SplitPunctuation",
            TokenMapper::Custom(_) => "Custom(..)",
        };
        f.write_str(name)
    }
}

/// Ordered tokenizer + mapper pipeline.
#[derive(Clone, Debug)]
pub struct TransformChain {
    tokenizer: Tokenizer,
    mappers: Vec<TokenMapper>,
}

impl Default for TransformChain {
    fn default() -> Self {
        Self::new(Tokenizer::Whitespace)
    }
}

impl TransformChain {
    /// Create a chain with `tokenizer` and no mappers.
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            mappers: Vec::new(),
        }
    }

    /// Append a mapper; mappers run in the order they were added.
    pub fn with_mapper(mut self, mapper: TokenMapper) -> Self {
        self.mappers.push(mapper);
        self
    }

    /// Configured tokenizer.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Configured mappers in application order.
    pub fn mappers(&self) -> &[TokenMapper] {
        &self.mappers
    }

    /// Tokenize `text` and fold every mapper over the result.
    pub fn preprocess(&self, text: &str) -> TokenSequence {
        self.mappers
            .iter()
            .fold(self.tokenizer.tokenize(text), |tokens, mapper| {
                mapper.apply(tokens)
            })
    }
}

/// Digits, optionally grouped by single `.` or `,` separators between digits.
pub fn is_numeral(token: &str) -> bool {
    let bytes = token.as_bytes();
    if bytes.is_empty() || !bytes[0].is_ascii_digit() || !bytes[bytes.len() - 1].is_ascii_digit()
    {
        return false;
    }
    let mut previous_separator = false;
    for &byte in bytes {
        match byte {
            b'0'..=b'9' => previous_separator = false,
            b'.' | b',' if !previous_separator => previous_separator = true,
            _ => return false,
        }
    }
    true
}

fn split_punctuation(token: &str, out: &mut TokenSequence) {
    let start = token.char_indices().find(|(_, ch)| ch.is_alphanumeric());
    let end = token
        .char_indices()
        .rev()
        .find(|(_, ch)| ch.is_alphanumeric());
    let (Some((start, _)), Some((last, last_ch))) = (start, end) else {
        out.push(token.to_string());
        return;
    };
    let end = last + last_ch.len_utf8();
    for part in [&token[..start], &token[start..end], &token[end..]] {
        if !part.is_empty() {
            out.push(part.to_string());
        }
    }
}
