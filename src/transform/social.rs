use crate::constants::transform::ELONGATION_LIMIT;
use crate::types::TokenSequence;

/// ASCII emoticons kept whole, longest first so prefixes never win.
const EMOTICONS: [&str; 16] = [
    ":'(", ":-)", ":-(", ":-D", ":-P", ";-)", ":-/", ":)", ":(", ":D", ":P", ":p", ";)", ":/",
    "<3", "xD",
];

/// Tokenizer tuned for informal blog and social-media text.
///
/// Words keep inner apostrophes and hyphens (`don't`, `well-known`), numbers
/// keep inner separators (`3.14`, `1,000`), `@handles` and `#tags` stay whole,
/// runs of one punctuation character form one token (`!!`, `...`), and every
/// other symbol (emoji included) becomes its own token.
#[derive(Clone, Debug)]
pub struct SocialTokenizer {
    /// Keep original casing; when false every token is lower-cased.
    pub preserve_case: bool,
    /// Cut runs of 3+ identical characters down to three (`soooo` -> `sooo`).
    pub reduce_elongation: bool,
    /// Drop `@handle` tokens.
    pub strip_handles: bool,
}

impl Default for SocialTokenizer {
    fn default() -> Self {
        Self {
            preserve_case: true,
            reduce_elongation: true,
            strip_handles: false,
        }
    }
}

impl SocialTokenizer {
    /// Toggle case preservation.
    pub fn with_preserve_case(mut self, preserve_case: bool) -> Self {
        self.preserve_case = preserve_case;
        self
    }

    /// Toggle elongation reduction.
    pub fn with_reduce_elongation(mut self, reduce_elongation: bool) -> Self {
        self.reduce_elongation = reduce_elongation;
        self
    }

    /// Toggle handle stripping.
    pub fn with_strip_handles(mut self, strip_handles: bool) -> Self {
        self.strip_handles = strip_handles;
        self
    }

    /// Tokenize `text`.
    pub fn tokenize(&self, text: &str) -> TokenSequence {
        let chars: Vec<char> = if self.reduce_elongation {
            reduce_elongation(text).chars().collect()
        } else {
            text.chars().collect()
        };

        let mut tokens = Vec::new();
        let mut idx = 0;
        while idx < chars.len() {
            let ch = chars[idx];
            if ch.is_whitespace() {
                idx += 1;
                continue;
            }
            if let Some(len) = match_emoticon(&chars[idx..]) {
                tokens.push(chars[idx..idx + len].iter().collect());
                idx += len;
                continue;
            }
            let prefixed = (ch == '@' || ch == '#')
                && chars.get(idx + 1).copied().is_some_and(is_word_char);
            if is_word_char(ch) || prefixed {
                let start = idx;
                idx += 1;
                while idx < chars.len() && (is_word_char(chars[idx]) || is_joiner(&chars, idx)) {
                    idx += 1;
                }
                let token: String = chars[start..idx].iter().collect();
                if !(self.strip_handles && token.starts_with('@')) {
                    tokens.push(token);
                }
                continue;
            }
            if ch.is_ascii_punctuation() {
                let start = idx;
                while idx < chars.len() && chars[idx] == ch {
                    idx += 1;
                }
                tokens.push(chars[start..idx].iter().collect());
                continue;
            }
            tokens.push(ch.to_string());
            idx += 1;
        }

        if !self.preserve_case {
            for token in &mut tokens {
                if !EMOTICONS.contains(&token.as_str()) {
                    *token = token.to_lowercase();
                }
            }
        }
        tokens
    }
}

/// Cut every run of identical characters longer than the elongation limit.
pub fn reduce_elongation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous = None;
    let mut run = 0usize;
    for ch in text.chars() {
        if Some(ch) == previous {
            run += 1;
        } else {
            previous = Some(ch);
            run = 1;
        }
        if run <= ELONGATION_LIMIT {
            out.push(ch);
        }
    }
    out
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn is_joiner(chars: &[char], idx: usize) -> bool {
    if idx == 0 || idx + 1 >= chars.len() {
        return false;
    }
    let (before, after) = (chars[idx - 1], chars[idx + 1]);
    match chars[idx] {
        '\'' | '-' => is_word_char(before) && is_word_char(after),
        '.' | ',' => before.is_ascii_digit() && after.is_ascii_digit(),
        _ => false,
    }
}

fn match_emoticon(chars: &[char]) -> Option<usize> {
    EMOTICONS.iter().find_map(|emoticon| {
        let len = emoticon.chars().count();
        let matches = chars.len() >= len
            && emoticon.chars().zip(chars.iter()).all(|(a, b)| a == *b)
            && chars.get(len).is_none_or(|next| !is_word_char(*next));
        matches.then_some(len)
    })
}
