//! Line and number formatting
//!
//! A line is `<MNEMONIC> <WORD>... <comment>`, with one space between
//! tokens. Inline comments are optional; standalone comment lines are
//! always written.

use serde::{Deserialize, Serialize};

/// Comment delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommentSymbol {
    /// `; text`
    #[default]
    #[serde(rename = ";")]
    Semicolon,
    /// `(text)`
    #[serde(rename = "(")]
    Parenthesis,
}

/// Render a value with `precision` decimals, trailing zeros stripped
pub fn format_number(value: f64, precision: usize) -> String {
    let mut text = format!("{:.*}", precision, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// A single instruction before rendering
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub mnemonic: String,
    pub words: Vec<String>,
    pub comment: Option<String>,
}

impl Statement {
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            words: Vec::new(),
            comment: None,
        }
    }

    /// Append a pre-rendered word such as `X10` or `G1 D10`
    pub fn word(mut self, word: impl Into<String>) -> Self {
        self.words.push(word.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineFormatter {
    pub precision: usize,
    pub comments: bool,
    pub comment_symbol: CommentSymbol,
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self {
            precision: 5,
            comments: true,
            comment_symbol: CommentSymbol::Semicolon,
        }
    }
}

impl LineFormatter {
    pub fn number(&self, value: f64) -> String {
        format_number(value, self.precision)
    }

    /// `X10`, `A-2.5`
    pub fn param(&self, label: &str, value: f64) -> String {
        format!("{}{}", label, self.number(value))
    }

    pub fn comment(&self, text: &str) -> String {
        match self.comment_symbol {
            CommentSymbol::Semicolon => format!("; {}", text),
            CommentSymbol::Parenthesis => format!("({})", text),
        }
    }

    pub fn render(&self, statement: &Statement) -> String {
        let mut line = statement.mnemonic.clone();
        for word in &statement.words {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if let (true, Some(comment)) = (self.comments, &statement.comment) {
            line.push(' ');
            line.push_str(&self.comment(comment));
        }
        line
    }
}
