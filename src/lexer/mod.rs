use crate::error::{GCodeError, Result};
use logos::Logos;

/// Tokens of a textual move request such as `X10 Y-5 A2 F1500`

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r\n,]+")] // Skip whitespace and separators
#[logos(error = LexerError)]
pub enum Token {
    #[regex(r"[A-Za-z]+", |lex| lex.slice().to_string())]
    Label(String),

    #[regex(r"[-+]?(\d+\.?\d*|\.\d+)", |lex| lex.slice().parse::<f64>().ok())]
    Number(Option<f64>),

    // Comments
    #[regex(r";[^\n]*", logos::skip)]
    #[regex(r"\([^)]*\)", logos::skip)]
    Comment,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexerError;

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lexer error")
    }
}

impl std::error::Error for LexerError {}

/// Lex the input string into tokens, rejecting anything that is not a word
pub fn lex(input: &str) -> Result<Vec<(Token, logos::Span)>> {
    Token::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(LexerError) => Err(GCodeError::argument(format!(
                "unexpected `{}` at {}..{}",
                &input[span.clone()],
                span.start,
                span.end
            ))),
        })
        .collect()
}

/// Pair every label with the number that follows it
///
/// A label glued to the preceding number (`X1e5`) is rejected rather than
/// read as a second word.
pub fn words(input: &str) -> Result<Vec<(String, f64)>> {
    let mut tokens = lex(input)?.into_iter();
    let mut words = Vec::new();
    let mut value_end = None;
    while let Some((token, span)) = tokens.next() {
        let label = match token {
            Token::Label(label) if value_end == Some(span.start) => {
                return Err(GCodeError::argument(format!(
                    "`{}` at {} runs into the preceding value",
                    label, span.start
                )))
            }
            Token::Label(label) => label,
            other => {
                return Err(GCodeError::argument(format!(
                    "expected an axis label at {}, found {:?}",
                    span.start, other
                )))
            }
        };
        match tokens.next() {
            Some((Token::Number(Some(value)), span)) => {
                words.push((label, value));
                value_end = Some(span.end);
            }
            Some((_, span)) => {
                return Err(GCodeError::argument(format!(
                    "expected a value for `{}` at {}",
                    label, span.start
                )))
            }
            None => {
                return Err(GCodeError::argument(format!(
                    "missing value for `{}`",
                    label
                )))
            }
        }
    }
    Ok(words)
}
