//! Tokenizer for the mini-language, built on `logos`.

use std::ops::Range;

use logos::Logos;

use crate::error::ParseError;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token<'a> {
    // === Keywords ===
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("assert")]
    Assert,

    /// Identifier `[A-Za-z_][A-Za-z0-9_]*`
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'a str),

    /// Non-negative integer literal. Literals that overflow `i128` are a lex error.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i128>().ok())]
    Int(i128),

    // === Operators ===
    #[token(":=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semi,
}

impl Token<'_> {
    /// Short description used in "expected ..., found ..." messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::Int(n) => format!("number `{n}`"),
            other => format!("`{}`", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::Assert => "assert",
            Token::Ident(_) | Token::Int(_) => "",
            Token::Assign => ":=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Le => "<=",
            Token::Ge => ">=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Bang => "!",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Semi => ";",
        }
    }
}

/// A token and its byte range in the source.
pub type Spanned<'a> = (Token<'a>, Range<usize>);

/// Split `source` into tokens, failing on the first character sequence that
/// is not part of the language.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<'_>>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let slice = lexer.slice();
                let message = if !slice.is_empty() && slice.bytes().all(|b| b.is_ascii_digit()) {
                    "integer literal out of range".to_string()
                } else {
                    format!("unexpected character `{slice}`")
                };
                return Err(ParseError::at(source, span, message));
            }
        }
    }
    tracing::trace!(count = tokens.len(), "Tokenized program");
    Ok(tokens)
}
