use santiago::lexer::LexerRules;

use crate::coords::Address;
use crate::error::{Error, Result};
use crate::expr::CellRef;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Num(f64),
    Ref(CellRef),
    Name(String),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    Comma,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// 1-based column of the token within the formula.
    pub column: usize,
}

impl Token {
    /// Text used when reporting this token in an error message.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of formula".to_string(),
            _ => format!("'{}' at column {}", self.lexeme, self.column),
        }
    }
}

pub struct Scanner {
    lexer: LexerRules,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            lexer: santiago::lexer_rules!(
                "DEFAULT" | "NUM" = pattern r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][-+]?[0-9]+)?";
                "DEFAULT" | "REF" = pattern r"\$?[A-Za-z]+\$?[0-9]+";
                "DEFAULT" | "NAME" = pattern r"[A-Za-z_]+";
                "DEFAULT" | "+" = string "+";
                "DEFAULT" | "-" = string "-";
                "DEFAULT" | "*" = string "*";
                "DEFAULT" | "/" = string "/";
                "DEFAULT" | "(" = string "(";
                "DEFAULT" | ")" = string ")";
                "DEFAULT" | "," = string ",";
                "DEFAULT" | "WS" = pattern r"\s" => |lexer| lexer.skip();
            ),
        }
    }

    /// Splits `text` into tokens terminated by [`TokenKind::Eof`]. Relative
    /// reference axes are stored as offsets from `base`, or from `a1` when
    /// no base is given.
    pub fn scan(&self, text: &str, base: Option<Address>) -> Result<Vec<Token>> {
        let base = base.unwrap_or_default();
        let lexemes = santiago::lexer::lex(&self.lexer, text)?;
        let mut tokens = Vec::with_capacity(lexemes.len() + 1);
        for lexeme in lexemes.iter() {
            let column = lexeme.position.column;
            let raw = lexeme.raw.as_str();
            let kind = match lexeme.kind.as_str() {
                "NUM" => TokenKind::Num(parse_number(raw, column)?),
                "REF" => TokenKind::Ref(CellRef::parse(raw, base).map_err(|_| {
                    Error::Syntax(format!("bad cell reference '{raw}' at column {column}"))
                })?),
                "NAME" => TokenKind::Name(raw.to_ascii_lowercase()),
                "+" => TokenKind::Plus,
                "-" => TokenKind::Minus,
                "*" => TokenKind::Star,
                "/" => TokenKind::Slash,
                "(" => TokenKind::LeftParen,
                ")" => TokenKind::RightParen,
                "," => TokenKind::Comma,
                kind => unreachable!("lexer produced unknown token kind {kind}"),
            };
            tokens.push(Token {
                kind,
                lexeme: raw.to_string(),
                column,
            });
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: "<EOF>".to_string(),
            column: text.chars().count() + 1,
        });
        Ok(tokens)
    }
}

fn parse_number(raw: &str, column: usize) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::Syntax(format!(
            "bad number '{raw}' at column {column}"
        ))),
    }
}
