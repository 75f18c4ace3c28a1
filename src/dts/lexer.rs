/*!
# Declaration File Lexer

Tokenizer for the TypeScript declaration-file subset that `tsc` emits
(`.d.ts`). Keywords are not separate token kinds: TypeScript keywords are
contextual, so the parser checks identifier text instead.

JSDoc blocks (`/** ... */`) are not tokens. The most recent one is
attached to the next real token as its leading doc.
*/

use logos::Logos;
use std::fmt;

use crate::core::fs_utils::strip_bom;
use crate::core::{DocsError, Position, Result, Span};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    // Comments
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,

    // Literals
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    StringLiteral,
    #[regex(r"`[^`]*`")]
    TemplateLiteral,
    #[regex(r"[0-9][0-9_]*(\.[0-9]+)?([eE][+-]?[0-9]+)?n?")]
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    NumberLiteral,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Identifier,

    // Punctuation
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("=")]
    Equal,
    #[token("=>")]
    Arrow,
    #[token("|")]
    Pipe,
    #[token("&")]
    Ampersand,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("@")]
    At,
    #[token("!")]
    Bang,
    #[token("#")]
    Hash,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("~")]
    Tilde,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::LineComment | TokenKind::BlockComment => "COMMENT",
            TokenKind::StringLiteral => "STRING",
            TokenKind::TemplateLiteral => "TEMPLATE",
            TokenKind::NumberLiteral => "NUMBER",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Question => "?",
            TokenKind::Dot => ".",
            TokenKind::Ellipsis => "...",
            TokenKind::Equal => "=",
            TokenKind::Arrow => "=>",
            TokenKind::Pipe => "|",
            TokenKind::Ampersand => "&",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::At => "@",
            TokenKind::Bang => "!",
            TokenKind::Hash => "#",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Tilde => "~",
            TokenKind::Percent => "%",
            TokenKind::Caret => "^",
            TokenKind::Eof => "EOF",
        };
        f.write_str(text)
    }
}

/// Consumes the rest of a `/* ... */` comment. Unterminated comments are lex errors.
fn block_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

/// Token with position information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    pub position: Position,
    /// Raw `/** ... */` block seen right before this token
    pub leading_doc: Option<String>,
}

impl Token {
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == text
    }
}

/// Tokenizes a declaration file. The returned vector always ends with `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let source = strip_bom(input);
    // Offsets are reported against the caller's string.
    let base = input.len() - source.len();

    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut pending_doc: Option<String> = None;
    let mut tracker = LineTracker::new(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let text = lexer.slice();
        let position = tracker.position_at(range.start, base);

        match result {
            Ok(TokenKind::BlockComment) => {
                if text.starts_with("/**") && text != "/**/" {
                    pending_doc = Some(text.to_string());
                }
            }
            Ok(kind) => tokens.push(Token {
                kind,
                text: text.to_string(),
                span: Span::new(range.start + base, range.end + base),
                position,
                leading_doc: pending_doc.take(),
            }),
            Err(()) => {
                return Err(DocsError::Lex {
                    position,
                    text: text.to_string(),
                })
            }
        }
    }

    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        span: Span::new(end + base, end + base),
        position: tracker.position_at(end, base),
        leading_doc: pending_doc.take(),
    });

    Ok(tokens)
}

/// Converts byte offsets to line/column incrementally; offsets only grow.
struct LineTracker<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    line_start: usize,
}

impl<'a> LineTracker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn position_at(&mut self, offset: usize, base: usize) -> Position {
        if offset > self.offset {
            let chunk = &self.source.as_bytes()[self.offset..offset];
            for (i, byte) in chunk.iter().enumerate() {
                if *byte == b'\n' {
                    self.line += 1;
                    self.line_start = self.offset + i + 1;
                }
            }
            self.offset = offset;
        }
        let column = self.source[self.line_start..offset].chars().count() + 1;
        Position::new(self.line, column, offset + base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_method_signature_tokens() {
        assert_eq!(
            kinds("getKline(params: P): Promise<R[]>;"),
            vec![
                TokenKind::Identifier,
                TokenKind::LeftParen,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::RightParen,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Less,
                TokenKind::Identifier,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Greater,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_nested_generics_close_separately() {
        let tokens = kinds("A<B<C>>");
        assert_eq!(tokens[5], TokenKind::Greater);
        assert_eq!(tokens[6], TokenKind::Greater);
    }

    #[test]
    fn test_jsdoc_attaches_to_next_token() {
        let tokens = tokenize("/** Get server time. */\n/* plain */ getServerTime(): void;").unwrap();
        assert_eq!(tokens[0].text, "getServerTime");
        assert_eq!(tokens[0].leading_doc.as_deref(), Some("/** Get server time. */"));
        assert!(tokens[1].leading_doc.is_none());
    }

    #[test]
    fn test_multiline_jsdoc_block() {
        let source = "/**\n * Query the kline data.\n * @param params - category and symbol\n */\ngetKline(params: GetKlineParamsV5): Promise<object>;";
        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens[0].text, "getKline");
        assert_eq!(tokens[0].position.line, 5);
        let doc = tokens[0].leading_doc.as_deref().unwrap();
        assert!(doc.starts_with("/**\n * Query"));
        assert!(doc.ends_with("*/"));
    }

    #[test]
    fn test_unterminated_block_comment_is_error() {
        assert!(matches!(tokenize("/** never closed\nfoo"), Err(DocsError::Lex { .. })));
    }

    #[test]
    fn test_line_comments_skipped_and_positions() {
        let tokens = tokenize("/// <reference types=\"node\" />\nexport type A = 'spot' | \"linear\";").unwrap();
        assert_eq!(tokens[0].text, "export");
        assert_eq!(tokens[0].position.line, 2);
        assert_eq!(tokens[0].position.column, 1);
        let literal = tokens.iter().find(|t| t.kind == TokenKind::StringLiteral).unwrap();
        assert_eq!(literal.text, "'spot'");
    }

    #[test]
    fn test_arrow_and_ellipsis() {
        assert_eq!(
            kinds("(...args: any[]) => void"),
            vec![
                TokenKind::LeftParen,
                TokenKind::Ellipsis,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::RightParen,
                TokenKind::Arrow,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bom_is_ignored_but_offsets_kept() {
        let input = "\u{FEFF}type A = string;";
        let tokens = tokenize(input).unwrap();
        assert_eq!(tokens[0].text, "type");
        assert_eq!(tokens[0].span.slice(input), "type");
    }

    #[test]
    fn test_unexpected_character_is_error() {
        let err = tokenize("type A = \u{00A7};").unwrap_err();
        match err {
            DocsError::Lex { position, text } => {
                assert_eq!(position.line, 1);
                assert_eq!(text, "\u{00A7}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
