use logos::Logos;
use sable_utils::{SourceId, Span, SpannedItem};

#[derive(Debug, Logos, PartialEq, Clone, Copy)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token("=")]
    Equals,
    #[token("->")]
    Arrow,
    #[token("import")]
    Import,
    #[token("type")]
    TypeKeyword,
    #[token("fn")]
    FnKeyword,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[regex("[0-9]+")]
    Integer,
    #[regex(r#""[^"]*""#)]
    String,
    #[regex("[_a-zA-Z][_a-zA-Z0-9]*")]
    Identifier,
    /// Produced for input the lexer cannot tokenize.
    Unrecognized,
    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        use Token::*;
        match self {
            OpenParen => write!(f, "("),
            CloseParen => write!(f, ")"),
            OpenBrace => write!(f, "{{"),
            CloseBrace => write!(f, "}}"),
            Comma => write!(f, ","),
            Colon => write!(f, ":"),
            Semicolon => write!(f, ";"),
            Dot => write!(f, "."),
            Equals => write!(f, "="),
            Arrow => write!(f, "->"),
            Import => write!(f, "import"),
            TypeKeyword => write!(f, "type"),
            FnKeyword => write!(f, "fn"),
            True => write!(f, "true"),
            False => write!(f, "false"),
            Integer => write!(f, "integer"),
            String => write!(f, "string"),
            Identifier => write!(f, "identifier"),
            Unrecognized => write!(f, "unrecognized input"),
            Eof => write!(f, "EOF"),
        }
    }
}

pub struct Lexer {
    lexer:  logos::Lexer<'static, Token>,
    source: SourceId,
}

impl Lexer {
    pub fn new(
        source: SourceId,
        text: &'static str,
    ) -> Self {
        Self {
            lexer: Token::lexer(text),
            source,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.source, self.lexer.span().into())
    }

    pub fn slice(&self) -> &'static str {
        self.lexer.slice()
    }

    pub fn advance(&mut self) -> SpannedItem<Token> {
        let pre_advance_span = self.span();
        match self.lexer.next() {
            None => pre_advance_span.with_item(Token::Eof),
            Some(Ok(tok)) => self.span().with_item(tok),
            Some(Err(_)) => self.span().with_item(Token::Unrecognized),
        }
    }
}
