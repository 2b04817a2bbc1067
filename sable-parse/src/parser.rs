mod lexer;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use lexer::Lexer;
pub use lexer::Token;
use miette::Diagnostic;
use sable_ast::{
    CompilationUnit, FunctionDeclaration, FunctionId, IdentifierType, IdentifierTypeId, Item, Stage,
    TypeAliasDeclaration, TypeAliasId,
};
use sable_utils::{Identifier, IndexMap, SourceId, SourceMap, Span, SpannedItem, SymbolId, SymbolInterner};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub struct ParseError {
    kind: ParseErrorKind,
    help: Option<String>,
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> Self {
        Self { kind, help: None }
    }
}

impl ParseError {
    pub fn with_help(
        mut self,
        help: Option<impl Into<String>>,
    ) -> Self {
        self.help = help.map(Into::into);
        self
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Diagnostic for ParseError {
    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.help.as_ref().map(|x| -> Box<dyn std::fmt::Display> { Box::new(x) })
    }

    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.kind.code()
    }

    fn severity(&self) -> Option<miette::Severity> {
        self.kind.severity()
    }

    fn url<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.kind.url()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        self.kind.labels()
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        self.kind.related()
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        self.kind.diagnostic_source()
    }
}

#[derive(Error, Debug, Diagnostic, PartialEq)]
pub enum ParseErrorKind {
    #[error("Expected identifier, found {0}")]
    ExpectedIdentifier(String),
    #[error("Expected token {0}, found {1}")]
    ExpectedToken(Token, Token),
    #[error("Expected one of tokens {}; found {1}", format_toks(.0))]
    ExpectedOneOf(Vec<Token>, Token),
    #[error("File name {0} is not a valid module name")]
    InvalidModuleName(String),
    #[error("Unrecognized input {0:?}")]
    UnrecognizedInput(String),
    #[error("Integer literal {0} is too large")]
    IntegerLiteralTooLarge(String),
}

impl ParseErrorKind {
    pub fn into_err(self) -> ParseError {
        self.into()
    }
}

fn format_toks(toks: &[Token]) -> String {
    let mut buf = toks
        .iter()
        .take(toks.len() - 1)
        .map(|t| format!("{}", t))
        .collect::<Vec<_>>()
        .join(", ");
    if toks.len() == 2 {
        buf.push_str(&format!(" or {}", toks.last().expect("toks is non-empty")));
    } else if toks.len() > 2 {
        buf.push_str(&format!(", or {}", toks.last().expect("toks is non-empty")));
    }
    buf
}

/// Parses one source buffer into one compilation unit. The unit's
/// unresolved-alias and unresolved-chain work lists are seeded here, as
/// type references are encountered.
pub struct Parser<'a> {
    interner:  &'a mut SymbolInterner,
    lexer:     Lexer,
    source_id: SourceId,
    file_name: &'static str,
    errors:    Vec<SpannedItem<ParseError>>,
    peek:      Option<SpannedItem<Token>>,
    help:      Vec<String>,

    // the unit under construction
    pub(crate) functions: IndexMap<FunctionId, SpannedItem<FunctionDeclaration>>,
    pub(crate) type_aliases: IndexMap<TypeAliasId, SpannedItem<TypeAliasDeclaration>>,
    pub(crate) identifier_types: IndexMap<IdentifierTypeId, IdentifierType>,
    pub(crate) unresolved_aliases: Vec<TypeAliasId>,
    pub(crate) unresolved_identifier_types: Vec<IdentifierTypeId>,
    placeholders: BTreeMap<SymbolId, TypeAliasId>,
}

impl<'a> Parser<'a> {
    pub fn new(
        source_id: SourceId,
        sources: &SourceMap,
        interner: &'a mut SymbolInterner,
    ) -> Self {
        Self {
            interner,
            lexer: Lexer::new(source_id, sources.source(source_id)),
            source_id,
            file_name: sources.name(source_id),
            errors: Default::default(),
            peek: None,
            help: Default::default(),
            functions: Default::default(),
            type_aliases: Default::default(),
            identifier_types: Default::default(),
            unresolved_aliases: Default::default(),
            unresolved_identifier_types: Default::default(),
            placeholders: Default::default(),
        }
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    pub fn push_error(
        &mut self,
        err: SpannedItem<ParseErrorKind>,
    ) {
        if self.help.is_empty() {
            return self.errors.push(err.map(|err| err.into_err()));
        }
        let mut help_text = Vec::with_capacity(self.help.len());
        let mut indentation = 0;
        for help in &self.help {
            let text = format!("{}{}{help}", "  ".repeat(indentation), if indentation == 0 { "" } else { "↪ " });
            help_text.push(text);
            indentation += 1;
        }
        let err = err.map(|err| err.into_err().with_help(Some(help_text.join("\n"))));
        self.errors.push(err);
    }

    pub fn slice(&self) -> &'static str {
        self.lexer.slice()
    }

    pub fn intern(
        &mut self,
        internee: Rc<str>,
    ) -> SymbolId {
        self.interner.insert(internee)
    }

    pub fn span(&self) -> Span {
        if let Some(ref peek) = self.peek {
            return peek.span();
        }
        self.lexer.span()
    }

    pub fn peek(&mut self) -> SpannedItem<Token> {
        if let Some(ref peek) = self.peek {
            *peek
        } else {
            let item = self.advance();
            self.peek = Some(item);
            item
        }
    }

    pub fn advance(&mut self) -> SpannedItem<Token> {
        if let Some(tok) = self.peek.take() {
            return tok;
        }
        self.lexer.advance()
    }

    /// doesn't push an error and doesn't advance if the token is not found
    pub fn try_token(
        &mut self,
        tok: Token,
    ) -> Option<SpannedItem<Token>> {
        let peeked_token = self.peek();
        if *peeked_token.item() == tok {
            Some(self.advance())
        } else {
            None
        }
    }

    pub fn token(
        &mut self,
        tok: Token,
    ) -> Option<SpannedItem<Token>> {
        let peeked_token = self.peek();
        if *peeked_token.item() == tok {
            Some(self.advance())
        } else {
            let span = peeked_token.span();
            self.push_error(span.with_item(ParseErrorKind::ExpectedToken(tok, *peeked_token.item())));
            None
        }
    }

    pub fn one_of<const N: usize>(
        &mut self,
        toks: [Token; N],
    ) -> Option<SpannedItem<Token>> {
        match self.peek().item() {
            tok if toks.contains(tok) => self.token(*tok),
            tok => {
                let span = self.span();
                if N == 1 {
                    self.push_error(span.with_item(ParseErrorKind::ExpectedToken(toks[0], *tok)));
                } else {
                    self.push_error(span.with_item(ParseErrorKind::ExpectedOneOf(toks.to_vec(), *tok)));
                }
                None
            },
        }
    }

    pub fn parse<P: Parse>(&mut self) -> Option<P> {
        P::parse(self)
    }

    pub fn many<P: Parse>(&mut self) -> Vec<P> {
        let mut buf = Vec::new();
        while let Some(parsed_item) = P::parse(self) {
            buf.push(parsed_item);
        }
        buf
    }

    /// parses a sequence separated by `separator`, one or more items
    pub fn sequence_one_or_more<P: Parse>(
        &mut self,
        separator: Token,
    ) -> Option<Vec<P>> {
        let mut buf = vec![];
        loop {
            match P::parse(self) {
                Some(item) => buf.push(item),
                None => break,
            }
            if *self.peek().item() == separator {
                self.advance();
            } else {
                break;
            }
        }
        if buf.is_empty() {
            None
        } else {
            Some(buf)
        }
    }

    pub fn errors(&self) -> &[SpannedItem<ParseError>] {
        &self.errors
    }

    pub fn with_help<F, T>(
        &mut self,
        help_text: impl Into<String>,
        f: F,
    ) -> T
    where
        F: Fn(&mut Parser) -> T,
    {
        self.help.push(help_text.into());
        let res = f(self);
        let _ = self.help.pop();
        res
    }

    /// Parse the whole buffer and assemble the compilation unit, stage
    /// [`Stage::Parsed`]. The unit's module name is its file stem.
    pub fn into_result(mut self) -> (CompilationUnit, Vec<SpannedItem<ParseError>>) {
        let name = self.module_name();
        let items: Vec<SpannedItem<Item>> = self.many();
        let trailing = self.peek();
        if *trailing.item() != Token::Eof {
            self.push_error(trailing.span().with_item(ParseErrorKind::ExpectedToken(Token::Eof, *trailing.item())));
        }
        let unit = CompilationUnit {
            name,
            items,
            functions: self.functions,
            type_aliases: self.type_aliases,
            identifier_types: self.identifier_types,
            unresolved_aliases: self.unresolved_aliases,
            unresolved_identifier_types: self.unresolved_identifier_types,
            imported_modules: Vec::new(),
            stage: Stage::Parsed,
        };
        (unit, self.errors)
    }

    fn module_name(&mut self) -> Identifier {
        let stem = std::path::Path::new(self.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default();
        let span = Span::new(self.source_id, (0..0).into());
        let mut chars = stem.chars();
        let valid = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
            && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
        if !valid {
            self.push_error(span.with_item(ParseErrorKind::InvalidModuleName(self.file_name.to_string())));
        }
        let id = self.intern(Rc::from(stem));
        Identifier { id, span }
    }

    pub(crate) fn placeholder_alias(
        &mut self,
        name: Identifier,
    ) -> TypeAliasId {
        if let Some(id) = self.placeholders.get(&name.id) {
            return *id;
        }
        let id = self.type_aliases.insert(name.span.with_item(TypeAliasDeclaration {
            name,
            underlying: None,
        }));
        self.placeholders.insert(name.id, id);
        self.unresolved_aliases.push(id);
        id
    }
}

pub trait Parse: Sized {
    fn parse(p: &mut Parser) -> Option<Self>;
}

impl<T> Parse for SpannedItem<T>
where
    T: Parse,
{
    fn parse(p: &mut Parser) -> Option<Self> {
        let before_span = p.span();
        let result = T::parse(p)?;
        let after_span = p.span();

        Some(before_span.hi_to_hi(after_span).with_item(result))
    }
}

impl Parse for Identifier {
    fn parse(p: &mut Parser) -> Option<Self> {
        let identifier = p.advance();
        if *identifier.item() != Token::Identifier {
            p.push_error(identifier.span().with_item(ParseErrorKind::ExpectedIdentifier(p.slice().to_string())));
            return None;
        }
        let span = identifier.span();
        let slice = Rc::from(p.slice());
        let id = p.intern(slice);
        Some(Identifier { id, span })
    }
}
