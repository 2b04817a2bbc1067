pub use parser::{Parse, ParseError, ParseErrorKind, Parser, Token};

mod parse_to_ast;
mod parser;
