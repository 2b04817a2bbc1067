pub use crate::ast::*;

mod ast;
