use std::rc::Rc;

// using this crate's Parser, parse a compilation unit's items.
use sable_ast::*;
use sable_utils::{Identifier, Path, Span, SpannedItem};

use crate::{
    parser::{Parse, ParseErrorKind, Token},
    Parser,
};

impl Parse for Item {
    fn parse(p: &mut Parser) -> Option<Self> {
        match p.peek().item() {
            Token::Import => Some(Item::Import(p.parse()?)),
            Token::TypeKeyword => {
                let decl: SpannedItem<TypeAliasDeclaration> = p.parse()?;
                Some(Item::TypeAlias(p.type_aliases.insert(decl)))
            },
            Token::FnKeyword => {
                let decl: SpannedItem<FunctionDeclaration> = p.parse()?;
                Some(Item::Function(p.functions.insert(decl)))
            },
            Token::Eof => None,
            _ => {
                let expr = parse_expr(p)?;
                let _ = p.try_token(Token::Semicolon);
                Some(Item::Expr(expr))
            },
        }
    }
}

impl Parse for ImportStatement {
    fn parse(p: &mut Parser) -> Option<Self> {
        p.with_help("while parsing import statement", |p| -> Option<Self> {
            p.token(Token::Import)?;
            let path = p.parse()?;
            Some(Self { path })
        })
    }
}

impl Parse for Path {
    fn parse(p: &mut Parser) -> Option<Self> {
        p.with_help("while parsing path", |p| -> Option<Self> {
            let identifiers = p.sequence_one_or_more(Token::Dot)?;
            Some(Path::new(identifiers))
        })
    }
}

impl Parse for TypeAliasDeclaration {
    fn parse(p: &mut Parser) -> Option<Self> {
        p.with_help("while parsing type alias declaration", |p| -> Option<Self> {
            p.token(Token::TypeKeyword)?;
            let name = p.parse()?;
            p.token(Token::Equals)?;
            let underlying = p.parse()?;
            Some(Self {
                name,
                underlying: Some(underlying),
            })
        })
    }
}

impl Parse for FunctionDeclaration {
    fn parse(p: &mut Parser) -> Option<Self> {
        p.with_help("while parsing function declaration", |p| -> Option<Self> {
            p.token(Token::FnKeyword)?;
            let name = p.parse()?;
            let parameters = parse_parameters(p)?;
            let return_type = parse_return_type(p)?;
            let (body, _) = parse_block(p)?;
            Some(Self {
                name,
                parameters,
                return_type,
                body,
            })
        })
    }
}

impl Parse for FunctionParameter {
    fn parse(p: &mut Parser) -> Option<Self> {
        p.with_help("while parsing function parameter", |p| -> Option<Self> {
            let name = p.parse()?;
            p.token(Token::Colon)?;
            let ty = p.parse()?;
            Some(Self { name, ty })
        })
    }
}

impl Parse for Ty {
    fn parse(p: &mut Parser) -> Option<Self> {
        p.with_help("while parsing type", |p| -> Option<Self> {
            let path: Vec<Identifier> = p.sequence_one_or_more(Token::Dot)?;
            if path.len() == 1 {
                // a simple name becomes a placeholder alias, resolved by the
                // binding pass once imports are known
                let id = p.placeholder_alias(path[0]);
                return Some(Ty::Alias(id));
            }
            let components = path
                .into_iter()
                .map(|name| Component {
                    name,
                    value: ComponentValue::Unresolved,
                })
                .collect();
            let id = p.identifier_types.insert(IdentifierType { components });
            p.unresolved_identifier_types.push(id);
            Some(Ty::Identifier(id))
        })
    }
}

impl Parse for Expression {
    fn parse(p: &mut Parser) -> Option<Self> {
        Some(parse_expr(p)?.into_item())
    }
}

fn parse_parameters(p: &mut Parser) -> Option<Box<[FunctionParameter]>> {
    p.token(Token::OpenParen)?;
    if p.try_token(Token::CloseParen).is_some() {
        return Some(Box::new([]));
    }
    let parameters: Vec<FunctionParameter> = p.sequence_one_or_more(Token::Comma)?;
    p.token(Token::CloseParen)?;
    Some(parameters.into_boxed_slice())
}

fn parse_return_type(p: &mut Parser) -> Option<Ty> {
    if p.try_token(Token::Arrow).is_none() {
        return Some(Ty::Unit);
    }
    p.parse()
}

/// `{ expr (; expr)* ;? }`, returning the body and the closing brace span.
fn parse_block(p: &mut Parser) -> Option<(Vec<SpannedItem<Expression>>, Span)> {
    p.token(Token::OpenBrace)?;
    let mut body = Vec::new();
    if let Some(close) = p.try_token(Token::CloseBrace) {
        return Some((body, close.span()));
    }
    loop {
        body.push(parse_expr(p)?);
        if p.try_token(Token::Semicolon).is_none() {
            break;
        }
        if *p.peek().item() == Token::CloseBrace {
            break;
        }
    }
    let close = p.token(Token::CloseBrace)?;
    Some((body, close.span()))
}

fn parse_expr(p: &mut Parser) -> Option<SpannedItem<Expression>> {
    let mut expr = parse_primary(p)?;
    loop {
        if p.try_token(Token::Dot).is_some() {
            let member: Identifier = p.parse()?;
            let span = expr.span().join(member.span);
            expr = span.with_item(Expression::Member {
                base: Box::new(expr),
                member,
            });
        } else if p.try_token(Token::OpenParen).is_some() {
            let (args, close_span) = if let Some(close) = p.try_token(Token::CloseParen) {
                (Vec::new(), close.span())
            } else {
                let args = p.with_help("while parsing call arguments", |p| p.sequence_one_or_more(Token::Comma))?;
                let close = p.token(Token::CloseParen)?;
                (args, close.span())
            };
            let span = expr.span().join(close_span);
            expr = span.with_item(Expression::Call {
                callee: Box::new(expr),
                args,
            });
        } else {
            break;
        }
    }
    Some(expr)
}

fn parse_primary(p: &mut Parser) -> Option<SpannedItem<Expression>> {
    match p.peek().item() {
        Token::Integer => {
            let tok = p.advance();
            // all decimal digits, but possibly more of them than fit
            let Ok(value) = p.slice().parse() else {
                p.push_error(tok.span().with_item(ParseErrorKind::IntegerLiteralTooLarge(p.slice().to_string())));
                return None;
            };
            Some(tok.span().with_item(Expression::Literal(Literal::Integer(value))))
        },
        Token::True | Token::False => {
            let tok = p.advance();
            let value = *tok.item() == Token::True;
            Some(tok.span().with_item(Expression::Literal(Literal::Boolean(value))))
        },
        Token::String => {
            let tok = p.advance();
            let slice = p.slice();
            // the lexed slice includes the quotes
            let value = Rc::from(&slice[1..slice.len() - 1]);
            Some(tok.span().with_item(Expression::Literal(Literal::String(value))))
        },
        Token::Identifier => {
            let name: Identifier = p.parse()?;
            Some(name.span.with_item(Expression::Name(name)))
        },
        Token::FnKeyword => parse_lambda(p),
        Token::Unrecognized => {
            let tok = p.advance();
            p.push_error(tok.span().with_item(ParseErrorKind::UnrecognizedInput(p.slice().to_string())));
            None
        },
        a => {
            let span = p.peek().span();
            p.push_error(span.with_item(ParseErrorKind::ExpectedOneOf(
                vec![Token::Integer, Token::True, Token::False, Token::String, Token::Identifier, Token::FnKeyword],
                *a,
            )));
            None
        },
    }
}

/// `fn (params) (-> ty)? block` in expression position. The function
/// declaration is recorded like a named one, under a synthetic name.
fn parse_lambda(p: &mut Parser) -> Option<SpannedItem<Expression>> {
    p.with_help("while parsing lambda", |p| -> Option<SpannedItem<Expression>> {
        let fn_tok = p.token(Token::FnKeyword)?;
        let parameters = parse_parameters(p)?;
        let return_type = parse_return_type(p)?;
        let (body, close_span) = parse_block(p)?;
        let span = fn_tok.span().join(close_span);
        let name = Identifier {
            id:   p.intern(Rc::from("<lambda>")),
            span: fn_tok.span(),
        };
        let id = p.functions.insert(span.with_item(FunctionDeclaration {
            name,
            parameters,
            return_type,
            body,
        }));
        Some(span.with_item(Expression::Lambda(id)))
    })
}
