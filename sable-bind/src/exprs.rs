use sable_ast::{CompilationUnit, Expression, FunctionId, Item};
use sable_utils::{Identifier, SpannedItem};

use crate::{binder::BindContext, error::BindError};

/// Rewrite every expression in the unit, replacing bare names with their
/// bound forms. Function bodies are visited with a stack of enclosing
/// function scopes so parameter references bind to the innermost
/// declaration; the stack must balance when the pass finishes.
pub(crate) fn bind_expressions(
    ctx: &mut BindContext,
    unit: &mut CompilationUnit,
) {
    let mut scopes: Vec<FunctionId> = Vec::new();

    let function_items = unit
        .items
        .iter()
        .filter_map(|item| match item.item() {
            Item::Function(id) => Some(*id),
            _ => None,
        })
        .collect::<Vec<_>>();
    for id in function_items {
        bind_function_body(ctx, unit, &mut scopes, id);
    }

    for ix in 0..unit.items.len() {
        if !matches!(unit.items[ix].item(), Item::Expr(_)) {
            continue;
        }
        let placeholder = Item::Expr(unit.items[ix].span().with_item(Expression::Error));
        let Item::Expr(expr) = std::mem::replace(unit.items[ix].item_mut(), placeholder) else {
            unreachable!("just matched Item::Expr");
        };
        let bound = bind_expr(ctx, unit, &mut scopes, expr);
        *unit.items[ix].item_mut() = Item::Expr(bound);
    }

    assert!(scopes.is_empty(), "function scope stack must balance");
}

fn bind_function_body(
    ctx: &mut BindContext,
    unit: &mut CompilationUnit,
    scopes: &mut Vec<FunctionId>,
    id: FunctionId,
) {
    scopes.push(id);
    let body = std::mem::take(&mut unit.functions.get_mut(id).item_mut().body);
    let body = body.into_iter().map(|expr| bind_expr(ctx, unit, scopes, expr)).collect();
    unit.functions.get_mut(id).item_mut().body = body;
    let popped = scopes.pop();
    assert_eq!(popped, Some(id), "function scope stack must balance");
}

fn bind_expr(
    ctx: &mut BindContext,
    unit: &mut CompilationUnit,
    scopes: &mut Vec<FunctionId>,
    expr: SpannedItem<Expression>,
) -> SpannedItem<Expression> {
    let span = expr.span();
    let bound = match expr.into_item() {
        Expression::Name(name) => bind_name(ctx, unit, scopes, name),
        Expression::Call { callee, args } => Expression::Call {
            callee: Box::new(bind_expr(ctx, unit, scopes, *callee)),
            args:   args.into_iter().map(|arg| bind_expr(ctx, unit, scopes, arg)).collect(),
        },
        Expression::Member { base, member } => Expression::Member {
            base: Box::new(bind_expr(ctx, unit, scopes, *base)),
            member,
        },
        Expression::Lambda(id) => {
            bind_function_body(ctx, unit, scopes, id);
            Expression::Lambda(id)
        },
        // literals carry no names; the rest only exist after binding,
        // which runs once per unit
        already_bound => already_bound,
    };
    span.with_item(bound)
}

/// Bind one bare name: parameters of enclosing functions, innermost
/// first; then global value declarations, collected into an overload set
/// without choosing between them; then imported-module names. A name
/// that matches nothing becomes an error sentinel alongside a non-fatal
/// diagnostic.
fn bind_name(
    ctx: &mut BindContext,
    unit: &CompilationUnit,
    scopes: &[FunctionId],
    name: Identifier,
) -> Expression {
    for function in scopes.iter().rev() {
        let declaration = unit.functions.get(*function).item();
        if let Some(index) = declaration.parameters.iter().position(|param| param.name.id == name.id) {
            return Expression::Param {
                function: *function,
                index,
                name,
            };
        }
    }

    let candidates = unit.lookup_global_value(name.id);
    if !candidates.is_empty() {
        return Expression::OverloadSet {
            name,
            candidates: candidates.into_boxed_slice(),
        };
    }

    if let Some(module) = unit.lookup_module(name.id) {
        return Expression::ModuleRef(module);
    }

    ctx.errs
        .push(name.span.with_item(BindError::UnresolvedIdentifier(ctx.name_of(name.id))));
    Expression::Error
}
