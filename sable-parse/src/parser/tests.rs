use expect_test::expect;
use sable_ast::*;
use sable_utils::{SourceMap, SpannedItem, SymbolInterner};

use super::{ParseError, Parser};

fn parse(
    file_name: &str,
    input: &str,
) -> (CompilationUnit, Vec<SpannedItem<ParseError>>, SymbolInterner) {
    let mut sources = SourceMap::default();
    let source_id = sources.register(file_name, input);
    let mut interner = SymbolInterner::default();
    let parser = Parser::new(source_id, &sources, &mut interner);
    let (unit, errs) = parser.into_result();
    (unit, errs, interner)
}

fn check(
    input: &str,
    expected: expect_test::Expect,
) {
    let (unit, errs, interner) = parse("test.sb", input);
    let pretty_printed_unit = pretty_print(&unit, &interner);
    expected.assert_eq(&format!("{pretty_printed_unit}\n\n{errs:#?}"));
}

fn pretty_print(
    unit: &CompilationUnit,
    interner: &SymbolInterner,
) -> String {
    let mut buf = format!("module {}", interner.get(unit.name.id));
    for item in &unit.items {
        buf.push_str("\n  ");
        match item.item() {
            Item::Import(stmt) => buf.push_str(&format!("import {}", interner.get_path(&stmt.path))),
            Item::TypeAlias(id) => {
                let alias = unit.type_aliases.get(*id).item();
                let underlying = alias.underlying.as_ref().expect("declared aliases always have an underlying type");
                buf.push_str(&format!("type {} = {}", interner.get(alias.name.id), fmt_ty(unit, interner, underlying)));
            },
            Item::Function(id) => buf.push_str(&fmt_function(unit, interner, *id, "fn")),
            Item::Expr(expr) => buf.push_str(&fmt_expr(unit, interner, expr.item())),
        }
    }
    buf
}

fn fmt_function(
    unit: &CompilationUnit,
    interner: &SymbolInterner,
    id: FunctionId,
    keyword: &str,
) -> String {
    let func = unit.functions.get(id).item();
    let params = func
        .parameters
        .iter()
        .map(|param| format!("{}: {}", interner.get(param.name.id), fmt_ty(unit, interner, &param.ty)))
        .collect::<Vec<_>>()
        .join(", ");
    let body = func.body.iter().map(|expr| fmt_expr(unit, interner, expr.item())).collect::<Vec<_>>().join("; ");
    let name = if keyword == "fn" {
        format!(" {}", interner.get(func.name.id))
    } else {
        String::new()
    };
    format!(
        "{keyword}{name}({params}) -> {} {{ {body} }}",
        fmt_ty(unit, interner, &func.return_type)
    )
}

fn fmt_ty(
    unit: &CompilationUnit,
    interner: &SymbolInterner,
    ty: &Ty,
) -> String {
    match ty {
        Ty::Int => "int".to_string(),
        Ty::Bool => "bool".to_string(),
        Ty::String => "string".to_string(),
        Ty::Unit => "unit".to_string(),
        Ty::Alias(id) => {
            let alias = unit.type_aliases.get(*id).item();
            if alias.underlying.is_none() {
                // not yet resolved to a declaration
                format!("'{}", interner.get(alias.name.id))
            } else {
                interner.get(alias.name.id).to_string()
            }
        },
        Ty::Identifier(id) => unit
            .identifier_types
            .get(*id)
            .components
            .iter()
            .map(|component| interner.get(component.name.id).to_string())
            .collect::<Vec<_>>()
            .join("."),
        Ty::Error => "<error>".to_string(),
    }
}

fn fmt_expr(
    unit: &CompilationUnit,
    interner: &SymbolInterner,
    expr: &Expression,
) -> String {
    match expr {
        Expression::Literal(lit) => lit.to_string(),
        Expression::Name(name) => format!("var({})", interner.get(name.id)),
        Expression::Call { callee, args } => {
            let args = args.iter().map(|arg| fmt_expr(unit, interner, arg.item())).collect::<Vec<_>>().join(" ");
            format!("call({} [{args}])", fmt_expr(unit, interner, callee.item()))
        },
        Expression::Member { base, member } => {
            format!("{}.{}", fmt_expr(unit, interner, base.item()), interner.get(member.id))
        },
        Expression::Lambda(id) => fmt_function(unit, interner, *id, "lambda"),
        other => format!("<{other:?}>"),
    }
}

#[test]
fn imports_aliases_and_functions() {
    check(
        "import dep
import dep.helper

type Count = Int

fn add(x: Int, y: math.Vec) -> Count { plus(x, y) }",
        expect![[r#"
            module test
              import dep
              import dep.helper
              type Count = 'Int
              fn add(x: 'Int, y: math.Vec) -> 'Count { call(var(plus) [var(x) var(y)]) }

            []"#]],
    )
}

#[test]
fn top_level_expressions() {
    check(
        "count;
counter.get()",
        expect![[r#"
            module test
              var(count)
              call(var(counter).get [])

            []"#]],
    )
}

#[test]
fn lambda_in_expression_position() {
    check(
        "fn apply() { run(fn(x: Int) -> Int { x }) }",
        expect![[r#"
            module test
              fn apply() -> unit { call(var(run) [lambda(x: 'Int) -> 'Int { var(x) }]) }

            []"#]],
    )
}

#[test]
fn empty_body_and_trailing_semicolon() {
    check(
        "fn noop() { }
fn two() -> Int { first(); second(); }",
        expect![[r#"
            module test
              fn noop() -> unit {  }
              fn two() -> 'Int { call(var(first) []); call(var(second) []) }

            []"#]],
    )
}

#[test]
fn simple_type_names_share_one_placeholder() {
    let (unit, errs, _interner) = parse("test.sb", "fn f(a: Vec, b: Vec) -> Vec { a }");
    assert!(errs.is_empty());
    // one placeholder alias for Vec, no dotted chains
    assert_eq!(unit.unresolved_aliases.len(), 1);
    assert!(unit.unresolved_identifier_types.is_empty());
    let placeholder = unit.type_aliases.get(unit.unresolved_aliases[0]).item();
    assert!(placeholder.underlying.is_none());
}

#[test]
fn dotted_type_seeds_a_chain() {
    let (unit, errs, _interner) = parse("test.sb", "fn f(v: geometry.space.Vec) { v }");
    assert!(errs.is_empty());
    assert!(unit.unresolved_aliases.is_empty());
    assert_eq!(unit.unresolved_identifier_types.len(), 1);
    let chain = unit.identifier_types.get(unit.unresolved_identifier_types[0]);
    assert_eq!(chain.components.len(), 3);
    assert!(chain.components.iter().all(|component| component.value.is_unresolved()));
}

#[test]
fn module_name_comes_from_file_stem() {
    let (unit, errs, interner) = parse("lib/geometry.sb", "fn origin() { zero }");
    assert!(errs.is_empty());
    assert_eq!(&*interner.get(unit.name.id), "geometry");
}

#[test]
fn invalid_file_stem_is_rejected() {
    let (_unit, errs, _interner) = parse("9bad.sb", "fn f() { x }");
    assert_eq!(errs.len(), 1);
    assert!(matches!(errs[0].item().kind(), super::ParseErrorKind::InvalidModuleName(_)));
}

#[test]
fn oversized_integer_literal_reports_an_error() {
    let (_unit, errs, _interner) = parse("test.sb", "fn f() -> Int { 99999999999999999999 }");
    assert!(errs
        .iter()
        .any(|err| matches!(err.item().kind(), super::ParseErrorKind::IntegerLiteralTooLarge(digits) if digits == "99999999999999999999")));
}

#[test]
fn malformed_declaration_reports_an_error() {
    let (_unit, errs, _interner) = parse("test.sb", "type = Int");
    assert!(!errs.is_empty());
}
