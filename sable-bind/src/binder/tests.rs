use expect_test::expect;
use sable_ast::*;

use super::BindContext;
use crate::BindError;

fn bind(source: &str) -> (CompilationUnit, BindContext) {
    let mut ctx = BindContext::new(Vec::new());
    let unit = ctx.bind_source("main.sb", source);
    (unit, ctx)
}

fn bind_with_modules(
    modules: &[(&str, &str)],
    source: &str,
) -> (CompilationUnit, BindContext) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (name, contents) in modules {
        std::fs::write(dir.path().join(name), contents).expect("failed to write module file");
    }
    let mut ctx = BindContext::new(vec![dir.path().to_path_buf()]);
    let unit = ctx.bind_source("main.sb", source);
    (unit, ctx)
}

fn check_with_modules(
    modules: &[(&str, &str)],
    source: &str,
    expected: expect_test::Expect,
) {
    let (unit, ctx) = bind_with_modules(modules, source);
    let pretty_printed_unit = pretty_print(&unit, &ctx);
    expected.assert_eq(&format!("{pretty_printed_unit}\n\n{:#?}", ctx.errors()));
}

fn check(
    source: &str,
    expected: expect_test::Expect,
) {
    check_with_modules(&[], source, expected)
}

fn function_named(
    unit: &CompilationUnit,
    ctx: &BindContext,
    name: &str,
) -> FunctionId {
    unit.functions
        .iter()
        .find(|(_, func)| &*ctx.interner.get(func.item().name.id) == name)
        .map(|(id, _)| id)
        .expect("function should exist")
}

fn pretty_print(
    unit: &CompilationUnit,
    ctx: &BindContext,
) -> String {
    let mut buf = format!("module {}", ctx.interner.get(unit.name.id));
    let imports = unit
        .imported_modules
        .iter()
        .map(|entry| {
            let name = ctx.interner.get(entry.module.name.id).to_string();
            match entry.access_path.is_empty() {
                true => name,
                false => format!("{name}.{}", ctx.interner.get(entry.access_path.first().id)),
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    buf.push_str(&format!("\n  imports: {imports}"));
    for item in &unit.items {
        match item.item() {
            Item::Import(_) => continue,
            Item::TypeAlias(id) => {
                let alias = unit.type_aliases.get(*id).item();
                let underlying = alias.underlying.as_ref().expect("aliases are filled after binding");
                buf.push_str(&format!(
                    "\n  type {} = {}",
                    ctx.interner.get(alias.name.id),
                    fmt_ty(unit, ctx, underlying)
                ));
            },
            Item::Function(id) => buf.push_str(&format!("\n  {}", fmt_function(unit, ctx, *id, "fn"))),
            Item::Expr(expr) => buf.push_str(&format!("\n  {}", fmt_expr(unit, ctx, expr.item()))),
        }
    }
    buf
}

fn fmt_function(
    unit: &CompilationUnit,
    ctx: &BindContext,
    id: FunctionId,
    keyword: &str,
) -> String {
    let func = unit.functions.get(id).item();
    let params = func
        .parameters
        .iter()
        .map(|param| format!("{}: {}", ctx.interner.get(param.name.id), fmt_ty(unit, ctx, &param.ty)))
        .collect::<Vec<_>>()
        .join(", ");
    let body = func.body.iter().map(|expr| fmt_expr(unit, ctx, expr.item())).collect::<Vec<_>>().join("; ");
    let name = if keyword == "fn" {
        format!(" {}", ctx.interner.get(func.name.id))
    } else {
        String::new()
    };
    format!("{keyword}{name}({params}) -> {} {{ {body} }}", fmt_ty(unit, ctx, &func.return_type))
}

fn fmt_ty(
    unit: &CompilationUnit,
    ctx: &BindContext,
    ty: &Ty,
) -> String {
    let flattened = match unit.flatten_ty(ty) {
        Ty::Int => "int",
        Ty::Bool => "bool",
        Ty::String => "string",
        Ty::Unit => "unit",
        _ => "<error>",
    };
    match ty {
        Ty::Alias(id) => {
            format!("{} := {flattened}", ctx.interner.get(unit.type_aliases.get(*id).item().name.id))
        },
        Ty::Identifier(id) => {
            let path = unit
                .identifier_types
                .get(*id)
                .components
                .iter()
                .map(|component| ctx.interner.get(component.name.id).to_string())
                .collect::<Vec<_>>()
                .join(".");
            format!("{path} := {flattened}")
        },
        _ => flattened.to_string(),
    }
}

fn fmt_expr(
    unit: &CompilationUnit,
    ctx: &BindContext,
    expr: &Expression,
) -> String {
    match expr {
        Expression::Literal(lit) => lit.to_string(),
        Expression::Name(name) => format!("var({})", ctx.interner.get(name.id)),
        Expression::Call { callee, args } => {
            let args = args.iter().map(|arg| fmt_expr(unit, ctx, arg.item())).collect::<Vec<_>>().join(" ");
            format!("call({} [{args}])", fmt_expr(unit, ctx, callee.item()))
        },
        Expression::Member { base, member } => {
            format!("{}.{}", fmt_expr(unit, ctx, base.item()), ctx.interner.get(member.id))
        },
        Expression::Lambda(id) => fmt_function(unit, ctx, *id, "lambda"),
        Expression::Param { name, .. } => format!("param({})", ctx.interner.get(name.id)),
        Expression::OverloadSet { name, candidates } => {
            format!("overloads({}: {})", ctx.interner.get(name.id), candidates.len())
        },
        Expression::ModuleRef(module) => format!("module({})", ctx.interner.get(module.name.id)),
        Expression::Error => "<error>".to_string(),
    }
}

#[test]
fn binds_alias_and_chain_through_import() {
    check_with_modules(
        &[("dep.sb", "type Meters = Int")],
        "import dep

type Count = Int

fn tally(x: dep.Meters) -> Count { x }",
        expect![[r#"
            module main
              imports: builtin, dep
              type Count = Int := int
              fn tally(x: dep.Meters := int) -> Count := int { param(x) }

            []"#]],
    )
}

#[test]
fn collects_overload_sets_without_resolving() {
    check(
        "fn go() -> Int { 1 }
fn go(x: Int) -> Int { x }
fn main() { go(1); go }",
        expect![[r#"
            module main
              imports: builtin
              fn go() -> Int := int { 1 }
              fn go(x: Int := int) -> Int := int { param(x) }
              fn main() -> unit { call(overloads(go: 2) [1]); overloads(go: 2) }

            []"#]],
    )
}

#[test]
fn primitive_names_come_from_the_builtin_module() {
    let (unit, ctx) = bind("fn f(n: Int) -> Bool { true }");
    assert!(ctx.errors().is_empty());
    let func = unit.functions.get(function_named(&unit, &ctx, "f")).item();
    assert!(matches!(unit.flatten_ty(&func.parameters[0].ty), Ty::Int));
    assert!(matches!(unit.flatten_ty(&func.return_type), Ty::Bool));
    assert!(unit.unresolved_aliases.is_empty());
}

#[test]
fn local_alias_declarations_resolve_placeholders() {
    let (unit, ctx) = bind(
        "type Count = Int
fn f(c: Count) -> Count { c }",
    );
    assert!(ctx.errors().is_empty());
    let func = unit.functions.get(function_named(&unit, &ctx, "f")).item();
    assert!(matches!(unit.flatten_ty(&func.parameters[0].ty), Ty::Int));
}

#[test]
fn undeclared_type_poisons_the_placeholder() {
    let (unit, ctx) = bind("fn f(m: Mystery) { m }");
    assert!(ctx.errors().iter().any(|err| matches!(err.item(), BindError::UseUndeclaredType(name) if name == "Mystery")));
    let func = unit.functions.get(function_named(&unit, &ctx, "f")).item();
    assert!(matches!(unit.flatten_ty(&func.parameters[0].ty), Ty::Error));
    assert_eq!(unit.stage, Stage::NameBound);
}

#[test]
fn import_access_path_restricts_visibility() {
    let (unit, ctx) = bind_with_modules(
        &[("dep.sb", "type Meters = Int\ntype Feet = Int")],
        "import dep.Meters
fn f(a: Meters, b: Feet) { a }",
    );
    assert!(ctx.errors().iter().any(|err| matches!(err.item(), BindError::UseUndeclaredType(name) if name == "Feet")));
    let func = unit.functions.get(function_named(&unit, &ctx, "f")).item();
    assert!(matches!(unit.flatten_ty(&func.parameters[0].ty), Ty::Int));
    assert!(matches!(unit.flatten_ty(&func.parameters[1].ty), Ty::Error));
}

#[test]
fn import_path_with_too_many_segments_is_discarded() {
    let (unit, ctx) = bind_with_modules(&[("dep.sb", "type Meters = Int")], "import dep.Meters.extra");
    assert!(ctx.errors().iter().any(|err| matches!(err.item(), BindError::InvalidAccessPath(_))));
    // the module was loaded, then dropped; only builtin remains
    assert_eq!(unit.imported_modules.len(), 1);
}

#[test]
fn missing_module_reports_and_continues() {
    let (unit, ctx) = bind("import nope\nfn f() -> Int { 1 }");
    assert!(ctx.errors().iter().any(|err| matches!(err.item(), BindError::ModuleNotFound(name, _) if name == "nope")));
    assert_eq!(unit.imported_modules.len(), 1);
    assert_eq!(unit.stage, Stage::NameBound);
}

#[test]
fn module_that_fails_to_parse_is_not_imported() {
    let (unit, ctx) = bind_with_modules(&[("dep.sb", "type = 3")], "import dep");
    assert!(!ctx.parse_errors().is_empty());
    assert_eq!(unit.imported_modules.len(), 1);
}

#[test]
fn circular_imports_are_detected() {
    let (unit, ctx) = bind_with_modules(
        &[("a.sb", "import b\ntype A = Int"), ("b.sb", "import a\ntype B = Int")],
        "import a",
    );
    assert!(ctx
        .errors()
        .iter()
        .any(|err| matches!(err.item(), BindError::CircularImport(cycle) if cycle == "main -> a -> b -> a")));
    // the cycle poisons only the offending edge; `a` still imports fine
    assert_eq!(unit.imported_modules.len(), 2);
}

#[test]
fn ambiguous_chain_base_is_fatal_for_the_chain() {
    let (unit, ctx) = bind(
        "type Size = Int
type Size = Int
fn f(s: Size.member) { s }",
    );
    assert!(ctx.errors().iter().any(|err| matches!(err.item(), BindError::AmbiguousTypeBase(name) if name == "Size")));
    let candidate_notes = ctx.errors().iter().filter(|err| matches!(err.item(), BindError::FoundCandidate(_))).count();
    assert_eq!(candidate_notes, 2);
    let (_, chain) = unit.identifier_types.iter().next().expect("chain was seeded");
    assert!(chain.components.iter().all(|component| component.value.is_error()));
}

#[test]
fn value_declarations_shadow_module_names_at_the_chain_base() {
    let (_unit, ctx) = bind_with_modules(
        &[("dep.sb", "type Meters = Int")],
        "import dep
fn dep() -> Int { 1 }
fn f(x: dep.Meters) -> Int { 1 }",
    );
    assert!(ctx.errors().iter().any(|err| matches!(err.item(), BindError::UnknownDottedTypeBase(name) if name == "dep")));
}

#[test]
fn chain_member_missing_from_module() {
    let (_unit, ctx) = bind_with_modules(&[("dep.sb", "type Meters = Int")], "import dep\nfn f(x: dep.Feet) { x }");
    assert!(ctx
        .errors()
        .iter()
        .any(|err| matches!(err.item(), BindError::InvalidMemberType(module, member) if module == "dep" && member == "Feet")));
}

#[test]
fn chain_base_that_is_a_function_cannot_be_dotted_into() {
    let (_unit, ctx) = bind(
        "fn size() -> Int { 1 }
fn f(s: size.member) { s }",
    );
    assert!(ctx.errors().iter().any(|err| matches!(err.item(), BindError::UnknownDottedTypeBase(name) if name == "size")));
}

#[test]
fn function_members_are_invisible_to_qualified_type_lookup() {
    let (_unit, ctx) = bind_with_modules(
        &[("dep.sb", "fn size() -> Int { 1 }")],
        "import dep\nfn f(s: dep.size) { s }",
    );
    assert!(ctx
        .errors()
        .iter()
        .any(|err| matches!(err.item(), BindError::InvalidMemberType(module, member) if module == "dep" && member == "size")));
    assert!(!ctx.errors().iter().any(|err| matches!(err.item(), BindError::DottedReferenceNotType(_))));
}

#[test]
fn already_resolved_chain_base_skips_base_lookup() {
    let mut ctx = BindContext::new(Vec::new());
    let source_id = ctx.source_map.register("main.sb", "fn f(x: zzz.Int) { x }");
    let parser = sable_parse::Parser::new(source_id, &ctx.source_map, &mut ctx.interner);
    let (mut unit, parse_errs) = parser.into_result();
    assert!(parse_errs.is_empty());

    // pre-resolve the base, as a parser with richer context could; the
    // bogus surface name must never be looked up
    let chain_id = unit.unresolved_identifier_types[0];
    unit.identifier_types.get_mut(chain_id).components[0].value = ComponentValue::Module(ctx.builtin.clone());

    ctx.bind_names(&mut unit);
    assert!(ctx.errors().is_empty());
    let chain = unit.identifier_types.get(chain_id);
    assert!(matches!(chain.components.last().expect("chain is non-empty").value, ComponentValue::Type(Ty::Int)));
}

#[test]
fn parameters_bind_to_the_innermost_enclosing_function() {
    let (unit, ctx) = bind(
        "fn apply(f: Int) -> Int { f }
fn outer(x: Int) -> Int { apply(fn(x: Int) -> Int { x }); x }",
    );
    assert!(ctx.errors().is_empty());
    let outer = function_named(&unit, &ctx, "outer");
    let lambda = function_named(&unit, &ctx, "<lambda>");
    let outer_body = &unit.functions.get(outer).item().body;
    assert!(matches!(outer_body[1].item(), Expression::Param { function, .. } if *function == outer));
    let lambda_body = &unit.functions.get(lambda).item().body;
    assert!(matches!(lambda_body[0].item(), Expression::Param { function, .. } if *function == lambda));
}

#[test]
fn bare_module_name_becomes_a_module_reference() {
    let (unit, ctx) = bind_with_modules(&[("dep.sb", "type Meters = Int")], "import dep\ndep");
    assert!(ctx.errors().is_empty());
    let expr = unit
        .items
        .iter()
        .find_map(|item| match item.item() {
            Item::Expr(expr) => Some(expr),
            _ => None,
        })
        .expect("top-level expression survives binding");
    assert!(matches!(expr.item(), Expression::ModuleRef(module) if &*ctx.interner.get(module.name.id) == "dep"));
}

#[test]
fn unresolved_name_is_a_nonfatal_error_sentinel() {
    let (unit, ctx) = bind("mystery\nfn f() -> Int { 1 }");
    assert!(ctx.errors().iter().any(|err| matches!(err.item(), BindError::UnresolvedIdentifier(name) if name == "mystery")));
    let expr = unit
        .items
        .iter()
        .find_map(|item| match item.item() {
            Item::Expr(expr) => Some(expr),
            _ => None,
        })
        .expect("top-level expression survives binding");
    assert!(matches!(expr.item(), Expression::Error));
    assert_eq!(unit.stage, Stage::NameBound);
}

#[test]
fn repeated_imports_reload_without_memoization() {
    let (unit, ctx) = bind_with_modules(
        &[("a.sb", "import c"), ("b.sb", "import c"), ("c.sb", "type C = Int")],
        "import a\nimport b",
    );
    assert!(ctx.errors().is_empty());
    let c_via_a = &unit.imported_modules[1].module.unit.imported_modules[1].module;
    let c_via_b = &unit.imported_modules[2].module.unit.imported_modules[1].module;
    assert!(!std::rc::Rc::ptr_eq(c_via_a, c_via_b));
    // <builtin>, main, a, c, b, and c again each got their own buffer
    assert_eq!(ctx.source_map.len(), 6);
}

#[test]
fn importer_directory_is_searched_first() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::write(dir.path().join("dep.sb"), "type Meters = Int").expect("failed to write module file");
    let main_path = dir.path().join("main.sb");
    std::fs::write(&main_path, "import dep").expect("failed to write root file");

    // no configured search paths: the module is only findable next to its importer
    let mut ctx = BindContext::new(Vec::new());
    let unit = ctx.bind_file(&main_path).expect("root file exists");
    assert!(ctx.errors().is_empty());
    assert_eq!(unit.imported_modules.len(), 2);
}

#[test]
fn mutually_recursive_aliases_flatten_to_the_error_type() {
    let (unit, ctx) = bind(
        "type A = B
type B = A
fn f(a: A) { a }",
    );
    // both names resolve, so nothing is diagnosed here; the cycle only
    // surfaces when the type is flattened
    assert!(ctx.errors().is_empty());
    let func = unit.functions.get(function_named(&unit, &ctx, "f")).item();
    assert!(matches!(unit.flatten_ty(&func.parameters[0].ty), Ty::Error));
}

#[test]
#[should_panic(expected = "name binding runs once")]
fn rebinding_a_bound_unit_is_a_precondition_violation() {
    let mut ctx = BindContext::new(Vec::new());
    let mut unit = ctx.bind_source("main.sb", "fn f() -> Int { 1 }");
    ctx.bind_names(&mut unit);
}

#[test]
fn imported_module_is_fully_checked_before_use() {
    let (unit, ctx) = bind_with_modules(&[("dep.sb", "type Meters = Int")], "import dep");
    assert!(ctx.errors().is_empty());
    let dep = &unit.imported_modules[1].module;
    assert_eq!(dep.unit.stage, Stage::TypeChecked);
}
