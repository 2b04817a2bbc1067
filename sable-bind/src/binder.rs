#[cfg(test)]
mod tests;

use std::{path::PathBuf, rc::Rc};

use sable_ast::{CompilationUnit, Expression, Item, Module, Stage};
use sable_parse::{ParseError, Parser};
use sable_utils::{SourceMap, SpannedItem, SymbolId, SymbolInterner};

use crate::{builtin, error::BindError, exprs, imports, types};

/// The later pipeline stage the module loader hands freshly bound units
/// to, so importers only ever see fully checked modules.
pub trait TypeCheck {
    fn type_check(
        &mut self,
        unit: &mut CompilationUnit,
    );
}

/// Advances the stage and checks nothing. Stands in wherever a real type
/// checker isn't wired up, the test suites included.
pub struct NoopTypeCheck;

impl TypeCheck for NoopTypeCheck {
    fn type_check(
        &mut self,
        unit: &mut CompilationUnit,
    ) {
        unit.advance_stage(Stage::TypeChecked);
    }
}

/// State shared across every unit bound in one compilation: the source
/// registry, the symbol interner, the implicit `builtin` module, and the
/// accumulated diagnostics. One context lives as long as the compilation
/// it serves.
pub struct BindContext {
    pub source_map: SourceMap,
    pub interner:   SymbolInterner,
    pub(crate) import_search_paths: Vec<PathBuf>,
    pub(crate) builtin: Rc<Module>,
    /// Names of the units currently being bound, outermost first. Guards
    /// against import cycles during recursive loading.
    pub(crate) load_stack: Vec<SymbolId>,
    pub(crate) errs: Vec<SpannedItem<BindError>>,
    pub(crate) parse_errs: Vec<SpannedItem<ParseError>>,
    pub(crate) type_checker: Box<dyn TypeCheck>,
}

impl Default for BindContext {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl BindContext {
    pub fn new(import_search_paths: Vec<PathBuf>) -> Self {
        let mut source_map = SourceMap::default();
        let mut interner = SymbolInterner::default();
        let builtin = builtin::builtin_module(&mut interner, &mut source_map);
        Self {
            source_map,
            interner,
            import_search_paths,
            builtin,
            load_stack: Vec::new(),
            errs: Vec::new(),
            parse_errs: Vec::new(),
            type_checker: Box::new(NoopTypeCheck),
        }
    }

    pub fn with_type_checker(
        mut self,
        type_checker: Box<dyn TypeCheck>,
    ) -> Self {
        self.type_checker = type_checker;
        self
    }

    /// Parse a registered-by-name source text and bind the resulting
    /// unit. Parse errors are collected and binding proceeds on whatever
    /// parsed.
    pub fn bind_source(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> CompilationUnit {
        let source_id = self.source_map.register(name, source);
        let parser = Parser::new(source_id, &self.source_map, &mut self.interner);
        let (mut unit, parse_errs) = parser.into_result();
        self.parse_errs.extend(parse_errs);
        self.bind_names(&mut unit);
        unit
    }

    /// Read, parse, and bind a root source file.
    pub fn bind_file(
        &mut self,
        path: impl AsRef<std::path::Path>,
    ) -> std::io::Result<CompilationUnit> {
        let contents = std::fs::read_to_string(&path)?;
        Ok(self.bind_source(path.as_ref().display().to_string(), contents))
    }

    /// Run the name binding pass on one parsed unit. The phases run in a
    /// fixed order: imports are processed (loading modules recursively),
    /// pending type references are resolved, and expression bodies are
    /// rewritten; the unit then advances to [`Stage::NameBound`].
    pub fn bind_names(
        &mut self,
        unit: &mut CompilationUnit,
    ) {
        assert_eq!(unit.stage, Stage::Parsed, "name binding runs once, directly after parsing");
        self.load_stack.push(unit.name.id);

        imports::process_imports(self, unit);
        types::resolve_placeholder_aliases(self, unit);
        types::resolve_identifier_types(self, unit);
        exprs::bind_expressions(self, unit);

        unit.advance_stage(Stage::NameBound);
        verify_bound(unit);

        let popped = self.load_stack.pop();
        debug_assert_eq!(popped, Some(unit.name.id), "load stack must balance");
    }

    pub fn errors(&self) -> &[SpannedItem<BindError>] {
        &self.errs
    }

    pub fn parse_errors(&self) -> &[SpannedItem<ParseError>] {
        &self.parse_errs
    }

    pub fn into_errors(self) -> (Vec<SpannedItem<BindError>>, Vec<SpannedItem<ParseError>>) {
        (self.errs, self.parse_errs)
    }

    pub(crate) fn name_of(
        &self,
        id: SymbolId,
    ) -> String {
        self.interner.get(id).to_string()
    }
}

/// Check the post-binding invariants: no pending type reference survives
/// and no bare name survives in any expression.
fn verify_bound(unit: &CompilationUnit) {
    debug_assert!(unit.unresolved_aliases.is_empty());
    debug_assert!(unit.unresolved_identifier_types.is_empty());
    for (_, alias) in unit.type_aliases.iter() {
        debug_assert!(alias.item().underlying.is_some(), "every alias must be filled after binding");
    }
    for (_, chain) in unit.identifier_types.iter() {
        debug_assert!(
            chain.components.iter().all(|component| !component.value.is_unresolved()),
            "every chain component must be resolved or poisoned after binding"
        );
    }
    for item in &unit.items {
        if let Item::Expr(expr) = item.item() {
            verify_expr(expr);
        }
    }
    for (_, function) in unit.functions.iter() {
        for expr in &function.item().body {
            verify_expr(expr);
        }
    }
}

fn verify_expr(expr: &SpannedItem<Expression>) {
    match expr.item() {
        Expression::Name(_) => debug_assert!(false, "bare names must not survive binding"),
        Expression::Call { callee, args } => {
            verify_expr(callee);
            for arg in args {
                verify_expr(arg);
            }
        },
        Expression::Member { base, .. } => verify_expr(base),
        _ => {},
    }
}
