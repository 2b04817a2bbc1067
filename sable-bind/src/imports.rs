use sable_ast::{CompilationUnit, ImportedModule, Item};
use sable_utils::Path;

use crate::{binder::BindContext, error::BindError, loader};

/// Process a unit's import directives and freeze its imported-module
/// list. The `builtin` module is seeded first so primitive names are
/// always in scope; each directive then contributes `(accessPath,
/// module)` in source order.
///
/// An import names a module and optionally one member of it: `import m`
/// or `import m.member`. Anything longer is rejected, but only after the
/// module has been loaded; the loaded module is then discarded.
pub(crate) fn process_imports(
    ctx: &mut BindContext,
    unit: &mut CompilationUnit,
) {
    let mut imported = vec![ImportedModule {
        access_path: Path::empty(),
        module:      ctx.builtin.clone(),
    }];

    for item in &unit.items {
        let Item::Import(stmt) = item.item() else { continue };

        let Some(module) = loader::load_module(ctx, *stmt.path.first()) else {
            continue;
        };

        if stmt.path.len() > 2 {
            let extra = stmt.path.identifiers[2];
            ctx.errs
                .push(extra.span.with_item(BindError::InvalidAccessPath(ctx.interner.get_path(&stmt.path).to_string())));
            continue;
        }

        let access_path = Path::new(stmt.path.iter().skip(1).copied().collect());
        imported.push(ImportedModule { access_path, module });
    }

    unit.imported_modules = imported;
}
