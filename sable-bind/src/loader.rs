use std::{path::PathBuf, rc::Rc};

use sable_ast::Module;
use sable_parse::Parser;
use sable_utils::Identifier;

use crate::{binder::BindContext, error::BindError};

/// Load the module named by an import directive: find its source file,
/// parse it, and run it through the full pipeline so the importer only
/// ever sees fully checked modules. Modules are reloaded at every import
/// site; nothing is memoized.
pub(crate) fn load_module(
    ctx: &mut BindContext,
    name: Identifier,
) -> Option<Rc<Module>> {
    if ctx.load_stack.contains(&name.id) {
        let mut names = ctx.load_stack.iter().map(|id| ctx.interner.get(*id).to_string()).collect::<Vec<_>>();
        names.push(ctx.interner.get(name.id).to_string());
        ctx.errs.push(name.span.with_item(BindError::CircularImport(names.join(" -> "))));
        return None;
    }

    let (path, contents) = match find_module_file(ctx, name) {
        Ok(found) => found,
        Err(io_err) => {
            ctx.errs
                .push(name.span.with_item(BindError::ModuleNotFound(ctx.interner.get(name.id).to_string(), io_err)));
            return None;
        },
    };

    let source_id = ctx.source_map.register(path.display().to_string(), contents);
    let parser = Parser::new(source_id, &ctx.source_map, &mut ctx.interner);
    let (mut unit, parse_errs) = parser.into_result();
    if !parse_errs.is_empty() {
        // a module that fails to parse produces no unit; its own errors
        // are report enough
        ctx.parse_errs.extend(parse_errs);
        return None;
    }

    ctx.bind_names(&mut unit);
    ctx.type_checker.type_check(&mut unit);

    let name = unit.name;
    Some(Rc::new(Module { name, unit }))
}

/// Search for `<name>.sb` in the importing file's directory, then the
/// working directory, then each configured search path, in that order.
/// The last I/O error seen is carried into the not-found diagnostic.
fn find_module_file(
    ctx: &BindContext,
    name: Identifier,
) -> Result<(PathBuf, String), String> {
    let file_name = format!("{}.sb", ctx.interner.get(name.id));

    let mut directories = Vec::new();
    let importer = std::path::Path::new(ctx.source_map.name(name.span.source()));
    if let Some(dir) = importer.parent() {
        directories.push(dir.to_path_buf());
    }
    directories.push(PathBuf::from("."));
    directories.extend(ctx.import_search_paths.iter().cloned());

    let mut last_err = format!("no file named {file_name} on any search path");
    for dir in directories {
        let path = dir.join(&file_name);
        match std::fs::read_to_string(&path) {
            Ok(contents) => return Ok((path, contents)),
            Err(e) => last_err = format!("{}: {e}", path.display()),
        }
    }
    Err(last_err)
}
