use std::rc::Rc;

use sable_ast::{CompilationUnit, Item, Module, Stage, Ty, TypeAliasDeclaration};
use sable_utils::{Identifier, IndexMap, SourceMap, Span, SpannedItem, SymbolInterner};

/// Assemble the implicitly imported `builtin` module, which exposes the
/// primitive type names as aliases. It is built directly rather than
/// parsed from source, and is already fully checked.
pub(crate) fn builtin_module(
    interner: &mut SymbolInterner,
    sources: &mut SourceMap,
) -> Rc<Module> {
    let source_id = sources.register("<builtin>", "");
    let span = Span::new(source_id, (0..0).into());

    let mut items: Vec<SpannedItem<Item>> = Vec::new();
    let mut type_aliases = IndexMap::default();
    for (name, ty) in [("Int", Ty::Int), ("Bool", Ty::Bool), ("String", Ty::String), ("Unit", Ty::Unit)] {
        let name = ident(interner, span, name);
        let id = type_aliases.insert(span.with_item(TypeAliasDeclaration {
            name,
            underlying: Some(ty),
        }));
        items.push(span.with_item(Item::TypeAlias(id)));
    }

    let name = ident(interner, span, "builtin");
    let unit = CompilationUnit {
        name,
        items,
        functions: Default::default(),
        type_aliases,
        identifier_types: Default::default(),
        unresolved_aliases: Vec::new(),
        unresolved_identifier_types: Vec::new(),
        imported_modules: Vec::new(),
        stage: Stage::TypeChecked,
    };
    Rc::new(Module { name, unit })
}

fn ident(
    interner: &mut SymbolInterner,
    span: Span,
    name: &str,
) -> Identifier {
    Identifier {
        id: interner.insert(Rc::from(name)),
        span,
    }
}
