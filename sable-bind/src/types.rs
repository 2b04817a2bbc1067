use sable_ast::{CompilationUnit, ComponentValue, DeclRef, GlobalDecl, IdentifierTypeId, Ty};
use sable_utils::{Path, Span};

use crate::{binder::BindContext, error::BindError};

/// Resolve the placeholder aliases the parser created for simple type
/// names. Each one is filled from the first matching alias declaration,
/// local declarations shadowing imported members; a miss fills the
/// placeholder with the error type so it is never looked at twice.
pub(crate) fn resolve_placeholder_aliases(
    ctx: &mut BindContext,
    unit: &mut CompilationUnit,
) {
    let pending = std::mem::take(&mut unit.unresolved_aliases);
    for id in pending {
        let name = unit.type_aliases.get(id).item().name;
        match unit.lookup_global_type(name.id) {
            Some((loc, underlying)) => {
                let alias = unit.type_aliases.get_mut(id).item_mut();
                alias.name.span = loc;
                alias.underlying = Some(underlying);
            },
            None => {
                ctx.errs
                    .push(name.span.with_item(BindError::UseUndeclaredType(ctx.name_of(name.id))));
                unit.type_aliases.get_mut(id).item_mut().underlying = Some(Ty::Error);
            },
        }
    }
}

/// Resolve the dotted type-reference chains the parser seeded. A chain
/// that fails anywhere has every component poisoned, so later passes can
/// tell "already diagnosed" from "never visited".
pub(crate) fn resolve_identifier_types(
    ctx: &mut BindContext,
    unit: &mut CompilationUnit,
) {
    let pending = std::mem::take(&mut unit.unresolved_identifier_types);
    for id in pending {
        if !resolve_chain(ctx, unit, id) {
            for component in &mut unit.identifier_types.get_mut(id).components {
                component.value = ComponentValue::Error;
            }
        }
    }
}

fn resolve_chain(
    ctx: &mut BindContext,
    unit: &mut CompilationUnit,
    id: IdentifierTypeId,
) -> bool {
    let chain_span = unit.identifier_types.get(id).full_span();
    let component_count = unit.identifier_types.get(id).components.len();

    // the base component: unqualified value lookup first, falling back to
    // the names of imported modules only when that comes up empty
    let base = unit.identifier_types.get(id).components[0].clone();
    if base.value.is_unresolved() {
        let name = base.name;
        let candidates = unit.lookup_global_value(name.id);
        let value = match candidates.len() {
            1 => ComponentValue::Decl(candidates.into_iter().next().expect("length was checked")),
            0 => match unit.lookup_module(name.id) {
                Some(module) => ComponentValue::Module(module),
                None => {
                    let err = if component_count == 1 {
                        BindError::UseUndeclaredType(ctx.name_of(name.id))
                    } else {
                        BindError::UnknownNameInType(ctx.name_of(name.id))
                    };
                    ctx.errs.push(chain_span.with_item(err));
                    return false;
                },
            },
            _ => {
                ctx.errs.push(chain_span.with_item(BindError::AmbiguousTypeBase(ctx.name_of(name.id))));
                for candidate in candidates {
                    ctx.errs.push(candidate.loc.with_item(BindError::FoundCandidate(ctx.name_of(name.id))));
                }
                return false;
            },
        };
        unit.identifier_types.get_mut(id).components[0].value = value;
    }

    // walk the remaining components left to right; only a module can be
    // dotted into
    for ix in 1..component_count {
        let prev = unit.identifier_types.get(id).components[ix - 1].clone();
        let name = unit.identifier_types.get(id).components[ix].name;
        let value = match prev.value {
            // qualified lookup is type-namespace only; a member that names
            // a value is as much a miss as one that does not exist
            ComponentValue::Module(module) => match module.lookup_type(&Path::empty(), name.id) {
                Some((alias, loc)) => ComponentValue::Decl(GlobalDecl {
                    module: Some(module.clone()),
                    decl: DeclRef::TypeAlias(alias),
                    loc,
                }),
                None => {
                    ctx.errs.push(
                        chain_span
                            .with_item(BindError::InvalidMemberType(ctx.name_of(module.name.id), ctx.name_of(name.id))),
                    );
                    return false;
                },
            },
            _ => {
                ctx.errs
                    .push(chain_span.with_item(BindError::UnknownDottedTypeBase(ctx.name_of(prev.name.id))));
                return false;
            },
        };
        unit.identifier_types.get_mut(id).components[ix].value = value;
    }

    finalize_chain(ctx, unit, id, chain_span)
}

/// The terminal component must name a type alias; replace it with the
/// aliased type. Local aliases contribute their underlying type as-is;
/// an alias from another module is flattened to a concrete type, which
/// is sound because the loader fully binds modules before importers see
/// them.
fn finalize_chain(
    ctx: &mut BindContext,
    unit: &mut CompilationUnit,
    id: IdentifierTypeId,
    chain_span: Span,
) -> bool {
    let component_count = unit.identifier_types.get(id).components.len();
    let last = unit.identifier_types.get(id).components.last().expect("chains are never empty").clone();
    let not_a_type = |ctx: &BindContext| {
        if component_count == 1 {
            BindError::NamedDefinitionIsNotType(ctx.name_of(last.name.id))
        } else {
            BindError::DottedReferenceNotType(ctx.name_of(last.name.id))
        }
    };
    let ty = match &last.value {
        ComponentValue::Type(_) => return true,
        ComponentValue::Decl(global) => match global.decl {
            DeclRef::TypeAlias(alias) => match &global.module {
                Some(module) => module.flatten_alias(alias),
                None => unit.type_aliases.get(alias).item().underlying.clone().unwrap_or(Ty::Error),
            },
            DeclRef::Function(_) => {
                let err = not_a_type(ctx);
                ctx.errs.push(chain_span.with_item(err));
                return false;
            },
        },
        ComponentValue::Module(_) => {
            let err = not_a_type(ctx);
            ctx.errs.push(chain_span.with_item(err));
            return false;
        },
        ComponentValue::Unresolved | ComponentValue::Error => return false,
    };

    let components = &mut unit.identifier_types.get_mut(id).components;
    components.last_mut().expect("chains are never empty").value = ComponentValue::Type(ty);
    true
}
