use std::rc::Rc;

use sable_utils::{idx_map_key, Identifier, IndexMap, Path, Span, SpannedItem, SymbolId};

idx_map_key!(
    /// The ID type of a function declaration within a compilation unit.
    FunctionId
);

idx_map_key!(
    /// The ID type of a type alias declaration within a compilation unit.
    TypeAliasId
);

idx_map_key!(
    /// The ID type of a dotted identifier-type chain within a compilation unit.
    IdentifierTypeId
);

/// How far through the compiler pipeline a compilation unit has advanced.
/// Stages only ever move forward; see [`CompilationUnit::advance_stage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Parsed,
    NameBound,
    TypeChecked,
}

/// One source file's parsed program, as it progresses through the
/// binding and type-checking stages.
#[derive(Debug)]
pub struct CompilationUnit {
    /// The unit's module name, derived from its file stem.
    pub name: Identifier,
    /// Top-level declarations and statements, in source order.
    pub items: Vec<SpannedItem<Item>>,
    pub functions: IndexMap<FunctionId, SpannedItem<FunctionDeclaration>>,
    /// Both declared aliases (reachable from `items`) and placeholder
    /// aliases the parser created for not-yet-resolved simple type names
    /// (`underlying` still `None`).
    pub type_aliases: IndexMap<TypeAliasId, SpannedItem<TypeAliasDeclaration>>,
    pub identifier_types: IndexMap<IdentifierTypeId, IdentifierType>,
    /// Placeholder aliases awaiting resolution, seeded by the parser.
    pub unresolved_aliases: Vec<TypeAliasId>,
    /// Dotted chains awaiting resolution, seeded by the parser.
    pub unresolved_identifier_types: Vec<IdentifierTypeId>,
    /// Frozen by the import processor; empty until then.
    pub imported_modules: Vec<ImportedModule>,
    pub stage: Stage,
}

/// An external compilation unit exposed for qualified lookup by importers.
#[derive(Debug)]
pub struct Module {
    pub name: Identifier,
    pub unit: CompilationUnit,
}

/// `(accessPath, module)`: one entry in a unit's frozen import list. The
/// access path restricts which member is visible and holds at most one
/// identifier; import directives with longer paths are rejected before
/// they are recorded.
#[derive(Clone, Debug)]
pub struct ImportedModule {
    pub access_path: Path,
    pub module:      Rc<Module>,
}

#[derive(Debug)]
pub enum Item {
    Import(ImportStatement),
    TypeAlias(TypeAliasId),
    Function(FunctionId),
    Expr(SpannedItem<Expression>),
}

#[derive(Debug)]
pub struct ImportStatement {
    pub path: Path,
}

#[derive(Clone, Debug)]
pub struct TypeAliasDeclaration {
    pub name: Identifier,
    /// `None` while unresolved; filled exactly once by the parser (declared
    /// aliases) or the binding pass (placeholders).
    pub underlying: Option<Ty>,
}

#[derive(Clone, Debug)]
pub struct FunctionDeclaration {
    pub name:        Identifier,
    pub parameters:  Box<[FunctionParameter]>,
    pub return_type: Ty,
    pub body:        Vec<SpannedItem<Expression>>,
}

#[derive(Clone, Debug)]
pub struct FunctionParameter {
    pub name: Identifier,
    pub ty:   Ty,
}

#[derive(Clone, Debug)]
pub enum Ty {
    Int,
    Bool,
    String,
    Unit,
    /// A simple named type reference, by alias declaration or placeholder.
    Alias(TypeAliasId),
    /// A dotted type reference, resolved through its chain.
    Identifier(IdentifierTypeId),
    /// The shared error-type sentinel. Its presence means the failure has
    /// already been diagnosed; downstream passes must not re-report it.
    Error,
}

/// A dotted sequence of names denoting a type, resolved left to right.
#[derive(Clone, Debug)]
pub struct IdentifierType {
    pub components: Vec<Component>,
}

impl IdentifierType {
    pub fn full_span(&self) -> Span {
        let first = self.components.first().expect("chains are never empty").name.span;
        let last = self.components.last().expect("chains are never empty").name.span;
        first.join(last)
    }
}

#[derive(Clone, Debug)]
pub struct Component {
    pub name:  Identifier,
    pub value: ComponentValue,
}

/// The resolution slot of one chain component. Starts `Unresolved` and
/// transitions at most once to a concrete value; only `Error` may ever
/// overwrite a filled slot.
#[derive(Clone, Debug)]
pub enum ComponentValue {
    Unresolved,
    Decl(GlobalDecl),
    Module(Rc<Module>),
    Type(Ty),
    Error,
}

impl ComponentValue {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ComponentValue::Unresolved)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ComponentValue::Error)
    }
}

/// A declaration reference paired with the module it lives in (`None`
/// meaning the referencing unit itself) and its declaration site.
#[derive(Clone, Debug)]
pub struct GlobalDecl {
    pub module: Option<Rc<Module>>,
    pub decl:   DeclRef,
    pub loc:    Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclRef {
    Function(FunctionId),
    TypeAlias(TypeAliasId),
}

#[derive(Clone, Debug)]
pub enum Expression {
    Literal(Literal),
    /// An unresolved bare name, as parsed. The binding pass rewrites every
    /// one of these away.
    Name(Identifier),
    Call {
        callee: Box<SpannedItem<Expression>>,
        args:   Vec<SpannedItem<Expression>>,
    },
    Member {
        base:   Box<SpannedItem<Expression>>,
        member: Identifier,
    },
    Lambda(FunctionId),
    /// A reference to a parameter of a lexically enclosing function.
    Param {
        function: FunctionId,
        index:    usize,
        name:     Identifier,
    },
    /// All same-named candidates for a bare name, in declaration order.
    /// Disambiguation is deferred to overload resolution.
    OverloadSet {
        name:       Identifier,
        candidates: Box<[GlobalDecl]>,
    },
    ModuleRef(Rc<Module>),
    /// The error-expression sentinel: resolution failed here and has been
    /// diagnosed.
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Integer(i64),
    Boolean(bool),
    String(Rc<str>),
}

impl std::fmt::Display for Literal {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl CompilationUnit {
    /// Advance the unit's lifecycle stage. Stages are strictly monotonic;
    /// a pass must never run twice or out of order.
    pub fn advance_stage(
        &mut self,
        to: Stage,
    ) {
        assert!(to > self.stage, "stage must advance monotonically: {:?} -> {:?}", self.stage, to);
        self.stage = to;
    }

    /// Unqualified value lookup: the unit's own top-level declarations in
    /// source order, falling back to imported-module members (in import
    /// order, honoring access-path restrictions) only when no local
    /// declaration matches.
    pub fn lookup_global_value(
        &self,
        name: SymbolId,
    ) -> Vec<GlobalDecl> {
        let local = self.lookup_local_value(name);
        if !local.is_empty() {
            return local;
        }

        let mut found = Vec::new();
        for entry in &self.imported_modules {
            for (decl, loc) in entry.module.lookup_value(&entry.access_path, name) {
                found.push(GlobalDecl {
                    module: Some(entry.module.clone()),
                    decl,
                    loc,
                });
            }
        }
        found
    }

    pub fn lookup_local_value(
        &self,
        name: SymbolId,
    ) -> Vec<GlobalDecl> {
        let mut found = Vec::new();
        for item in &self.items {
            match item.item() {
                Item::Function(id) => {
                    let func = self.functions.get(*id);
                    if func.item().name.id == name {
                        found.push(GlobalDecl {
                            module: None,
                            decl:   DeclRef::Function(*id),
                            loc:    func.item().name.span,
                        });
                    }
                },
                Item::TypeAlias(id) => {
                    let alias = self.type_aliases.get(*id);
                    if alias.item().name.id == name {
                        found.push(GlobalDecl {
                            module: None,
                            decl:   DeclRef::TypeAlias(*id),
                            loc:    alias.item().name.span,
                        });
                    }
                },
                Item::Import(_) | Item::Expr(_) => {},
            }
        }
        found
    }

    /// Unqualified type lookup: the declared alias, with its name's
    /// declaration site and its underlying type ready to copy. Local
    /// declarations shadow imported members.
    pub fn lookup_global_type(
        &self,
        name: SymbolId,
    ) -> Option<(Span, Ty)> {
        for item in &self.items {
            if let Item::TypeAlias(id) = item.item() {
                let alias = self.type_aliases.get(*id);
                if alias.item().name.id == name {
                    let underlying = alias.item().underlying.clone().unwrap_or(Ty::Error);
                    return Some((alias.item().name.span, underlying));
                }
            }
        }

        for entry in &self.imported_modules {
            if let Some((id, loc)) = entry.module.lookup_type(&entry.access_path, name) {
                return Some((loc, entry.module.flatten_alias(id)));
            }
        }
        None
    }

    /// Find an imported module by its own name; first match in import-list
    /// order wins.
    pub fn lookup_module(
        &self,
        name: SymbolId,
    ) -> Option<Rc<Module>> {
        self.imported_modules
            .iter()
            .find(|entry| entry.module.name.id == name)
            .map(|entry| entry.module.clone())
    }

    /// Chase alias and chain indirections down to a concrete type. A cycle
    /// among aliases yields `Ty::Error` rather than diverging.
    pub fn flatten_ty(
        &self,
        ty: &Ty,
    ) -> Ty {
        self.flatten_ty_inner(ty, &mut Vec::new(), &mut Vec::new())
    }

    fn flatten_ty_inner(
        &self,
        ty: &Ty,
        seen_aliases: &mut Vec<TypeAliasId>,
        seen_chains: &mut Vec<IdentifierTypeId>,
    ) -> Ty {
        match ty {
            Ty::Alias(id) => {
                if seen_aliases.contains(id) {
                    return Ty::Error;
                }
                seen_aliases.push(*id);
                match &self.type_aliases.get(*id).item().underlying {
                    Some(underlying) => self.flatten_ty_inner(&underlying.clone(), seen_aliases, seen_chains),
                    None => Ty::Error,
                }
            },
            Ty::Identifier(id) => {
                if seen_chains.contains(id) {
                    return Ty::Error;
                }
                seen_chains.push(*id);
                let chain = self.identifier_types.get(*id);
                match &chain.components.last().expect("chains are never empty").value {
                    ComponentValue::Type(t) => self.flatten_ty_inner(&t.clone(), seen_aliases, seen_chains),
                    _ => Ty::Error,
                }
            },
            other => other.clone(),
        }
    }
}

impl Module {
    /// Qualified lookup of a member type alias, honoring an access-path
    /// restriction of at most one identifier.
    pub fn lookup_type(
        &self,
        restriction: &Path,
        name: SymbolId,
    ) -> Option<(TypeAliasId, Span)> {
        if !self.member_visible(restriction, name) {
            return None;
        }
        for item in &self.unit.items {
            if let Item::TypeAlias(id) = item.item() {
                let alias = self.unit.type_aliases.get(*id);
                if alias.item().name.id == name {
                    return Some((*id, alias.item().name.span));
                }
            }
        }
        None
    }

    /// Qualified lookup of member value declarations, honoring an
    /// access-path restriction of at most one identifier.
    pub fn lookup_value(
        &self,
        restriction: &Path,
        name: SymbolId,
    ) -> Vec<(DeclRef, Span)> {
        if !self.member_visible(restriction, name) {
            return Vec::new();
        }
        self.unit
            .lookup_local_value(name)
            .into_iter()
            .map(|decl| (decl.decl, decl.loc))
            .collect()
    }

    /// The fully-flattened underlying type of a member alias. Only
    /// meaningful once this module's unit is fully bound, which the module
    /// loader guarantees before handing the module to any importer.
    pub fn flatten_alias(
        &self,
        id: TypeAliasId,
    ) -> Ty {
        match &self.unit.type_aliases.get(id).item().underlying {
            Some(underlying) => self.unit.flatten_ty(underlying),
            None => Ty::Error,
        }
    }

    fn member_visible(
        &self,
        restriction: &Path,
        name: SymbolId,
    ) -> bool {
        restriction.is_empty() || restriction.first().id == name
    }
}
