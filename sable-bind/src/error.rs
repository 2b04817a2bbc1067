use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, PartialEq, Clone)]
pub enum BindError {
    #[error("unable to load module `{0}`: {1}")]
    ModuleNotFound(String, String),
    #[error("circular module import: {0}")]
    CircularImport(String),
    #[error("import of `{0}` may name at most one member of the module")]
    InvalidAccessPath(String),
    #[error("ambiguous name `{0}` at the base of a type reference")]
    AmbiguousTypeBase(String),
    #[error("candidate for `{0}` found here")]
    #[diagnostic(severity(Advice))]
    FoundCandidate(String),
    #[error("use of undeclared type `{0}`")]
    UseUndeclaredType(String),
    #[error("unknown name `{0}` in type reference")]
    UnknownNameInType(String),
    #[error("`{0}` cannot be dotted into: it does not name a module")]
    UnknownDottedTypeBase(String),
    #[error("module `{0}` has no member type `{1}`")]
    InvalidMemberType(String, String),
    #[error("`{0}` names a definition which is not a type")]
    NamedDefinitionIsNotType(String),
    #[error("dotted reference `{0}` does not name a type")]
    DottedReferenceNotType(String),
    #[error("use of unresolved identifier `{0}`")]
    UnresolvedIdentifier(String),
}
