//! Name binding for sable compilation units.
//!
//! The pass runs once per unit, directly after parsing. It processes
//! import directives (loading and fully checking each imported module),
//! resolves type references left pending by the parser, and rewrites
//! every bare name in expression position into its bound form. Failures
//! are reported as diagnostics and poisoned with error sentinels; the
//! pass itself never aborts the unit.

pub use binder::{BindContext, NoopTypeCheck, TypeCheck};
pub use error::BindError;

mod binder;
mod builtin;
mod error;
mod exprs;
mod imports;
mod loader;
mod types;
