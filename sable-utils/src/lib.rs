//! Types shared across the sable compiler crates: typed index maps, the
//! symbol interner, source buffers and spans, and diagnostic rendering.

pub use common_types::{Identifier, Path, SymbolId, SymbolInterner};
pub use index_map::IndexMap;
pub use sources::{render_error, SourceId, SourceMap, Span, SpannedItem};

mod common_types;
mod index_map;
mod sources;
