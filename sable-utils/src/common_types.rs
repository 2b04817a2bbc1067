//! types used across multiple sable crates

use std::rc::Rc;

use crate::{idx_map_key, IndexMap, Span};

idx_map_key!(
    /// The ID of an ident in the symbol interner
    SymbolId
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identifier {
    pub id:   SymbolId,
    pub span: Span,
}

/// A dotted sequence of identifiers, as written in source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    pub identifiers: Box<[Identifier]>,
}

impl Path {
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        Self {
            identifiers: identifiers.into_boxed_slice(),
        }
    }

    pub fn empty() -> Self {
        Self {
            identifiers: Box::new([]),
        }
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.identifiers.iter()
    }

    pub fn first(&self) -> &Identifier {
        self.identifiers.first().expect("paths are never empty when parsed")
    }
}

#[derive(Default, Debug, Clone)]
pub struct SymbolInterner {
    symbol_map: IndexMap<SymbolId, Rc<str>>,
}

impl SymbolInterner {
    pub fn insert(
        &mut self,
        v: Rc<str>,
    ) -> SymbolId {
        match self.symbol_map.contains_value(v.clone()) {
            Some(k) => k,
            None => self.symbol_map.insert(v),
        }
    }

    pub fn get(
        &self,
        id: SymbolId,
    ) -> Rc<str> {
        self.symbol_map.get(id).clone()
    }

    pub fn get_path(
        &self,
        path: &Path,
    ) -> Rc<str> {
        Rc::from(path.iter().map(|id| self.get(id.id)).collect::<Vec<_>>().join("."))
    }
}
