//! Equivalence catalogs.
//!
//! Catalogs are trusted input: nothing here checks that a listed sequence
//! is really equivalent to the gate it replaces. A source that is missing
//! or malformed yields an empty catalog of the expected shape and a
//! warning, never an error.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An ordered list of gate tokens.
pub type TokenSequence = Vec<String>;

/// Gate name → alternative sequences (cloaked and delayed catalogs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingCatalog(FxHashMap<String, Vec<TokenSequence>>);

impl MappingCatalog {
    /// Alternatives for a gate name.
    pub fn get(&self, gate: &str) -> Option<&[TokenSequence]> {
        self.0.get(gate).map(Vec::as_slice)
    }

    pub fn insert(&mut self, gate: impl Into<String>, alternatives: Vec<TokenSequence>) {
        self.0.insert(gate.into(), alternatives);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<TokenSequence>)> for MappingCatalog {
    fn from_iter<I: IntoIterator<Item = (K, Vec<TokenSequence>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Independent sequences that each compose to the identity (noise bank).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceBank(Vec<TokenSequence>);

impl SequenceBank {
    pub fn new(sequences: Vec<TokenSequence>) -> Self {
        Self(sequences)
    }

    pub fn sequences(&self) -> &[TokenSequence] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `(aux, residual)` sequence pairs whose concatenation is the identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairBank(Vec<(TokenSequence, TokenSequence)>);

impl PairBank {
    pub fn new(pairs: Vec<(TokenSequence, TokenSequence)>) -> Self {
        Self(pairs)
    }

    pub fn pairs(&self) -> &[(TokenSequence, TokenSequence)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The four catalogs a run needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Cloaked,
    Delayed,
    Inverse,
    Composite,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 4] = [
        CatalogKind::Cloaked,
        CatalogKind::Delayed,
        CatalogKind::Inverse,
        CatalogKind::Composite,
    ];

    /// File name of the catalog inside a data directory.
    pub fn file_name(self) -> &'static str {
        match self {
            CatalogKind::Cloaked => "cloaked_gates.json",
            CatalogKind::Delayed => "delayed_gate.json",
            CatalogKind::Inverse => "inverse.json",
            CatalogKind::Composite => "aux_res.json",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Where catalog text comes from.
pub trait CatalogSource {
    /// Raw JSON for one catalog.
    fn read(&self, kind: CatalogKind) -> io::Result<String>;

    /// Human-readable origin for log messages.
    fn describe(&self) -> String;
}

/// Catalog files in a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl CatalogSource for DirectorySource {
    fn read(&self, kind: CatalogKind) -> io::Result<String> {
        std::fs::read_to_string(self.dir.join(kind.file_name()))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Catalogs compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSource;

impl CatalogSource for BuiltinSource {
    fn read(&self, kind: CatalogKind) -> io::Result<String> {
        Ok(match kind {
            CatalogKind::Cloaked => include_str!("../data/cloaked_gates.json"),
            CatalogKind::Delayed => include_str!("../data/delayed_gate.json"),
            CatalogKind::Inverse => include_str!("../data/inverse.json"),
            CatalogKind::Composite => include_str!("../data/aux_res.json"),
        }
        .to_string())
    }

    fn describe(&self) -> String {
        "built-in catalogs".into()
    }
}

/// All catalogs of one engine instance. Read-only after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSet {
    pub cloaked: MappingCatalog,
    pub delayed: MappingCatalog,
    pub inverse: SequenceBank,
    pub composite: PairBank,
}

impl CatalogSet {
    /// Load every catalog from `source`, degrading each failure to an empty
    /// catalog.
    pub fn from_source(source: &dyn CatalogSource) -> Self {
        let set = Self {
            cloaked: decode(source, CatalogKind::Cloaked),
            delayed: decode(source, CatalogKind::Delayed),
            inverse: decode(source, CatalogKind::Inverse),
            composite: decode(source, CatalogKind::Composite),
        };
        debug!(
            "Loaded catalogs from {}: {} cloaked, {} delayed, {} inverse, {} composite",
            source.describe(),
            set.cloaked.len(),
            set.delayed.len(),
            set.inverse.len(),
            set.composite.len()
        );
        set
    }

    /// Load from the JSON files in `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Self {
        Self::from_source(&DirectorySource::new(dir.as_ref()))
    }

    /// The catalogs shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_source(&BuiltinSource)
    }
}

fn decode<T: DeserializeOwned + Default>(source: &dyn CatalogSource, kind: CatalogKind) -> T {
    let text = match source.read(kind) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "Catalog {kind} unavailable in {} ({e}); using an empty catalog",
                source.describe()
            );
            return T::default();
        }
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(
            "Catalog {kind} in {} is malformed ({e}); using an empty catalog",
            source.describe()
        );
        T::default()
    })
}
