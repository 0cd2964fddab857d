/// Non-fatal problems found while loading input files.
///
/// Loaders never fail on bad input files; they degrade to empty or default
/// data and hand these back so the caller can show them to the operator.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadWarning {
    #[error("vocabulary file not found: {}", .0.display())]
    VocabularyMissing(PathBuf),
    #[error("could not read vocabulary file {}: {source}", .path.display())]
    VocabularyUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read entity pool file {}: {source}; using the default pool", .path.display())]
    PoolUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("entity pool file {} is malformed ({source}); using the default pool", .path.display())]
    PoolMalformed {
        path: PathBuf,
        backup: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write entity pool file {}: {message}", .path.display())]
    PoolNotPersisted { path: PathBuf, message: String },
    #[error("rule examples file not found: {}", .0.display())]
    RulesMissing(PathBuf),
    #[error("could not read rule examples file {}: {source}", .path.display())]
    RulesUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded value together with the warnings produced while loading it.
#[derive(Debug)]
pub struct Loaded<T> {
    pub value: T,
    pub warnings: Vec<LoadWarning>,
}

impl<T> Loaded<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(value: T, warning: LoadWarning) -> Self {
        tracing::warn!("{}", warning);
        Self {
            value,
            warnings: vec![warning],
        }
    }

    /// Split into the value and its warnings, appending the warnings to `sink`.
    pub fn drain_into(self, sink: &mut Vec<LoadWarning>) -> T {
        sink.extend(self.warnings);
        self.value
    }
}
