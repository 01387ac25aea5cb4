use crate::i18n::Locale;
use crate::search::SearchError;
use std::fmt;

/// Kind of search write the engine attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Index,
    Update,
    /// An update hit a missing document and was replaced by a full index.
    IndexAfterMissingDocument,
    Delete,
    CreateIndex,
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WriteAction::Index => "index",
            WriteAction::Update => "update",
            WriteAction::IndexAfterMissingDocument => "index (after missing document)",
            WriteAction::Delete => "delete",
            WriteAction::CreateIndex => "create index",
        };
        f.write_str(label)
    }
}

/// How a successful write landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    /// The target document was already gone.
    AlreadyAbsent,
}

/// Result of one search write, attributed to the locales it covers.
///
/// Partitioned writes cover exactly one locale. A flattened document write
/// covers every locale whose fields it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub locales: Vec<Locale>,
    pub action: WriteAction,
    pub index: String,
    pub result: Result<WriteStatus, SearchError>,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn covers(&self, locale: &Locale) -> bool {
        self.locales.contains(locale)
    }
}

/// Aggregate of every write issued for one operation.
///
/// Failures are collected, never raised: the caller decides whether a
/// partial failure should abort anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    outcomes: Vec<WriteOutcome>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_outcomes(outcomes: Vec<WriteOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn push(&mut self, outcome: WriteOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn merge(&mut self, other: SyncReport) {
        self.outcomes.extend(other.outcomes);
    }

    pub fn outcomes(&self) -> &[WriteOutcome] {
        &self.outcomes
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(WriteOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &WriteOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    pub fn outcomes_for<'a>(
        &'a self,
        locale: &'a Locale,
    ) -> impl Iterator<Item = &'a WriteOutcome> {
        self.outcomes.iter().filter(move |outcome| outcome.covers(locale))
    }

    /// Number of writes attempted. A fallback index counts once.
    pub fn write_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().count();
        write!(
            f,
            "{} write(s), {} succeeded, {} failed",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed
        )
    }
}
