//! Structured outcomes for CSV ingestion and SQL script execution.
//!
//! Both loaders report results as values rather than errors: a failed file or
//! script is ordinary data for the orchestrator to act on, and nothing in
//! these types panics or propagates past its unit of work.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// Every new file loaded.
    Success,
    /// Some files loaded, some failed.
    Partial,
    /// Every matched file was already ingested; no data touched.
    Skipped,
    /// The glob matched nothing.
    NoMatches,
    /// The whole ingestion call failed before any file was processed.
    Failed,
}

impl IngestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Skipped => "skipped",
            Self::NoMatches => "no-matches",
            Self::Failed => "failed",
        }
    }
}

/// Per-file ingestion result; `as_str` doubles as the ledger status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Completed,
    Failed,
}

impl FileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub file: String,
    pub status: FileStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub status: IngestStatus,
    pub message: Option<String>,
    pub matched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub files: Vec<FileOutcome>,
}

impl IngestOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::terminal(IngestStatus::Failed, message)
    }

    pub fn no_matches(message: impl Into<String>) -> Self {
        Self::terminal(IngestStatus::NoMatches, message)
    }

    pub fn skipped(matched: usize) -> Self {
        Self {
            status: IngestStatus::Skipped,
            message: None,
            matched,
            succeeded: 0,
            failed: 0,
            skipped: matched,
            files: Vec::new(),
        }
    }

    fn terminal(status: IngestStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            matched: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            files: Vec::new(),
        }
    }

    /// Stage gate for the pipeline: continue when everything loaded, nothing
    /// was new, or at least one file of a partial batch made it in.
    pub fn permits_continuation(&self) -> bool {
        matches!(self.status, IngestStatus::Success | IngestStatus::Skipped)
            || (self.status == IngestStatus::Partial && self.succeeded > 0)
    }
}

#[derive(Debug, Clone)]
pub enum ScriptOutcome {
    Success { script: String, data_date: String },
    Error { script: String, message: String },
}

impl ScriptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
