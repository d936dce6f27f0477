use std::fmt::Display;

#[derive(Debug)]
pub enum SyncError {
    Auth { status: u16, reason: String },
    Fetch { page: u32, reason: String },
    Source { source: &'static str, reason: String },
    Persistence(String),
    Write(String),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth { status, reason } => {
                write!(f, "Token exchange rejected (status {status}): {reason}")
            }
            Self::Fetch { page, reason } => {
                write!(f, "Activity page {page} request failed: {reason}")
            }
            Self::Source { source, reason } => {
                write!(f, "Source '{source}' failed: {reason}")
            }
            Self::Persistence(reason) => {
                write!(f, "Checkpoint persistence failed: {reason}")
            }
            Self::Write(reason) => {
                write!(f, "Output document could not be written: {reason}")
            }
        }
    }
}

impl std::error::Error for SyncError {}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "AUTH-1001",
            Self::Fetch { .. } => "FETCH-1002",
            Self::Source { .. } => "SRC-1003",
            Self::Persistence(_) => "PER-1004",
            Self::Write(_) => "OUT-1005",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "The authorization endpoint did not issue an access token.",
            Self::Fetch { .. } => "A paginated activity request failed or returned an unreadable payload.",
            Self::Source { .. } => "A source adapter could not produce its data block.",
            Self::Persistence(_) => "The activity checkpoint file could not be saved.",
            Self::Write(_) => "The aggregate output file could not be written.",
        }
    }

    /// Wrap any adapter-level failure as a source error for the aggregator.
    pub fn source_failure(source: &'static str, reason: impl Display) -> Self {
        Self::Source {
            source,
            reason: reason.to_string(),
        }
    }
}
