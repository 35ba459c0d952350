use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A filter rule or threshold that cannot be parsed. Raised before any record is read.
    #[error("invalid filter configuration `{rule}`: {reason}")]
    Configuration { rule: String, reason: String },

    /// A data line the reader could not turn into a record.
    /// The raw line is kept so it can still be routed to the discarded output.
    #[error("malformed record on line {line_number}: {reason}")]
    MalformedRecord {
        line_number: usize,
        line: String,
        reason: String,
    },

    #[error("invalid VCF header: {0}")]
    Header(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Compression(#[from] niffler::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("{flavor} VCF (version {version}, source {source_name}) is not supported; use force to filter it anyway")]
    UnsupportedFlavor {
        flavor: String,
        version: String,
        source_name: String,
    },

    #[error("record submitted after the filter pass was finished")]
    PassFinished,
}

impl Error {
    pub(crate) fn configuration(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Configuration {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedRecord { .. })
    }
}
