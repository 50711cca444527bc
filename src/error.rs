use crate::entity::ParsingError;
use crate::metrics::ComputationError;
use thiserror::Error;

/// Errors raised while loading pipeline output, walking parses or evaluating hypotheses.
#[derive(Error, Debug)]
pub enum SynevalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("token {token} has head {head}, outside of a document of {len} tokens")]
    HeadOutOfBounds { token: usize, head: usize, len: usize },

    #[error("entity `{label}` at characters [{start}, {end}) does not fall on token boundaries")]
    MisalignedEntity {
        label: String,
        start: usize,
        end: usize,
    },

    #[error("invalid entity `{label}` at tokens [{start}, {end}): {reason}")]
    InvalidEntity {
        label: String,
        start: usize,
        end: usize,
        reason: &'static str,
    },

    #[error("walking the heads of token {0} never reached a sentence root")]
    MalformedTree(usize),

    #[error("span [{start}, {end}) is out of bounds for a document of {len} tokens")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },

    #[error("received an empty span")]
    EmptySpan,

    #[error("no annotation available for text `{0}`")]
    NotAnnotated(String),

    #[error("annotator error: {0}")]
    Annotator(String),

    #[error("line {line}: unexpected number of columns {found} ({expected})")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("size mismatch in {what}: reference has {reference}, hypothesis has {hypothesis}")]
    SizeMismatch {
        what: String,
        reference: usize,
        hypothesis: usize,
    },

    #[error("tag parsing error: {0}")]
    Tag(#[from] ParsingError),

    #[error("metric computation error: {0}")]
    Computation(#[from] ComputationError),
}

pub type Result<T> = std::result::Result<T, SynevalError>;
