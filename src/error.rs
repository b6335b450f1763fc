use std::path::PathBuf;

use thiserror::Error;

use crate::metrics::MetricKind;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("could not read test log {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML document")]
    Xml(#[from] quick_xml::Error),
    #[error("document has no root element")]
    MissingRoot,
    #[error("document has more than one root element (found `{0}`)")]
    MultipleRoots(String),
    #[error("document has text outside the root element")]
    TextOutsideRoot,
    #[error("document ended before `{0}` was closed")]
    UnclosedElement(String),
    #[error("attribute `{attribute}` of test case `{test}` is not a valid {kind}: {value:?}")]
    InvalidMetric {
        test: String,
        attribute: &'static str,
        kind: MetricKind,
        value: String,
    },
}

impl ParseError {
    pub fn is_invalid_metric(&self) -> bool {
        matches!(self, ParseError::InvalidMetric { .. })
    }
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("no test log files were given")]
pub struct MissingInputError;
