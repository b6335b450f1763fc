pub mod call_tree;
pub mod document;
pub mod error;
pub mod metrics;
pub mod record;
pub mod report;
pub mod run_info;
pub mod status;

pub use error::{MissingInputError, ParseError};
pub use record::TestRecord;
pub use run_info::{parse_log, parse_log_file, TestRunInfo};
