use std::fmt;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestStatus {
    Run,
    Failed,
    Disabled,
    NotRun,
    /// Any other value, including a `custom_status` or an empty status.
    Other(String),
}

impl TestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TestStatus::Run => "run",
            TestStatus::Failed => "failed",
            TestStatus::Disabled => "disabled",
            TestStatus::NotRun => "notrun",
            TestStatus::Other(status) => status,
        }
    }
}

impl From<&str> for TestStatus {
    fn from(value: &str) -> Self {
        match value {
            "run" => TestStatus::Run,
            "failed" => TestStatus::Failed,
            "disabled" => TestStatus::Disabled,
            "notrun" => TestStatus::NotRun,
            other => TestStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
