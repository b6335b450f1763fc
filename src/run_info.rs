use std::{collections::BTreeMap, io::BufRead, ops::Index, path::Path};

use serde::Serialize;

use crate::{
    document::LogDocument,
    error::ParseError,
    record::{sort_records, TestRecord},
};

/// Everything read from one test log: run properties and test records in
/// document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestRunInfo {
    properties: BTreeMap<String, String>,
    tests: Vec<TestRecord>,
}

impl TestRunInfo {
    pub fn new(properties: BTreeMap<String, String>, tests: Vec<TestRecord>) -> Self {
        Self { properties, tests }
    }

    pub fn from_document(document: &LogDocument) -> Result<Self, ParseError> {
        let tests = document
            .test_cases()
            .iter()
            .map(TestRecord::from_element)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(document.properties(), tests))
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn tests(&self) -> &[TestRecord] {
        &self.tests
    }

    /// Records ordered for reporting.
    pub fn sorted_tests(&self) -> Vec<TestRecord> {
        let mut tests = self.tests.clone();
        sort_records(&mut tests);
        tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestRecord> {
        self.tests.iter()
    }
}

impl Index<usize> for TestRunInfo {
    type Output = TestRecord;

    fn index(&self, index: usize) -> &Self::Output {
        &self.tests[index]
    }
}

impl<'a> IntoIterator for &'a TestRunInfo {
    type Item = &'a TestRecord;
    type IntoIter = std::slice::Iter<'a, TestRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.tests.iter()
    }
}

pub fn parse_log_file<P: AsRef<Path>>(path: P) -> Result<TestRunInfo, ParseError> {
    TestRunInfo::from_document(&LogDocument::from_path(path)?)
}

pub fn parse_log<R: BufRead>(xml: R) -> Result<TestRunInfo, ParseError> {
    TestRunInfo::from_document(&LogDocument::from_reader(xml)?)
}
