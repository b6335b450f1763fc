use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use quick_xml::{
    events::{BytesStart, BytesText, Event},
    Reader,
};

use crate::error::ParseError;

/// Root attributes carrying this prefix are run-level properties.
pub const PROPERTY_PREFIX: &str = "cv_";

const TAG_TEST_CASE: &[u8] = b"testcase";
const TAG_FAILURE: &[u8] = b"failure";

/// A single `testcase` element as it appeared in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCaseElement {
    attributes: Vec<(String, String)>,
    has_failure: bool,
}

impl TestCaseElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether a `failure` element occurs anywhere inside this test case.
    pub fn has_failure(&self) -> bool {
        self.has_failure
    }
}

/// A parsed test log: the root element's attributes and every `testcase`
/// element in document order, however deeply nested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDocument {
    root_name: String,
    root_attributes: Vec<(String, String)>,
    test_cases: Vec<TestCaseElement>,
}

impl LogDocument {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Reading test log {:?}", path);
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(xml: R) -> Result<Self, ParseError> {
        let mut reader = Reader::from_reader(xml);
        let mut builder = DocumentBuilder::default();

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(e) => builder.open_element(&e, false)?,
                Event::Empty(e) => builder.open_element(&e, true)?,
                Event::End(_) => builder.close_element(),
                Event::Text(e) => builder.text(&e)?,
                _ => (),
            }
            buf.clear();
        }

        builder.finish()
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Root attributes named `cv_<key>`, keyed by `<key>`.
    pub fn properties(&self) -> BTreeMap<String, String> {
        self.root_attributes
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(PROPERTY_PREFIX)
                    .map(|key| (key.to_string(), value.clone()))
            })
            .collect()
    }

    pub fn test_cases(&self) -> &[TestCaseElement] {
        &self.test_cases
    }
}

#[derive(Debug, Default)]
struct DocumentBuilder {
    root: Option<(String, Vec<(String, String)>)>,
    open_elements: Vec<String>,
    // (depth, index into `test_cases`) of every test case still open
    open_test_cases: Vec<(usize, usize)>,
    test_cases: Vec<TestCaseElement>,
}

impl DocumentBuilder {
    fn open_element(&mut self, e: &BytesStart, is_empty: bool) -> Result<(), ParseError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let depth = self.open_elements.len();

        if depth == 0 {
            if self.root.is_some() {
                return Err(ParseError::MultipleRoots(name));
            }
            self.root = Some((name.clone(), read_attributes(e)?));
        }

        match e.name().as_ref() {
            TAG_TEST_CASE => {
                self.test_cases.push(TestCaseElement {
                    attributes: read_attributes(e)?,
                    has_failure: false,
                });
                if !is_empty {
                    self.open_test_cases
                        .push((depth, self.test_cases.len() - 1));
                }
            }
            TAG_FAILURE => {
                for (_, index) in &self.open_test_cases {
                    self.test_cases[*index].has_failure = true;
                }
            }
            _ => (),
        }

        if !is_empty {
            self.open_elements.push(name);
        }

        Ok(())
    }

    fn text(&mut self, e: &BytesText) -> Result<(), ParseError> {
        if self.open_elements.is_empty() {
            if !e.iter().all(u8::is_ascii_whitespace) {
                return Err(ParseError::TextOutsideRoot);
            }
            return Ok(());
        }
        // Text content is not kept, but undefined entities still make the
        // document malformed.
        e.unescape()?;
        Ok(())
    }

    fn close_element(&mut self) {
        // Unbalanced end tags are rejected by the reader itself.
        if self.open_elements.pop().is_none() {
            return;
        }
        let depth = self.open_elements.len();
        if matches!(self.open_test_cases.last(), Some((d, _)) if *d == depth) {
            self.open_test_cases.pop();
        }
    }

    fn finish(self) -> Result<LogDocument, ParseError> {
        if let Some(name) = self.open_elements.last() {
            return Err(ParseError::UnclosedElement(name.clone()));
        }
        let (root_name, root_attributes) = self.root.ok_or(ParseError::MissingRoot)?;
        log::debug!(
            "Found {} test cases under <{}>",
            self.test_cases.len(),
            root_name
        );

        Ok(LogDocument {
            root_name,
            root_attributes,
            test_cases: self.test_cases,
        })
    }
}

fn read_attributes(e: &BytesStart) -> Result<Vec<(String, String)>, ParseError> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            Ok((key, value))
        })
        .collect()
}
