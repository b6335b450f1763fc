use std::{cmp::Ordering, fmt};

use serde::Serialize;

use crate::{
    call_tree::CallTree,
    document::TestCaseElement,
    error::ParseError,
    metrics::{Metric, MetricValue, Metrics, TimeUnit},
    status::TestStatus,
};

/// Test names starting with this prefix are disabled tests.
pub const DISABLED_PREFIX: &str = "DISABLED_";
/// Stored `total_ipp_weight` when the attribute is missing.
pub const UNKNOWN_IPP_WEIGHT: &str = "-1";

const JOIN_SEPARATOR: &str = "::";

pub mod attrs {
    pub const CLASSNAME: &str = "classname";
    pub const NAME: &str = "name";
    pub const VALUE_PARAM: &str = "value_param";
    pub const TYPE_PARAM: &str = "type_param";
    pub const STATUS: &str = "status";
    pub const CUSTOM_STATUS: &str = "custom_status";
    pub const FUNCTIONS_HIERARCHY: &str = "functions_hierarchy";
    pub const TOTAL_IPP_WEIGHT: &str = "total_ipp_weight";
}

/// One executed test with its resolved status, metrics and call tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    fixture: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    type_param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value_param: Option<String>,
    status: TestStatus,
    metrics: Metrics,
    total_ipp_weight: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_tree: Option<CallTree>,
}

impl TestRecord {
    pub fn from_element(element: &TestCaseElement) -> Result<Self, ParseError> {
        let mut fixture = element.attribute(attrs::CLASSNAME).unwrap_or_default().to_string();
        let mut name = element.attribute(attrs::NAME).unwrap_or_default().to_string();

        let mut status = match element.attribute(attrs::CUSTOM_STATUS) {
            Some(custom_status) if !custom_status.is_empty() => TestStatus::from(custom_status),
            _ if element.has_failure() => TestStatus::Failed,
            _ => TestStatus::from(element.attribute(attrs::STATUS).unwrap_or_default()),
        };

        let metrics = parse_metrics(element, &fixture, &name)?;

        if name.starts_with(DISABLED_PREFIX) {
            name = name.trim_start_matches(DISABLED_PREFIX).to_string();
            fixture = fixture.trim_start_matches(DISABLED_PREFIX).to_string();
            status = TestStatus::Disabled;
        }

        let record = Self {
            fixture,
            name,
            type_param: non_empty_attribute(element, attrs::TYPE_PARAM),
            value_param: non_empty_attribute(element, attrs::VALUE_PARAM),
            status,
            metrics,
            total_ipp_weight: element
                .attribute(attrs::TOTAL_IPP_WEIGHT)
                .unwrap_or(UNKNOWN_IPP_WEIGHT)
                .to_string(),
            call_tree: element
                .attribute(attrs::FUNCTIONS_HIERARCHY)
                .map(CallTree::decode),
        };
        log::debug!("Parsed test {} ({})", record.test_name(), record.status);

        Ok(record)
    }

    pub fn fixture(&self) -> &str {
        &self.fixture
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_param(&self) -> Option<&str> {
        self.type_param.as_deref()
    }

    pub fn value_param(&self) -> Option<&str> {
        self.value_param.as_deref()
    }

    pub fn status(&self) -> &TestStatus {
        &self.status
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The metric as recorded, or its default when the attribute was absent.
    pub fn metric(&self, metric: Metric) -> MetricValue {
        self.metrics.value_or_default(metric)
    }

    /// The metric converted to `unit`, or `None` when it was not recorded.
    pub fn scaled(&self, metric: Metric, unit: TimeUnit) -> Option<f64> {
        self.metrics.scaled(metric, unit)
    }

    /// Raw `total_ipp_weight`, [`UNKNOWN_IPP_WEIGHT`] when absent.
    pub fn total_ipp_weight(&self) -> &str {
        &self.total_ipp_weight
    }

    /// `None` when the log carried no call tree for this test.
    pub fn call_tree(&self) -> Option<&CallTree> {
        self.call_tree.as_ref()
    }

    pub fn call_tree_lines(&self) -> &[String] {
        self.call_tree.as_ref().map(CallTree::lines).unwrap_or_default()
    }

    /// Whether the call tree has an IPP node; `None` without a call tree.
    pub fn has_ipp_node(&self) -> Option<bool> {
        self.call_tree.as_ref().map(CallTree::has_ipp_node)
    }

    pub fn ipp_functions(&self) -> &[String] {
        self.call_tree
            .as_ref()
            .map(CallTree::ipp_functions)
            .unwrap_or_default()
    }

    pub fn first_function(&self) -> &str {
        self.call_tree
            .as_ref()
            .and_then(CallTree::first_function)
            .unwrap_or_default()
    }

    /// Orders by fixture, then type parameter, then value parameter. A
    /// missing parameter sorts before any present one.
    pub fn compare(&self, other: &Self) -> Ordering {
        // `None < Some(_)` gives the absent-first rule.
        self.fixture
            .cmp(&other.fixture)
            .then_with(|| self.type_param.cmp(&other.type_param))
            .then_with(|| self.value_param.cmp(&other.value_param))
    }

    /// Test name without the `/N` instance suffix of parameterized tests.
    pub fn base_name(&self) -> &str {
        match self.name.find('/') {
            Some(pos) if pos > 0 => &self.name[..pos],
            _ => &self.name,
        }
    }

    /// Fixture with a trailing copy of the base name and `_` removed.
    pub fn base_fixture(&self) -> &str {
        let fixture = self
            .fixture
            .strip_suffix(self.base_name())
            .unwrap_or(&self.fixture);
        fixture.strip_suffix('_').unwrap_or(fixture)
    }

    pub fn short_name(&self) -> String {
        join_non_empty([self.base_name(), self.base_fixture()])
    }

    pub fn test_name(&self) -> String {
        format!("{}.{}", self.fixture, self.name)
    }

    pub fn param(&self) -> String {
        join_non_empty([
            self.type_param().unwrap_or_default(),
            self.value_param().unwrap_or_default(),
        ])
    }

    /// Empty only when no call tree was recorded.
    pub fn tree_text(&self) -> String {
        match &self.call_tree {
            Some(tree) => tree.text(),
            None => String::new(),
        }
    }

    pub fn ipp_functions_text(&self) -> String {
        self.ipp_functions()
            .iter()
            .map(|function| format!("{function}; "))
            .collect()
    }

    pub fn ipp_flag_text(&self) -> &'static str {
        match self.has_ipp_node() {
            Some(true) => "Yes",
            Some(false) => "No",
            None => "",
        }
    }

    pub fn first_function_text(&self) -> &str {
        self.first_function()
    }

    /// Display form of the IPP weight: empty when unknown, `,` as the
    /// decimal separator otherwise.
    pub fn total_ipp_weight_text(&self) -> String {
        if self.total_ipp_weight.starts_with(UNKNOWN_IPP_WEIGHT) {
            String::new()
        } else {
            self.total_ipp_weight.replace('.', ",")
        }
    }

    pub fn time_text(&self) -> String {
        self.metrics
            .get(Metric::Time)
            .map(|time| time.to_string())
            .unwrap_or_default()
    }

    /// One report line: identity, highlighted status and the gmean timing.
    pub fn dump(&self, unit: TimeUnit) -> String {
        format!(
            "{} ->\t\x1b[1;31m{}\x1b[0m = \t{:.2}{}",
            self,
            self.status,
            self.scaled(Metric::Gmean, unit).unwrap_or_default(),
            unit
        )
    }
}

impl fmt::Display for TestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = match &self.call_tree {
            Some(tree) => format!("\n{}", tree.text()),
            None => String::new(),
        };
        let ipp_flag = match self.has_ipp_node() {
            Some(true) => "\nTree has IPP\n",
            Some(false) => "\nTree has no IPP\n",
            None => "",
        };
        let weight = self.total_ipp_weight_text();

        f.write_str(&join_non_empty([
            self.base_name(),
            self.base_fixture(),
            self.type_param().unwrap_or_default(),
            self.value_param().unwrap_or_default(),
            tree.as_str(),
            ipp_flag,
            weight.as_str(),
        ]))
    }
}

/// Stable sort by [`TestRecord::compare`]; ties keep document order.
pub fn sort_records(records: &mut [TestRecord]) {
    records.sort_by(TestRecord::compare);
}

fn join_non_empty<'a, I: IntoIterator<Item = &'a str>>(parts: I) -> String {
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(JOIN_SEPARATOR)
}

fn non_empty_attribute(element: &TestCaseElement, name: &str) -> Option<String> {
    element
        .attribute(name)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

fn parse_metrics(
    element: &TestCaseElement,
    fixture: &str,
    name: &str,
) -> Result<Metrics, ParseError> {
    let mut metrics = Metrics::default();
    for metric in Metric::ALL {
        let Some(raw) = element.attribute(metric.attribute()) else {
            continue;
        };
        let value = metric
            .parse_value(raw)
            .ok_or_else(|| ParseError::InvalidMetric {
                test: format!("{fixture}.{name}"),
                attribute: metric.attribute(),
                kind: metric.kind(),
                value: raw.to_string(),
            })?;
        metrics.insert(metric, value);
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LogDocument;

    fn record(attributes: &str) -> TestRecord {
        try_record(&format!("<testcase {attributes}/>")).unwrap()
    }

    fn try_record(test_case: &str) -> Result<TestRecord, ParseError> {
        let xml = format!("<testsuites>{test_case}</testsuites>");
        let document = LogDocument::from_reader(xml.as_bytes())?;
        TestRecord::from_element(&document.test_cases()[0])
    }

    #[test]
    fn reads_identity_attributes() {
        let record = record(
            r#"classname="Size_Resize" name="resize/3" type_param="uchar" value_param="(640x480, 8UC1)" status="run""#,
        );
        assert_eq!(record.fixture(), "Size_Resize");
        assert_eq!(record.name(), "resize/3");
        assert_eq!(record.type_param(), Some("uchar"));
        assert_eq!(record.value_param(), Some("(640x480, 8UC1)"));
        assert_eq!(record.status(), &TestStatus::Run);
        assert_eq!(record.test_name(), "Size_Resize.resize/3");
    }

    #[test]
    fn status_defaults_to_attribute_or_empty() {
        assert_eq!(record(r#"name="a" status="notrun""#).status(), &TestStatus::NotRun);
        assert_eq!(
            record(r#"name="a""#).status(),
            &TestStatus::Other(String::new())
        );
    }

    #[test]
    fn custom_status_wins_over_failures() {
        let record = try_record(
            r#"<testcase name="a" status="run" custom_status="skipped"><failure/></testcase>"#,
        )
        .unwrap();
        assert_eq!(record.status().as_str(), "skipped");
    }

    #[test]
    fn failure_child_forces_failed() {
        let record =
            try_record(r#"<testcase name="a" status="run"><failure message="x"/></testcase>"#)
                .unwrap();
        assert_eq!(record.status(), &TestStatus::Failed);

        let record = try_record(
            r#"<testcase name="a" status="run" custom_status=""><failure/></testcase>"#,
        )
        .unwrap();
        assert_eq!(record.status(), &TestStatus::Failed);
    }

    #[test]
    fn disabled_prefix_is_stripped() {
        let record = try_record(
            r#"<testcase classname="DISABLED_Core" name="DISABLED_sum" custom_status="x"><failure/></testcase>"#,
        )
        .unwrap();
        assert_eq!(record.status(), &TestStatus::Disabled);
        assert_eq!(record.name(), "sum");
        assert_eq!(record.fixture(), "Core");
    }

    #[test]
    fn disabled_prefix_only_stripped_at_start() {
        let inner = record(r#"classname="Core_DISABLED_x" name="DISABLED_y_DISABLED_z""#);
        assert_eq!(inner.status(), &TestStatus::Disabled);
        assert_eq!(inner.name(), "y_DISABLED_z");
        assert_eq!(inner.fixture(), "Core_DISABLED_x");
    }

    #[test]
    fn repeated_disabled_prefixes_are_all_stripped() {
        let repeated = record(r#"classname="DISABLED_DISABLED_C" name="DISABLED_DISABLED_y""#);
        assert_eq!(repeated.status(), &TestStatus::Disabled);
        assert_eq!(repeated.name(), "y");
        assert_eq!(repeated.fixture(), "C");
    }

    #[test]
    fn metrics_default_when_missing() {
        let record = record(r#"name="a" samples="10" mean="500000" frequency="1000000""#);
        assert_eq!(record.metric(Metric::Samples), MetricValue::Int(10));
        assert_eq!(record.metric(Metric::Outliers), MetricValue::Int(0));
        assert_eq!(record.metric(Metric::BytesIn), MetricValue::Long(0));
        assert_eq!(record.metric(Metric::Time), MetricValue::Float(0.0));
        assert_eq!(record.scaled(Metric::Mean, TimeUnit::Ms), Some(500.0));
        assert_eq!(record.scaled(Metric::Mean, TimeUnit::Ticks), Some(500_000.0));
        assert_eq!(record.scaled(Metric::Median, TimeUnit::Ms), None);
    }

    #[test]
    fn malformed_metric_is_an_error() {
        let err = try_record(r#"<testcase classname="F" name="a" samples="abc"/>"#).unwrap_err();
        assert!(err.is_invalid_metric());
        assert_eq!(
            err.to_string(),
            "attribute `samples` of test case `F.a` is not a valid integer: \"abc\""
        );
    }

    #[test]
    fn missing_weight_is_unknown() {
        let unknown = record(r#"name="a""#);
        assert_eq!(unknown.total_ipp_weight(), "-1");
        assert_eq!(unknown.total_ipp_weight_text(), "");

        let weighted = record(r#"name="a" total_ipp_weight="12.5""#);
        assert_eq!(weighted.total_ipp_weight(), "12.5");
        assert_eq!(weighted.total_ipp_weight_text(), "12,5");
    }

    #[test]
    fn call_tree_absent_versus_present() {
        let without = record(r#"name="a""#);
        assert_eq!(without.call_tree(), None);
        assert_eq!(without.has_ipp_node(), None);
        assert_eq!(without.ipp_flag_text(), "");
        assert!(without.call_tree_lines().is_empty());

        let with = record(r##"name="a" functions_hierarchy="#0main - C:1(#3ippsAdd - C:2""##);
        assert_eq!(with.has_ipp_node(), Some(true));
        assert_eq!(with.ipp_flag_text(), "Yes");
        assert_eq!(with.first_function_text(), "main");
        assert_eq!(with.ipp_functions_text(), "ippsAdd; ");
        assert_eq!(with.tree_text(), "main - C:1\n    [F_IPP] ippsAdd - C:2\n");

        let plain = record(r#"name="a" functions_hierarchy="main - C:1""#);
        assert_eq!(plain.has_ipp_node(), Some(false));
        assert_eq!(plain.ipp_flag_text(), "No");
    }

    #[test]
    fn names_drop_parameter_suffixes() {
        let record = record(r#"classname="Core_Add_add" name="add/2""#);
        assert_eq!(record.base_name(), "add");
        assert_eq!(record.base_fixture(), "Core_Add");
        assert_eq!(record.short_name(), "add::Core_Add");
    }

    #[test]
    fn param_joins_present_parts() {
        assert_eq!(record(r#"name="a" type_param="int""#).param(), "int");
        assert_eq!(
            record(r#"name="a" type_param="int" value_param="3""#).param(),
            "int::3"
        );
        assert_eq!(record(r#"name="a" type_param="""#).param(), "");
    }

    #[test]
    fn display_joins_non_empty_parts() {
        let plain = record(r#"classname="Core" name="sum" value_param="4" total_ipp_weight="1.5""#);
        assert_eq!(plain.to_string(), "sum::Core::4::1,5");

        let with_tree = record(r##"classname="Core" name="sum" functions_hierarchy="#0f""##);
        assert_eq!(with_tree.to_string(), "sum::Core::\nf\n::\nTree has no IPP\n");
    }

    #[test]
    fn empty_call_tree_is_still_rendered() {
        let empty_tree = record(r#"classname="Core" name="sum" functions_hierarchy="""#);
        assert_eq!(empty_tree.has_ipp_node(), Some(false));
        assert_eq!(empty_tree.tree_text(), "\n");
        assert_eq!(empty_tree.to_string(), "sum::Core::\n\n::\nTree has no IPP\n");

        let no_tree = record(r#"classname="Core" name="sum""#);
        assert_eq!(no_tree.tree_text(), "");
        assert_eq!(no_tree.to_string(), "sum::Core");
    }

    #[test]
    fn dump_reports_gmean_in_unit() {
        let record = record(r#"classname="Core" name="sum" status="run" gmean="2500" frequency="1000""#);
        assert_eq!(
            record.dump(TimeUnit::Ms),
            "sum::Core ->\t\x1b[1;31mrun\x1b[0m = \t2500.00ms"
        );
    }

    #[test]
    fn sorts_by_fixture_then_params() {
        let mut records = vec![
            record(r#"classname="B" name="1""#),
            record(r#"classname="A" name="2" type_param="int""#),
            record(r#"classname="A" name="3""#),
            record(r#"classname="A" name="4" value_param="x""#),
            record(r#"classname="A" name="5""#),
        ];
        sort_records(&mut records);

        let names: Vec<_> = records.iter().map(TestRecord::name).collect();
        assert_eq!(names, vec!["3", "5", "4", "2", "1"]);
    }

    #[test]
    fn compare_orders_present_params_lexicographically() {
        let a = record(r#"classname="A" type_param="float""#);
        let b = record(r#"classname="A" type_param="int""#);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a.clone()), Ordering::Equal);
    }
}
