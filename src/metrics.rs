use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};

/// Numeric type a metric attribute is parsed as.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MetricKind {
    Long,
    Int,
    Float,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Long => write!(f, "64-bit integer"),
            MetricKind::Int => write!(f, "integer"),
            MetricKind::Float => write!(f, "floating point number"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    BytesIn,
    BytesOut,
    Samples,
    Outliers,
    Frequency,
    Min,
    Median,
    Gmean,
    Mean,
    Stddev,
    Gstddev,
    Time,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::BytesIn,
        Metric::BytesOut,
        Metric::Samples,
        Metric::Outliers,
        Metric::Frequency,
        Metric::Min,
        Metric::Median,
        Metric::Gmean,
        Metric::Mean,
        Metric::Stddev,
        Metric::Gstddev,
        Metric::Time,
    ];

    /// Name of the `testcase` attribute holding this metric.
    pub fn attribute(self) -> &'static str {
        match self {
            Metric::BytesIn => "bytesIn",
            Metric::BytesOut => "bytesOut",
            Metric::Samples => "samples",
            Metric::Outliers => "outliers",
            Metric::Frequency => "frequency",
            Metric::Min => "min",
            Metric::Median => "median",
            Metric::Gmean => "gmean",
            Metric::Mean => "mean",
            Metric::Stddev => "stddev",
            Metric::Gstddev => "gstddev",
            Metric::Time => "time",
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            Metric::BytesIn
            | Metric::BytesOut
            | Metric::Min
            | Metric::Median
            | Metric::Gmean
            | Metric::Mean
            | Metric::Stddev => MetricKind::Long,
            Metric::Samples | Metric::Outliers => MetricKind::Int,
            Metric::Frequency | Metric::Gstddev | Metric::Time => MetricKind::Float,
        }
    }

    /// Timing metrics are stored in ticks and convert to wall-clock units.
    pub fn is_timing(self) -> bool {
        matches!(
            self,
            Metric::Min | Metric::Median | Metric::Gmean | Metric::Mean | Metric::Stddev
        )
    }

    pub fn default_value(self) -> MetricValue {
        match self {
            Metric::Frequency => MetricValue::Float(1.0),
            metric => match metric.kind() {
                MetricKind::Long => MetricValue::Long(0),
                MetricKind::Int => MetricValue::Int(0),
                MetricKind::Float => MetricValue::Float(0.0),
            },
        }
    }

    /// Parses a raw attribute value as this metric's kind.
    pub fn parse_value(self, raw: &str) -> Option<MetricValue> {
        let raw = raw.trim();
        match self.kind() {
            MetricKind::Long => raw.parse().ok().map(MetricValue::Long),
            MetricKind::Int => raw.parse().ok().map(MetricValue::Int),
            MetricKind::Float => raw.parse().ok().map(MetricValue::Float),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MetricValue {
    Long(i64),
    Int(i32),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Long(v) => v as f64,
            MetricValue::Int(v) => f64::from(v),
            MetricValue::Float(v) => v,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Long(v) => write!(f, "{}", v),
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{:?}", v),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Long(v) => serializer.serialize_i64(*v),
            MetricValue::Int(v) => serializer.serialize_i32(*v),
            MetricValue::Float(v) => serializer.serialize_f64(*v),
        }
    }
}

/// Units a timing metric can be reported in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TimeUnit {
    #[default]
    Ms,
    Mks,
    Ns,
    Ticks,
}

impl TimeUnit {
    fn scale(self) -> f64 {
        match self {
            TimeUnit::Ms => 1_000.0,
            TimeUnit::Mks => 1_000_000.0,
            TimeUnit::Ns => 1_000_000_000.0,
            TimeUnit::Ticks => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Ms => "ms",
            TimeUnit::Mks => "mks",
            TimeUnit::Ns => "ns",
            TimeUnit::Ticks => "ticks",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics present on a test case. Absent metrics are not stored, so a
/// measured zero stays distinguishable from a missing attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metrics {
    values: BTreeMap<Metric, MetricValue>,
}

impl Metrics {
    pub fn insert(&mut self, metric: Metric, value: MetricValue) {
        self.values.insert(metric, value);
    }

    pub fn get(&self, metric: Metric) -> Option<MetricValue> {
        self.values.get(&metric).copied()
    }

    /// The stored value, or the metric's default when the attribute was absent.
    pub fn value_or_default(&self, metric: Metric) -> MetricValue {
        self.get(metric).unwrap_or_else(|| metric.default_value())
    }

    /// Ticks per second; 1 when unset or zero.
    pub fn frequency(&self) -> f64 {
        match self.get(Metric::Frequency) {
            Some(value) if !value.is_zero() => value.as_f64(),
            _ => 1.0,
        }
    }

    /// Reads a metric, converting timing metrics from ticks to `unit`.
    /// Returns `None` when the metric was not recorded.
    pub fn scaled(&self, metric: Metric, unit: TimeUnit) -> Option<f64> {
        let value = self.get(metric)?.as_f64();
        if !metric.is_timing() || unit == TimeUnit::Ticks {
            return Some(value);
        }
        Some(value * unit.scale() / self.frequency())
    }
}
