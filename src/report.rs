use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Serialize;

use crate::{
    error::MissingInputError,
    metrics::TimeUnit,
    record::TestRecord,
    run_info::{parse_log_file, TestRunInfo},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    path: &'a Path,
    properties: &'a BTreeMap<String, String>,
    tests: Vec<TestRecord>,
}

/// Resolves command line arguments to test log paths. Arguments naming an
/// existing path are taken as is, anything else is expanded as a glob.
pub fn expand_paths<T: AsRef<str>>(patterns: &[T]) -> anyhow::Result<Vec<PathBuf>> {
    if patterns.is_empty() {
        return Err(MissingInputError.into());
    }

    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if Path::new(pattern).exists() {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let mut matched = glob::glob(pattern)
            .with_context(|| format!("invalid path pattern {:?}", pattern))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("Skipping unreadable path: {}", e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();

        if matched.is_empty() {
            log::warn!("No test logs found matching {:?}", pattern);
            // Keep it so the missing file is reported when it is read.
            paths.push(PathBuf::from(pattern));
        } else {
            log::debug!("Pattern {:?} matched {} files", pattern, matched.len());
            paths.append(&mut matched);
        }
    }
    Ok(paths)
}

/// Writes parsed test runs to a text sink.
pub struct Reporter<W: Write> {
    out: W,
    format: OutputFormat,
    unit: TimeUnit,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat, unit: TimeUnit) -> Self {
        Self { out, format, unit }
    }

    pub fn report_file<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        log::info!("Processing {}", path.display());
        let run = parse_log_file(path)
            .with_context(|| format!("failed to parse test log {:?}", path))?;
        log::info!("Found {} tests in {}", run.len(), path.display());
        self.write_run(path, &run)
    }

    pub fn write_run(&mut self, path: &Path, run: &TestRunInfo) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Text => self.write_text(path, run)?,
            OutputFormat::Json => {
                let report = RunReport {
                    path,
                    properties: run.properties(),
                    tests: run.sorted_tests(),
                };
                serde_json::to_writer(&mut self.out, &report)?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    fn write_text(&mut self, path: &Path, run: &TestRunInfo) -> std::io::Result<()> {
        writeln!(self.out, "Processing {}...", path.display())?;
        writeln!(self.out, "Properties:")?;
        for (name, value) in run.properties() {
            writeln!(self.out, "\t{} = {}", name, value)?;
        }
        writeln!(self.out, "Tests:")?;
        for test in run.sorted_tests() {
            writeln!(self.out, "{}", test.dump(self.unit))?;
        }
        writeln!(self.out)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
