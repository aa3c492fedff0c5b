//! LCOV tracefiles (grcov, cargo-llvm-cov, geninfo).
//!
//! The only text-based schema: record lines like `SF:`, `DA:`, `BRDA:` and
//! `end_of_record`. One tracefile becomes one assembly; every source file
//! section becomes a class named after its module-like path.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lcov::{Reader, Record};

use super::ReportParser;
use crate::common;
use crate::model::{
    Assembly, Branch, Class, CodeFile, CoverageModel, LineVisitStatus, Metric, MethodMetric,
};

/// Parser for one LCOV tracefile.
pub struct LcovParser {
    report_path: PathBuf,
    content: String,
}

impl LcovParser {
    pub fn new(report_path: &Path, content: String) -> Self {
        Self {
            report_path: report_path.to_path_buf(),
            content,
        }
    }
}

impl ReportParser for LcovParser {
    fn name(&self) -> &'static str {
        "LCov"
    }

    fn supports_branch_coverage(&self) -> bool {
        true
    }

    fn parse(&self) -> Result<CoverageModel> {
        let mut model = CoverageModel::new(self.name(), self.supports_branch_coverage());
        let mut assembly = Assembly::new(&common::normalize_path(&self.report_path));

        let mut state: Option<SectionState> = None;

        for record in Reader::new(self.content.as_bytes()) {
            let record = record.context("invalid LCOV record")?;

            match record {
                Record::SourceFile { path } => {
                    state = Some(SectionState::new(path));
                }
                Record::FunctionName { name, start_line } => {
                    if let Some(state) = state.as_mut() {
                        state.functions.push((name, start_line));
                    }
                }
                Record::FunctionData { name, count } => {
                    if let Some(state) = state.as_mut() {
                        state.function_hits.insert(name, count);
                    }
                }
                Record::LineData { line, count, .. } => {
                    if let Some(state) = state.as_mut() {
                        *state.lines.entry(line).or_insert(0) += count;
                    }
                }
                Record::BranchData {
                    line,
                    block,
                    branch,
                    taken,
                } => {
                    if let Some(state) = state.as_mut() {
                        state
                            .branches
                            .entry(line)
                            .or_default()
                            .push((format!("{block}_{branch}"), taken.unwrap_or(0)));
                    }
                }
                Record::EndOfRecord => {
                    if let Some(state) = state.take() {
                        assembly.add_class(state.into_class(assembly.name()));
                    }
                }
                _ => {}
            }
        }

        // Tolerate tracefiles without a final end_of_record.
        if let Some(state) = state.take() {
            assembly.add_class(state.into_class(assembly.name()));
        }

        model.add_assembly(assembly);
        Ok(model)
    }
}

/// Buffered records of one `SF:` section.
struct SectionState {
    path: PathBuf,
    functions: Vec<(String, u32)>,
    function_hits: HashMap<String, u64>,
    lines: BTreeMap<u32, u64>,
    branches: BTreeMap<u32, Vec<(String, u64)>>,
}

impl SectionState {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            functions: Vec::new(),
            function_hits: HashMap::new(),
            lines: BTreeMap::new(),
            branches: BTreeMap::new(),
        }
    }

    fn into_class(self, assembly_name: &str) -> Class {
        let path_text = common::normalize_path(&self.path);
        let mut class = Class::new(&class_name_of(&path_text), assembly_name);
        let mut file = CodeFile::new(&path_text);

        for (&line, &count) in &self.lines {
            let status = if count == 0 {
                LineVisitStatus::NotCovered
            } else if self
                .branches
                .get(&line)
                .is_some_and(|branches| branches.iter().any(|(_, taken)| *taken == 0))
            {
                LineVisitStatus::PartiallyCovered
            } else {
                LineVisitStatus::Covered
            };
            file.record_line(line, count as i64, status);
        }

        for (&line, branches) in &self.branches {
            for (identifier, taken) in branches {
                file.record_branch(line, Branch::new(identifier, *taken));
            }
        }

        for metric in self.function_metrics() {
            class.add_method_metric(metric);
        }

        class.add_file(file);
        class
    }

    /// Function-level line coverage: a function's lines are the `DA` records
    /// between its start line and the next function's start.
    fn function_metrics(&self) -> Vec<MethodMetric> {
        let mut functions = self.functions.clone();
        functions.sort_by_key(|(_, start)| *start);

        let mut metrics = Vec::new();

        for (idx, (name, start)) in functions.iter().enumerate() {
            let end = functions
                .get(idx + 1)
                .map(|(_, next_start)| *next_start)
                .unwrap_or(u32::MAX);

            let in_range = self.lines.range(*start..end);
            let (mut covered, mut coverable) = (0usize, 0usize);
            for (_, &count) in in_range {
                coverable += 1;
                if count > 0 {
                    covered += 1;
                }
            }

            let short_name = name.rsplit("::").next().unwrap_or(name);
            let mut metric = MethodMetric::new(name, short_name);
            metric.line = Some(*start);
            metric.add_metric(Metric::line_coverage(common::coverage_percent(
                covered, coverable,
            )));

            // The hit count is informative on its own, e.g. for
            // never-executed functions that still have coverable lines.
            if let Some(&hits) = self.function_hits.get(name) {
                metric.add_metric(Metric::new(
                    "Function hits",
                    crate::model::MetricKind::Sumable,
                    Some(hits as f64),
                ));
            }

            metrics.push(metric);
        }

        metrics
    }
}

/// `/work/src/calc.rs` → `work::src::calc`.
fn class_name_of(path_text: &str) -> String {
    let path = Path::new(path_text);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_text.to_string());

    let parent = path
        .parent()
        .map(|d| d.to_string_lossy().replace('/', "::"))
        .unwrap_or_default();
    let parent = parent.trim_start_matches("::");

    if parent.is_empty() {
        stem
    } else {
        format!("{parent}::{stem}")
    }
}
