//! The ingestion pipeline: parallel parse, fold-merge, filter, sort.
//!
//! Report files are independent, so they parse in parallel; every file
//! yields zero or more fragment models that are folded into one. The fold
//! and the final sort are the pipeline's only synchronization points.

use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::filters::ReportFilters;
use crate::formats::dispatcher::ReportDispatcher;
use crate::formats::IngestContext;
use crate::model::CoverageModel;

/// Options of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineOptions {
    /// Directories searched when a report omits source positions.
    pub source_directories: Vec<PathBuf>,
    pub filters: ReportFilters,
}

/// Parses all report files into one merged, filtered, sorted model.
///
/// Per-input failures are logged and skipped; with zero usable inputs the
/// result is simply empty (surfacing that is the caller's call).
pub fn collect_reports(report_files: &[PathBuf], options: &PipelineOptions) -> CoverageModel {
    let ctx = Arc::new(IngestContext::new(options.source_directories.clone()));
    let dispatcher = ReportDispatcher::new(Arc::clone(&ctx));
    let total = report_files.len();

    let fragments: Vec<CoverageModel> = report_files
        .par_iter()
        .enumerate()
        .map(|(index, file)| {
            log::info!("loading report {} ({}/{total})", file.display(), index + 1);

            let mut file_model = CoverageModel::empty();
            for parser in dispatcher.parsers_for_file(file) {
                match parser.parse() {
                    Ok(model) => file_model.merge(model),
                    Err(e) => log::error!(
                        "failed to parse {} fragment of {}: {e:#}",
                        parser.name(),
                        file.display()
                    ),
                }
            }
            file_model
        })
        .collect();

    let mut model = fragments
        .into_iter()
        .fold(CoverageModel::empty(), |mut merged, fragment| {
            merged.merge(fragment);
            merged
        });

    for directory in &options.source_directories {
        model.add_source_directory(directory.clone());
    }

    model.apply_filters(&options.filters);
    model.finish();
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filter;
    use indoc::indoc;
    use std::io::Write;

    fn write_report(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    const COBERTURA_A: &str = indoc! {r#"
        <coverage line-rate="1">
          <packages>
            <package name="calc">
              <classes>
                <class name="calc::Calc" filename="/work/src/calc.rs">
                  <lines><line number="3" hits="1"/><line number="4" hits="0"/></lines>
                </class>
              </classes>
            </package>
          </packages>
        </coverage>
    "#};

    const COBERTURA_B: &str = indoc! {r#"
        <coverage line-rate="1">
          <packages>
            <package name="calc">
              <classes>
                <class name="calc::Calc" filename="/work/src/calc.rs">
                  <lines><line number="4" hits="2"/></lines>
                </class>
                <class name="calc::Extra" filename="/work/src/extra.rs">
                  <lines><line number="1" hits="1"/></lines>
                </class>
              </classes>
            </package>
          </packages>
        </coverage>
    "#};

    #[test]
    fn test_collects_and_merges_multiple_reports() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = vec![
            write_report(&dir, "a.xml", COBERTURA_A),
            write_report(&dir, "b.xml", COBERTURA_B),
        ];

        let model = collect_reports(&files, &PipelineOptions::default());

        let assembly = model.assembly("calc").unwrap();
        assert_eq!(assembly.classes().len(), 2);

        // Line 4 was uncovered in run A and covered in run B.
        let calc = assembly.class("calc::Calc").unwrap();
        assert_eq!(calc.covered_lines(), 2);
        assert_eq!(calc.coverable_lines(), 2);
    }

    #[test]
    fn test_broken_input_does_not_abort_batch() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = vec![
            write_report(&dir, "broken.xml", "<coverage line-rate='1'><oops"),
            write_report(&dir, "good.xml", COBERTURA_A),
            dir.path().join("missing.xml"),
        ];

        let model = collect_reports(&files, &PipelineOptions::default());

        assert_eq!(model.assemblies().len(), 1);
        assert!(model.assembly("calc").is_some());
    }

    #[test]
    fn test_filters_are_applied_after_merge() {
        let dir = tempfile::TempDir::new().unwrap();
        let files = vec![write_report(&dir, "b.xml", COBERTURA_B)];

        let options = PipelineOptions {
            source_directories: Vec::new(),
            filters: ReportFilters {
                class: Filter::new(&["-calc::Extra"]).unwrap(),
                ..ReportFilters::default()
            },
        };
        let model = collect_reports(&files, &options);

        let assembly = model.assembly("calc").unwrap();
        assert_eq!(assembly.classes().len(), 1);
        assert!(assembly.class("calc::Extra").is_none());
    }

    #[test]
    fn test_zero_usable_inputs_yield_empty_model() {
        let model = collect_reports(
            &[PathBuf::from("/does/not/exist.xml")],
            &PipelineOptions::default(),
        );
        assert!(model.assemblies().is_empty());
    }
}
