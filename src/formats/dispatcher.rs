//! Format detection and parser fan-out.
//!
//! Detection runs over root markers in priority order. Legacy markers come
//! first: NCover and Cobertura share the `coverage` root element and are
//! told apart by their attributes, so the more specific legacy check has to
//! win. Text documents are probed for LCOV records.
//!
//! Every fragment of a recognized document yields one parser, preprocessed
//! and ready to run. Unreadable or unrecognized documents yield zero parsers
//! and a log line; they never abort the surrounding batch.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::document::{parse_fragments, XmlElement};
use super::{cobertura, lcov, ncover, opencover, visualstudio};
use super::{IngestContext, ReportParser};

/// Selects preprocessor and parser for each report document.
pub struct ReportDispatcher {
    ctx: Arc<IngestContext>,
}

impl ReportDispatcher {
    pub fn new(ctx: Arc<IngestContext>) -> Self {
        Self { ctx }
    }

    /// One ready-to-run parser per recognized fragment of the document.
    ///
    /// Failures are logged and produce an empty list so the caller can
    /// continue with its remaining inputs.
    pub fn parsers_for_file(&self, path: &Path) -> Vec<Box<dyn ReportParser>> {
        match self.try_parsers(path) {
            Ok(parsers) => {
                if parsers.is_empty() {
                    log::warn!("unrecognized report format: {}", path.display());
                }
                parsers
            }
            Err(e) => {
                log::error!("cannot read report {}: {e:#}", path.display());
                Vec::new()
            }
        }
    }

    fn try_parsers(&self, path: &Path) -> Result<Vec<Box<dyn ReportParser>>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;

        let first_line = content
            .lines()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("");

        if first_line.trim_start().starts_with('<') {
            self.xml_parsers(path, &content)
        } else {
            Ok(self.text_parsers(path, content))
        }
    }

    fn xml_parsers(&self, path: &Path, content: &str) -> Result<Vec<Box<dyn ReportParser>>> {
        let mut parsers: Vec<Box<dyn ReportParser>> = Vec::new();

        let sessions = parse_fragments(content, "CoverageSession")?;
        if !sessions.is_empty() {
            for mut fragment in sessions {
                log::debug!("preprocessing OpenCover fragment of {}", path.display());
                opencover::preprocess(&mut fragment, &self.ctx);
                parsers.push(Box::new(opencover::OpenCoverParser::new(fragment)));
            }
            return Ok(parsers);
        }

        let datasets = parse_fragments(content, "CoverageDSPriv")?;
        if !datasets.is_empty() {
            for mut fragment in datasets {
                log::debug!("preprocessing VisualStudio fragment of {}", path.display());
                visualstudio::preprocess(&mut fragment, &self.ctx);
                parsers.push(Box::new(visualstudio::VisualStudioParser::new(fragment)));
            }
            return Ok(parsers);
        }

        for fragment in parse_fragments(content, "coverage")? {
            // Legacy marker first: NCover and Cobertura collide on the root
            // element name.
            if fragment.attr("profilerVersion").is_some() {
                log::debug!("initiating NCover parser for {}", path.display());
                parsers.push(Box::new(ncover::NCoverParser::new(fragment)));
            } else if is_cobertura(&fragment) {
                let mut fragment = fragment;
                log::debug!("preprocessing Cobertura fragment of {}", path.display());
                cobertura::preprocess(&mut fragment, &self.ctx);
                parsers.push(Box::new(cobertura::CoberturaParser::new(fragment)));
            }
        }

        Ok(parsers)
    }

    fn text_parsers(&self, path: &Path, content: String) -> Vec<Box<dyn ReportParser>> {
        let looks_like_lcov = content
            .lines()
            .take(10)
            .any(|line| line.starts_with("SF:") || line.starts_with("TN:"));

        if !looks_like_lcov {
            return Vec::new();
        }

        vec![Box::new(lcov::LcovParser::new(path, content))]
    }
}

fn is_cobertura(fragment: &XmlElement) -> bool {
    fragment.attr("line-rate").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn dispatcher() -> ReportDispatcher {
        ReportDispatcher::new(Arc::new(IngestContext::default()))
    }

    fn report_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_detects_opencover() {
        let file = report_file("<CoverageSession><Modules/></CoverageSession>");
        let parsers = dispatcher().parsers_for_file(file.path());
        assert_eq!(parsers.len(), 1);
        assert_eq!(parsers[0].name(), "OpenCover");
        assert!(parsers[0].supports_branch_coverage());
    }

    #[test]
    fn test_detects_visualstudio() {
        let file = report_file("<CoverageDSPriv></CoverageDSPriv>");
        let parsers = dispatcher().parsers_for_file(file.path());
        assert_eq!(parsers.len(), 1);
        assert_eq!(parsers[0].name(), "VisualStudio");
        assert!(!parsers[0].supports_branch_coverage());
    }

    #[test]
    fn test_ncover_marker_wins_over_generic_coverage_root() {
        let file = report_file(r#"<coverage profilerVersion="1.5.8"><module name="m"/></coverage>"#);
        let parsers = dispatcher().parsers_for_file(file.path());
        assert_eq!(parsers.len(), 1);
        assert_eq!(parsers[0].name(), "NCover");
    }

    #[test]
    fn test_detects_cobertura() {
        let file = report_file(r#"<coverage line-rate="0.5"><packages/></coverage>"#);
        let parsers = dispatcher().parsers_for_file(file.path());
        assert_eq!(parsers.len(), 1);
        assert_eq!(parsers[0].name(), "Cobertura");
    }

    #[test]
    fn test_detects_lcov_text() {
        let file = report_file("TN:\nSF:/work/src/lib.rs\nDA:1,1\nend_of_record\n");
        let parsers = dispatcher().parsers_for_file(file.path());
        assert_eq!(parsers.len(), 1);
        assert_eq!(parsers[0].name(), "LCov");
    }

    #[test]
    fn test_multiple_fragments_yield_multiple_parsers() {
        let content = indoc! {r#"
            <merged>
              <CoverageSession><Modules/></CoverageSession>
              <CoverageSession><Modules/></CoverageSession>
            </merged>
        "#};
        let file = report_file(content);
        let parsers = dispatcher().parsers_for_file(file.path());
        assert_eq!(parsers.len(), 2);
    }

    #[test]
    fn test_missing_file_yields_zero_parsers() {
        let parsers = dispatcher().parsers_for_file(Path::new("/no/such/report.xml"));
        assert!(parsers.is_empty());
    }

    #[test]
    fn test_invalid_xml_yields_zero_parsers() {
        let file = report_file("<coverage line-rate=\"1\"><unclosed></coverage>");
        let parsers = dispatcher().parsers_for_file(file.path());
        assert!(parsers.is_empty());
    }

    #[test]
    fn test_unknown_schema_yields_zero_parsers() {
        let file = report_file("<somethingElse/>");
        let parsers = dispatcher().parsers_for_file(file.path());
        assert!(parsers.is_empty());

        let file = report_file("plain text, not a report");
        let parsers = dispatcher().parsers_for_file(file.path());
        assert!(parsers.is_empty());
    }
}
