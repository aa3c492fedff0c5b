//! Report format detection, preprocessing and parsing.
//!
//! Every supported schema provides a [`ReportParser`] implementation. The
//! [`dispatcher`] inspects a document's root markers, runs the matching
//! preprocessor over each fragment and yields one ready-to-run parser per
//! fragment. Parsers are pure extraction: by the time [`ReportParser::parse`]
//! runs, all path rewriting and position enrichment has already happened.

pub mod cobertura;
pub mod dispatcher;
pub mod document;
pub mod lcov;
pub mod ncover;
pub mod opencover;
pub mod preprocess;
pub mod visualstudio;

use std::path::PathBuf;

use anyhow::Result;

use crate::model::CoverageModel;
use crate::source::{ClassSearcherFactory, CompositeClassSearcher, SourcePositionResolver};

/// One parser instance bound to one preprocessed report fragment.
pub trait ReportParser: Send + Sync {
    /// Schema name, for logging and the `used_parsers` set.
    fn name(&self) -> &'static str;

    /// Whether this schema carries branch coverage (decides which metrics
    /// the parser produces).
    fn supports_branch_coverage(&self) -> bool;

    /// Extracts the fragment into a coverage model.
    fn parse(&self) -> Result<CoverageModel>;
}

/// Shared state of one ingestion run, passed through the pipeline instead of
/// living in process-wide singletons.
#[derive(Debug, Default)]
pub struct IngestContext {
    source_directories: Vec<PathBuf>,
    pub searcher_factory: ClassSearcherFactory,
    pub resolver: SourcePositionResolver,
}

impl IngestContext {
    pub fn new(source_directories: Vec<PathBuf>) -> Self {
        Self {
            source_directories,
            searcher_factory: ClassSearcherFactory::new(),
            resolver: SourcePositionResolver::new(),
        }
    }

    pub fn source_directories(&self) -> &[PathBuf] {
        &self.source_directories
    }

    /// The global source-search scope spanning all user-declared
    /// directories. Backed by the factory cache, so repeated calls reuse the
    /// per-directory indexes.
    pub fn global_searcher(&self) -> CompositeClassSearcher {
        self.searcher_factory
            .searcher_for_dirs(&self.source_directories)
    }
}
