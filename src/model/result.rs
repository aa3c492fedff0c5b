//! The aggregate coverage model a pipeline run produces.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::assembly::Assembly;
use crate::filters::ReportFilters;

/// The merged result of one or more parsed report fragments.
///
/// Fragments are folded in with [`CoverageModel::merge`]; after the fold the
/// caller sorts once via [`CoverageModel::finish`], which is the single
/// synchronization point of the parallel pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageModel {
    assemblies: Vec<Assembly>,
    /// Source directories collected from reports that declare them.
    source_directories: BTreeSet<PathBuf>,
    /// Names of the parsers that contributed fragments.
    used_parsers: BTreeSet<String>,
    supports_branch_coverage: bool,
}

impl CoverageModel {
    pub fn new(parser_name: &str, supports_branch_coverage: bool) -> Self {
        let mut used_parsers = BTreeSet::new();
        used_parsers.insert(parser_name.to_string());
        Self {
            assemblies: Vec::new(),
            source_directories: BTreeSet::new(),
            used_parsers,
            supports_branch_coverage,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn assemblies(&self) -> &[Assembly] {
        &self.assemblies
    }

    pub fn assembly(&self, name: &str) -> Option<&Assembly> {
        self.assemblies.iter().find(|a| a.name() == name)
    }

    pub fn supports_branch_coverage(&self) -> bool {
        self.supports_branch_coverage
    }

    pub fn used_parsers(&self) -> impl Iterator<Item = &str> {
        self.used_parsers.iter().map(|s| s.as_str())
    }

    pub fn source_directories(&self) -> impl Iterator<Item = &PathBuf> {
        self.source_directories.iter()
    }

    pub fn add_source_directory(&mut self, dir: PathBuf) {
        self.source_directories.insert(dir);
    }

    /// Adds an assembly, merging into an existing one with the same name.
    pub fn add_assembly(&mut self, assembly: Assembly) {
        match self
            .assemblies
            .iter_mut()
            .find(|a| a.name() == assembly.name())
        {
            Some(existing) => existing.merge(assembly),
            None => self.assemblies.push(assembly),
        }
    }

    /// Folds `other` into `self`. Associative over fragment lists; merging an
    /// empty model is the identity.
    pub fn merge(&mut self, other: CoverageModel) {
        self.supports_branch_coverage |= other.supports_branch_coverage;
        self.used_parsers.extend(other.used_parsers);
        self.source_directories.extend(other.source_directories);

        for assembly in other.assemblies {
            self.add_assembly(assembly);
        }
    }

    /// Drops assemblies, classes and files the filters exclude.
    pub fn apply_filters(&mut self, filters: &ReportFilters) {
        self.assemblies
            .retain(|a| filters.assembly.is_included(a.name()));

        for assembly in &mut self.assemblies {
            assembly.retain_classes(|c| filters.class.is_included(c.name()));
            assembly.retain_files(|path| filters.file.is_included(path));
        }
    }

    /// Final deterministic sort by assembly name (then class name, then file
    /// path). Call once, after all fragments are merged.
    pub fn finish(&mut self) {
        for assembly in &mut self.assemblies {
            assembly.sort_classes();
        }
        self.assemblies.sort_by(|a, b| a.name().cmp(b.name()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::class::Class;

    fn model_with(assembly: &str, classes: &[&str]) -> CoverageModel {
        let mut model = CoverageModel::new("Test", false);
        let mut asm = Assembly::new(assembly);
        for class in classes {
            asm.add_class(Class::new(class, assembly));
        }
        model.add_assembly(asm);
        model
    }

    #[test]
    fn test_merge_empty_is_identity() {
        let mut target = model_with("lib", &["a::A", "a::B"]);
        target.merge(CoverageModel::empty());

        assert_eq!(target.assemblies().len(), 1);
        assert_eq!(target.assemblies()[0].classes().len(), 2);
    }

    #[test]
    fn test_merge_is_grouping_insensitive() {
        let a = model_with("lib", &["a::A"]);
        let b = model_with("lib", &["a::B"]);
        let c = model_with("other", &["c::C"]);

        // (a + b) + c
        let mut left = a.clone();
        left.merge(b.clone());
        left.merge(c.clone());
        left.finish();

        // a + (b + c)
        let mut bc = b;
        bc.merge(c);
        let mut right = a;
        right.merge(bc);
        right.finish();

        let names = |m: &CoverageModel| -> Vec<(String, Vec<String>)> {
            m.assemblies()
                .iter()
                .map(|a| {
                    (
                        a.name().to_string(),
                        a.classes().iter().map(|c| c.name().to_string()).collect(),
                    )
                })
                .collect()
        };
        assert_eq!(names(&left), names(&right));
    }

    #[test]
    fn test_branch_support_is_sticky() {
        let mut target = CoverageModel::new("NCover", false);
        target.merge(CoverageModel::new("OpenCover", true));
        assert!(target.supports_branch_coverage());

        let parsers: Vec<&str> = target.used_parsers().collect();
        assert_eq!(parsers, vec!["NCover", "OpenCover"]);
    }

    #[test]
    fn test_finish_sorts_assemblies() {
        let mut model = model_with("zeta", &[]);
        model.merge(model_with("alpha", &[]));
        model.finish();

        let names: Vec<&str> = model.assemblies().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
