//! Classes: the unit the merge algebra and the filters operate on.

use serde::{Deserialize, Serialize};

use super::code_file::CodeFile;
use super::method_metric::MethodMetric;

/// A logical type. May span several physical files (inherent impl blocks in
/// separate files, generated code).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    /// Fully qualified name with `::` separators, the merge identity within
    /// an assembly.
    name: String,
    /// Name of the owning assembly (back-reference, not ownership).
    assembly_name: String,
    files: Vec<CodeFile>,
    method_metrics: Vec<MethodMetric>,
    /// Quota reported by formats without line data; overridden by the
    /// computed value as soon as files exist.
    declared_quota: Option<f64>,
}

impl Class {
    pub fn new(name: &str, assembly_name: &str) -> Self {
        Self {
            name: normalize_class_name(name),
            assembly_name: assembly_name.to_string(),
            files: Vec::new(),
            method_metrics: Vec::new(),
            declared_quota: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    pub(crate) fn set_assembly_name(&mut self, assembly_name: &str) {
        self.assembly_name = assembly_name.to_string();
    }

    pub fn files(&self) -> &[CodeFile] {
        &self.files
    }

    pub fn method_metrics(&self) -> &[MethodMetric] {
        &self.method_metrics
    }

    /// Adds a file, merging into an existing entry with the same path.
    pub fn add_file(&mut self, file: CodeFile) {
        match self.files.iter_mut().find(|f| f.path() == file.path()) {
            Some(existing) => existing.merge(file),
            None => self.files.push(file),
        }
    }

    /// Adds a method metric, merging into an existing entry with the same
    /// full name.
    pub fn add_method_metric(&mut self, metric: MethodMetric) {
        match self
            .method_metrics
            .iter_mut()
            .find(|m| m.full_name() == metric.full_name())
        {
            Some(existing) => existing.merge(metric),
            None => self.method_metrics.push(metric),
        }
    }

    pub fn set_coverage_quota(&mut self, quota: Option<f64>) {
        self.declared_quota = quota;
    }

    /// Computed from line data when files exist, otherwise the declared
    /// value.
    pub fn coverage_quota(&self) -> Option<f64> {
        if self.files.is_empty() {
            return self.declared_quota;
        }

        crate::common::coverage_percent(self.covered_lines(), self.coverable_lines())
    }

    pub fn covered_lines(&self) -> usize {
        self.files.iter().map(|f| f.covered_lines()).sum()
    }

    pub fn coverable_lines(&self) -> usize {
        self.files.iter().map(|f| f.coverable_lines()).sum()
    }

    pub fn covered_branches(&self) -> usize {
        self.files.iter().map(|f| f.covered_branches()).sum()
    }

    pub fn total_branches(&self) -> usize {
        self.files.iter().map(|f| f.total_branches()).sum()
    }

    /// Merges `other` into `self`: files union by path, method metrics union
    /// by full name, declared quota last-merge-wins.
    pub fn merge(&mut self, other: Class) {
        if other.declared_quota.is_some() {
            self.declared_quota = other.declared_quota;
        }

        for file in other.files {
            self.add_file(file);
        }

        for metric in other.method_metrics {
            self.add_method_metric(metric);
        }
    }

    pub(crate) fn retain_files(&mut self, keep: impl Fn(&str) -> bool) {
        self.files.retain(|f| keep(f.path()));
    }

    pub(crate) fn sort_files(&mut self) {
        self.files.sort_by(|a, b| a.path().cmp(b.path()));
    }
}

/// Class names arrive as `a.b.C`, `a::b::C` or `a/b/C` depending on the
/// producing tool; normalize them all to `::` separators.
pub fn normalize_class_name(name: &str) -> String {
    // `{{closure}}` and friends contain no separators, so plain replacement
    // is safe on rustc-generated names as well.
    name.replace('/', "::").replace('.', "::")
}
