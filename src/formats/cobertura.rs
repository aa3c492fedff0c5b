//! Cobertura XML reports (grcov, cargo-tarpaulin, gcovr, llvm-cov).
//!
//! Root marker: `coverage` element with a `line-rate` attribute.

use anyhow::Result;

use super::document::XmlElement;
use super::preprocess::{
    dominant_member, is_synthetic_class_name, logical_owner, resolve_against_roots,
};
use super::{IngestContext, ReportParser};
use crate::model::{
    crap_score, Assembly, Branch, Class, CodeFile, CoverageModel, LineVisitStatus, Metric,
    MethodMetric,
};

/// Rewrites declared file names against the report's `<sources>` roots and
/// folds compiler-synthesized wrapper classes into their logical owners.
pub fn preprocess(fragment: &mut XmlElement, _ctx: &IngestContext) {
    resolve_source_roots(fragment);
    fold_synthetic_classes(fragment);
}

fn resolve_source_roots(fragment: &mut XmlElement) {
    let roots: Vec<String> = fragment
        .child("sources")
        .map(|sources| {
            sources
                .children_named("source")
                .map(|s| s.text.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if roots.is_empty() {
        return;
    }

    fragment.for_each_descendant_mut("class", &mut |class| {
        if let Some(declared) = class.attr("filename").map(str::to_string) {
            let resolved = resolve_against_roots(&roots, &declared);
            class.set_attr("filename", &resolved);
        }
    });
}

fn fold_synthetic_classes(fragment: &mut XmlElement) {
    fragment.for_each_descendant_mut("classes", &mut |classes| {
        for class in classes.children_named_mut("class") {
            let Some(name) = class.attr("name").map(str::to_string) else {
                continue;
            };
            if !is_synthetic_class_name(&name) {
                continue;
            }

            let member_counts: Vec<(String, usize)> = class
                .child("methods")
                .map(|methods| {
                    methods
                        .children_named("method")
                        .filter_map(|m| {
                            let member = m.attr("name")?;
                            let entries = m.child("lines").map_or(0, |l| l.children.len());
                            Some((member.to_string(), entries))
                        })
                        .collect()
                })
                .unwrap_or_default();

            match logical_owner(&name, dominant_member(&member_counts)) {
                Some(owner) => {
                    log::debug!("folding synthetic class '{name}' into '{owner}'");
                    class.set_attr("name", &owner);
                }
                None => log::debug!("synthetic class '{name}' has no recoverable owner"),
            }
        }
    });
}

/// Parser for one preprocessed Cobertura fragment.
pub struct CoberturaParser {
    fragment: XmlElement,
}

impl CoberturaParser {
    pub fn new(fragment: XmlElement) -> Self {
        Self { fragment }
    }
}

impl ReportParser for CoberturaParser {
    fn name(&self) -> &'static str {
        "Cobertura"
    }

    fn supports_branch_coverage(&self) -> bool {
        true
    }

    fn parse(&self) -> Result<CoverageModel> {
        let mut model = CoverageModel::new(self.name(), self.supports_branch_coverage());

        for package in self.fragment.descendants("package") {
            let assembly_name = package.attr("name").unwrap_or("default");
            let mut assembly = Assembly::new(assembly_name);

            for class_el in package.descendants("class") {
                if let Some(class) = self.extract_class(class_el, assembly_name) {
                    assembly.add_class(class);
                }
            }

            model.add_assembly(assembly);
        }

        Ok(model)
    }
}

impl CoberturaParser {
    fn extract_class(&self, class_el: &XmlElement, assembly_name: &str) -> Option<Class> {
        let name = class_el.attr("name")?;
        let mut class = Class::new(name, assembly_name);

        let line_elements: Vec<&XmlElement> = class_el
            .child("lines")
            .map(|lines| lines.children_named("line").collect())
            .unwrap_or_default();

        if let Some(filename) = class_el.attr("filename") {
            let mut file = CodeFile::new(filename);
            for line_el in &line_elements {
                record_line(&mut file, line_el);
            }
            class.add_file(file);
        }

        if line_elements.is_empty() {
            // No line data; keep the declared ratio so the class still
            // reports a quota.
            class.set_coverage_quota(attr_f64(class_el, "line-rate").map(|r| (r * 1000.0).trunc() / 10.0));
        }

        if let Some(methods) = class_el.child("methods") {
            for method_el in methods.children_named("method") {
                if let Some(metric) = extract_method(method_el) {
                    class.add_method_metric(metric);
                }
            }
        }

        Some(class)
    }
}

fn record_line(file: &mut CodeFile, line_el: &XmlElement) {
    let Some(number) = attr_u32(line_el, "number") else {
        return;
    };
    let hits = attr_f64(line_el, "hits").unwrap_or(0.0) as i64;

    let condition = line_el
        .attr("condition-coverage")
        .and_then(parse_condition_coverage);

    let status = match (hits > 0, condition) {
        (false, _) => LineVisitStatus::NotCovered,
        (true, Some((covered, total))) if covered < total => LineVisitStatus::PartiallyCovered,
        (true, _) => LineVisitStatus::Covered,
    };

    file.record_line(number, hits, status);

    if let Some((covered, total)) = condition {
        for branch in 0..total {
            let visits = u64::from(branch < covered);
            file.record_branch(number, Branch::new(&format!("{number}_{branch}"), visits));
        }
    }
}

fn extract_method(method_el: &XmlElement) -> Option<MethodMetric> {
    let name = method_el.attr("name")?;
    let signature = method_el.attr("signature").unwrap_or("");
    let full_name = format!("{name}{signature}");
    let short_name = name.rsplit("::").next().unwrap_or(name);

    let mut metric = MethodMetric::new(&full_name, short_name);
    metric.line = method_el
        .child("lines")
        .and_then(|lines| lines.children_named("line").next())
        .and_then(|line| attr_u32(line, "number"));

    let complexity = attr_f64(method_el, "complexity");
    let line_coverage = attr_f64(method_el, "line-rate").map(|r| r * 100.0);
    let branch_coverage = attr_f64(method_el, "branch-rate").map(|r| r * 100.0);

    metric.add_metric(Metric::cyclomatic_complexity(complexity));
    if let (Some(complexity), Some(coverage)) = (complexity, line_coverage) {
        metric.add_metric(Metric::crap_score(Some(crap_score(complexity, coverage))));
    }
    metric.add_metric(Metric::line_coverage(line_coverage));
    metric.add_metric(Metric::branch_coverage(branch_coverage));

    Some(metric)
}

/// Parses `condition-coverage="50% (1/2)"` into `(covered, total)`.
fn parse_condition_coverage(value: &str) -> Option<(u32, u32)> {
    let open = value.find('(')?;
    let close = value.find(')')?;
    let (covered, total) = value.get(open + 1..close)?.split_once('/')?;
    Some((covered.trim().parse().ok()?, total.trim().parse().ok()?))
}

fn attr_f64(element: &XmlElement, name: &str) -> Option<f64> {
    element.attr(name).and_then(|v| v.trim().parse().ok())
}

fn attr_u32(element: &XmlElement, name: &str) -> Option<u32> {
    element.attr(name).and_then(|v| v.trim().parse().ok())
}
