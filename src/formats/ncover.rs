//! NCover-style profiler reports (legacy).
//!
//! Root marker: `coverage` element with a `profilerVersion` attribute —
//! checked before Cobertura, which uses the same root element name. Sequence
//! points only, no branch data, no quality metrics beyond visit ratios.

use anyhow::Result;

use super::document::XmlElement;
use super::ReportParser;
use crate::common;
use crate::model::{
    Assembly, Class, CodeFile, CoverageModel, LineVisitStatus, Metric, MethodMetric,
};

/// Parser for one NCover fragment. The format carries absolute document
/// paths already, so there is no preprocessing step.
pub struct NCoverParser {
    fragment: XmlElement,
}

impl NCoverParser {
    pub fn new(fragment: XmlElement) -> Self {
        Self { fragment }
    }
}

impl ReportParser for NCoverParser {
    fn name(&self) -> &'static str {
        "NCover"
    }

    fn supports_branch_coverage(&self) -> bool {
        false
    }

    fn parse(&self) -> Result<CoverageModel> {
        let mut model = CoverageModel::new(self.name(), self.supports_branch_coverage());

        for module in self.fragment.children_named("module") {
            let Some(assembly_name) = module.attr("name").or_else(|| module.attr("assembly"))
            else {
                continue;
            };
            let mut assembly = Assembly::new(assembly_name);

            for method in module.children_named("method") {
                if method.attr("excluded") == Some("true") {
                    continue;
                }
                let (Some(class_name), Some(method_name)) =
                    (method.attr("class"), method.attr("name"))
                else {
                    continue;
                };

                let mut class = Class::new(class_name, assembly_name);
                extract_method(&mut class, class_name, method_name, method);
                assembly.add_class(class);
            }

            model.add_assembly(assembly);
        }

        Ok(model)
    }
}

fn extract_method(
    class: &mut Class,
    class_name: &str,
    method_name: &str,
    method_el: &XmlElement,
) {
    let points: Vec<&XmlElement> = method_el
        .children_named("seqpnt")
        .filter(|p| p.attr("excluded") != Some("true"))
        .collect();

    let mut visited = 0usize;
    let mut first_line: Option<u32> = None;

    for point in &points {
        let Some(line) = attr_u32(point, "line") else {
            continue;
        };
        let end = attr_u32(point, "endline").unwrap_or(line).max(line);
        let visits = point
            .attr("visitcount")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);

        first_line = first_line.or(Some(line));
        if visits > 0 {
            visited += 1;
        }

        let Some(document) = point.attr("document") else {
            continue;
        };

        let mut file = CodeFile::new(document);
        let status = if visits > 0 {
            LineVisitStatus::Covered
        } else {
            LineVisitStatus::NotCovered
        };
        for current in line..=end {
            file.record_line(current, visits, status);
        }
        class.add_file(file);
    }

    let full_name = format!(
        "{}::{}",
        crate::model::normalize_class_name(class_name),
        method_name
    );
    let mut metric = MethodMetric::new(&full_name, method_name);
    metric.line = first_line;
    metric.add_metric(Metric::sequence_coverage(common::coverage_percent(
        visited,
        points.len(),
    )));
    class.add_method_metric(metric);
}

fn attr_u32(element: &XmlElement, name: &str) -> Option<u32> {
    element.attr(name).and_then(|v| v.trim().parse().ok())
}
