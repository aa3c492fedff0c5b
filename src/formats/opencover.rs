//! OpenCover-style session reports.
//!
//! Root marker: `CoverageSession`. The richest schema: sequence points,
//! branch points and per-method quality metrics. Auto-properties and some
//! generated methods carry no file reference or sequence points; the
//! preprocessor recovers their positions from the real source tree.

use std::path::PathBuf;

use anyhow::Result;

use super::document::XmlElement;
use super::preprocess::{
    dominant_member, is_synthetic_class_name, logical_owner, PositionEnricher,
};
use super::{IngestContext, ReportParser};
use crate::common;
use crate::model::{
    crap_score, Assembly, Branch, Class, CodeFile, CoverageModel, LineVisitStatus, Metric,
    MethodMetric,
};
use crate::source::MemberSpec;

/// Injects missing file references and sequence points via the source
/// locator and position resolver, then folds synthetic wrapper classes into
/// their owners.
pub fn preprocess(fragment: &mut XmlElement, ctx: &IngestContext) {
    let enricher = PositionEnricher::new(ctx);

    fragment.for_each_descendant_mut("Module", &mut |module| {
        if module.attr("skippedDueTo").is_some() {
            return;
        }

        let module_files = module_file_paths(module);
        enrich_module(module, &module_files, &enricher);
        fold_synthetic_classes(module);
    });
}

fn module_file_paths(module: &XmlElement) -> Vec<PathBuf> {
    module
        .child("Files")
        .map(|files| {
            files
                .children_named("File")
                .filter_map(|f| f.attr("fullPath"))
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default()
}

struct Injection {
    class_name: String,
    method_name: String,
    start: u32,
    end: u32,
    file: String,
}

fn enrich_module(module: &mut XmlElement, module_files: &[PathBuf], enricher: &PositionEnricher) {
    // Collected first, applied second: applying rewrites the module's file
    // table, which must not happen while the classes are being iterated.
    let mut injections: Vec<Injection> = Vec::new();

    if let Some(classes) = module.child("Classes") {
        for class in classes.children_named("Class") {
            let Some(class_name) = class.child_text("FullName").map(str::to_string) else {
                continue;
            };

            let Some(methods) = class.child("Methods") else {
                continue;
            };

            for method in methods.children_named("Method") {
                if !needs_position(method) {
                    continue;
                }
                let Some(name) = method.child_text("Name").map(str::to_string) else {
                    continue;
                };
                let Some(member) = member_spec(method, &name) else {
                    continue;
                };

                if let Some((file, span)) = enricher.resolve(&class_name, &member, module_files) {
                    injections.push(Injection {
                        class_name: class_name.clone(),
                        method_name: name,
                        start: span.start,
                        end: span.end,
                        file: common::normalize_path(&file),
                    });
                }
            }
        }
    }

    for injection in injections {
        apply_injection(module, injection);
    }
}

fn apply_injection(module: &mut XmlElement, injection: Injection) {
    let uid = ensure_file_entry(module, &injection.file);

    let Some(classes) = module.child_mut("Classes") else {
        return;
    };
    let Some(class) = classes
        .children_named_mut("Class")
        .find(|c| c.child_text("FullName") == Some(injection.class_name.as_str()))
    else {
        return;
    };
    let Some(methods) = class.child_mut("Methods") else {
        return;
    };
    let Some(method) = methods
        .children_named_mut("Method")
        .find(|m| m.child_text("Name") == Some(injection.method_name.as_str()))
    else {
        return;
    };

    let visits = method
        .child("MethodPoint")
        .and_then(|p| p.attr("vc"))
        .unwrap_or("0")
        .to_string();

    if method.child("FileRef").is_none() {
        method.push_child(XmlElement::new("FileRef").with_attr("uid", &uid));
    }

    if method.child("SequencePoints").is_none() {
        method.push_child(XmlElement::new("SequencePoints"));
    }
    let sequence_points = method.child_mut("SequencePoints").expect("just inserted");
    if sequence_points.children.is_empty() {
        sequence_points.push_child(
            XmlElement::new("SequencePoint")
                .with_attr("vc", &visits)
                .with_attr("sl", &injection.start.to_string())
                .with_attr("el", &injection.end.to_string()),
        );
    }
}

/// Uid of the file table entry for `path`, creating the entry if needed.
fn ensure_file_entry(module: &mut XmlElement, path: &str) -> String {
    if module.child("Files").is_none() {
        module.push_child(XmlElement::new("Files"));
    }
    let files = module.child_mut("Files").expect("just inserted");

    if let Some(existing) = files
        .children_named("File")
        .find(|f| f.attr("fullPath") == Some(path))
        .and_then(|f| f.attr("uid"))
    {
        return existing.to_string();
    }

    let next_uid = files
        .children_named("File")
        .filter_map(|f| f.attr("uid")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let uid = next_uid.to_string();
    files.push_child(
        XmlElement::new("File")
            .with_attr("uid", &uid)
            .with_attr("fullPath", path),
    );
    uid
}

fn needs_position(method: &XmlElement) -> bool {
    let has_file_ref = method.child("FileRef").is_some();
    let has_points = method
        .child("SequencePoints")
        .map_or(false, |sp| !sp.children.is_empty());
    !has_file_ref || !has_points
}

/// Maps an OpenCover method name (`mycrate::Calc::get_radius()`) to the
/// member to look for in the syntax tree.
fn member_spec(method: &XmlElement, full_name: &str) -> Option<MemberSpec> {
    let short = method_short_name(full_name)?;

    if method.attr("isGetter") == Some("true") {
        let name = short.strip_prefix("get_").unwrap_or(&short);
        return Some(MemberSpec::Getter(name.to_string()));
    }
    if method.attr("isSetter") == Some("true") {
        let name = short.strip_prefix("set_").unwrap_or(&short);
        return Some(MemberSpec::Setter(name.to_string()));
    }

    Some(MemberSpec::Method(short))
}

/// `mycrate::Calc::run(u32)` → `run`.
fn method_short_name(full_name: &str) -> Option<String> {
    let without_args = full_name.split('(').next()?;
    let normalized = crate::model::normalize_class_name(without_args.trim());
    Some(normalized.rsplit("::").next()?.trim().to_string())
}

fn fold_synthetic_classes(module: &mut XmlElement) {
    let Some(classes) = module.child_mut("Classes") else {
        return;
    };

    for class in classes.children_named_mut("Class") {
        let Some(name) = class.child_text("FullName").map(str::to_string) else {
            continue;
        };
        if !is_synthetic_class_name(&name) {
            continue;
        }

        let member_counts: Vec<(String, usize)> = class
            .child("Methods")
            .map(|methods| {
                methods
                    .children_named("Method")
                    .filter_map(|m| {
                        let member = m.child_text("Name")?;
                        let entries = m
                            .child("SequencePoints")
                            .map_or(0, |sp| sp.children.len());
                        Some((member.split('(').next().unwrap_or(member).to_string(), entries))
                    })
                    .collect()
            })
            .unwrap_or_default();

        match logical_owner(&name, dominant_member(&member_counts)) {
            Some(owner) => {
                log::debug!("folding synthetic class '{name}' into '{owner}'");
                if let Some(full_name) = class.child_mut("FullName") {
                    full_name.text = owner;
                }
            }
            None => log::debug!("synthetic class '{name}' has no recoverable owner"),
        }
    }
}

/// Parser for one preprocessed OpenCover session fragment.
pub struct OpenCoverParser {
    fragment: XmlElement,
}

impl OpenCoverParser {
    pub fn new(fragment: XmlElement) -> Self {
        Self { fragment }
    }
}

impl ReportParser for OpenCoverParser {
    fn name(&self) -> &'static str {
        "OpenCover"
    }

    fn supports_branch_coverage(&self) -> bool {
        true
    }

    fn parse(&self) -> Result<CoverageModel> {
        let mut model = CoverageModel::new(self.name(), self.supports_branch_coverage());

        for module in self.fragment.descendants("Module") {
            if module.attr("skippedDueTo").is_some() {
                continue;
            }

            let Some(assembly_name) = module
                .child_text("ModulePath")
                .or_else(|| module.child_text("ModuleName"))
            else {
                continue;
            };

            let files = file_table(module);
            let mut assembly = Assembly::new(assembly_name);

            if let Some(classes) = module.child("Classes") {
                for class_el in classes.children_named("Class") {
                    if class_el.attr("skippedDueTo").is_some() {
                        continue;
                    }
                    if let Some(class) = extract_class(class_el, assembly_name, &files) {
                        assembly.add_class(class);
                    }
                }
            }

            model.add_assembly(assembly);
        }

        Ok(model)
    }
}

/// `uid` → full path of the module's file table.
fn file_table(module: &XmlElement) -> Vec<(String, String)> {
    module
        .child("Files")
        .map(|files| {
            files
                .children_named("File")
                .filter_map(|f| {
                    Some((f.attr("uid")?.to_string(), f.attr("fullPath")?.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn extract_class(
    class_el: &XmlElement,
    assembly_name: &str,
    files: &[(String, String)],
) -> Option<Class> {
    let name = class_el.child_text("FullName")?;
    let mut class = Class::new(name, assembly_name);

    let Some(methods) = class_el.child("Methods") else {
        return Some(class);
    };

    for method_el in methods.children_named("Method") {
        let Some(full_name) = method_el.child_text("Name") else {
            continue;
        };

        if let Some(metric) = extract_method_metric(method_el, full_name) {
            class.add_method_metric(metric);
        }

        let file_path = method_el
            .child("FileRef")
            .and_then(|r| r.attr("uid"))
            .and_then(|uid| files.iter().find(|(id, _)| id == uid))
            .map(|(_, path)| path.as_str());

        let Some(file_path) = file_path else {
            continue;
        };

        let mut file = CodeFile::new(file_path);
        record_method_coverage(&mut file, method_el);
        class.add_file(file);
    }

    Some(class)
}

fn extract_method_metric(method_el: &XmlElement, full_name: &str) -> Option<MethodMetric> {
    let short_name = method_short_name(full_name)?;
    let clean_full = full_name.split('(').next().unwrap_or(full_name).trim();

    let mut metric = MethodMetric::new(clean_full, &short_name);
    metric.line = method_el
        .child("SequencePoints")
        .and_then(|sp| sp.children_named("SequencePoint").next())
        .and_then(|p| attr_u32(p, "sl"));

    let complexity = attr_f64(method_el, "cyclomaticComplexity");
    let sequence_coverage = attr_f64(method_el, "sequenceCoverage");

    metric.add_metric(Metric::cyclomatic_complexity(complexity));
    metric.add_metric(Metric::npath_complexity(attr_f64(
        method_el,
        "nPathComplexity",
    )));
    if let (Some(complexity), Some(coverage)) = (complexity, sequence_coverage) {
        metric.add_metric(Metric::crap_score(Some(crap_score(complexity, coverage))));
    }
    metric.add_metric(Metric::sequence_coverage(sequence_coverage));
    metric.add_metric(Metric::branch_coverage(attr_f64(
        method_el,
        "branchCoverage",
    )));

    Some(metric)
}

fn record_method_coverage(file: &mut CodeFile, method_el: &XmlElement) {
    // Branch visits by line decide whether a visited line is only partially
    // covered.
    let mut partial_lines: Vec<u32> = Vec::new();
    if let Some(branch_points) = method_el.child("BranchPoints") {
        let points: Vec<&XmlElement> = branch_points.children_named("BranchPoint").collect();
        for point in &points {
            let Some(line) = attr_u32(point, "sl") else {
                continue;
            };
            let on_line = points
                .iter()
                .filter(|p| attr_u32(p, "sl") == Some(line))
                .collect::<Vec<_>>();
            let visited = on_line
                .iter()
                .filter(|p| attr_f64(p, "vc").unwrap_or(0.0) > 0.0)
                .count();
            if visited > 0 && visited < on_line.len() && !partial_lines.contains(&line) {
                partial_lines.push(line);
            }
        }

        for point in points {
            let Some(line) = attr_u32(point, "sl") else {
                continue;
            };
            let offset = point.attr("offset").unwrap_or("0");
            let path = point.attr("path").unwrap_or("0");
            let visits = attr_f64(point, "vc").unwrap_or(0.0) as u64;
            file.record_branch(line, Branch::new(&format!("{offset}_{path}"), visits));
        }
    }

    if let Some(sequence_points) = method_el.child("SequencePoints") {
        for point in sequence_points.children_named("SequencePoint") {
            let Some(start) = attr_u32(point, "sl") else {
                continue;
            };
            let end = attr_u32(point, "el").unwrap_or(start);
            let visits = attr_f64(point, "vc").unwrap_or(0.0) as i64;

            for line in start..=end.max(start) {
                let status = if visits <= 0 {
                    LineVisitStatus::NotCovered
                } else if partial_lines.contains(&line) {
                    LineVisitStatus::PartiallyCovered
                } else {
                    LineVisitStatus::Covered
                };
                file.record_line(line, visits, status);
            }
        }
    }
}

fn attr_f64(element: &XmlElement, name: &str) -> Option<f64> {
    element.attr(name).and_then(|v| v.trim().parse().ok())
}

fn attr_u32(element: &XmlElement, name: &str) -> Option<u32> {
    element.attr(name).and_then(|v| v.trim().parse().ok())
}
