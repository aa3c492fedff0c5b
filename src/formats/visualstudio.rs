//! Visual-Studio-style coverage reports.
//!
//! Root marker: `CoverageDSPriv`. Line ranges per method with a coverage
//! status (0 = covered, 1 = partially covered, 2 = not covered), no branch
//! data. Compiler-synthesized wrapper classes and methods without line data
//! are both common here; the preprocessor folds the former and recovers
//! positions for the latter.

use std::path::PathBuf;

use anyhow::Result;

use super::document::XmlElement;
use super::preprocess::{
    dominant_member, is_synthetic_class_name, logical_owner, PositionEnricher,
};
use super::{IngestContext, ReportParser};
use crate::common;
use crate::model::{
    Assembly, Class, CodeFile, CoverageModel, LineVisitStatus, Metric, MethodMetric,
};
use crate::source::MemberSpec;

/// Folds synthetic classes into their logical owners and injects line data
/// for methods that carry none.
pub fn preprocess(fragment: &mut XmlElement, ctx: &IngestContext) {
    let file_names = file_table(fragment);
    let module_files: Vec<PathBuf> = file_names.iter().map(|(_, p)| PathBuf::from(p)).collect();

    let enricher = PositionEnricher::new(ctx);
    let mut injections: Vec<Injection> = Vec::new();

    for module in fragment.children_named("Module") {
        for namespace in module.children_named("NamespaceTable") {
            let namespace_name = namespace.child_text("NamespaceName").unwrap_or("");

            for class in namespace.children_named("Class") {
                let Some(class_name) = class.child_text("ClassName") else {
                    continue;
                };
                let qualified = qualified_class_name(namespace_name, class_name);

                for method in class.children_named("Method") {
                    if method.child("Lines").is_some() {
                        continue;
                    }
                    let Some(method_name) = method.child_text("MethodName") else {
                        continue;
                    };

                    let member = MemberSpec::Method(short_method_name(method_name));
                    if let Some((file, span)) =
                        enricher.resolve(&qualified, &member, &module_files)
                    {
                        injections.push(Injection {
                            class_name: class_name.to_string(),
                            method_name: method_name.to_string(),
                            start: span.start,
                            end: span.end,
                            file: common::normalize_path(&file),
                        });
                    }
                }
            }
        }
    }

    apply_injections(fragment, injections);
    fold_synthetic_classes(fragment);
}

struct Injection {
    class_name: String,
    method_name: String,
    start: u32,
    end: u32,
    file: String,
}

fn apply_injections(fragment: &mut XmlElement, injections: Vec<Injection>) {
    for injection in injections {
        let file_id = ensure_file_entry(fragment, &injection.file);

        for module in fragment.children_named_mut("Module") {
            for namespace in module.children_named_mut("NamespaceTable") {
                for class in namespace.children_named_mut("Class") {
                    if class.child_text("ClassName") != Some(injection.class_name.as_str()) {
                        continue;
                    }
                    for method in class.children_named_mut("Method") {
                        if method.child_text("MethodName")
                            != Some(injection.method_name.as_str())
                        {
                            continue;
                        }

                        // Recovered positions carry no visit data; whether
                        // the method ran at all is decided by its block
                        // counter.
                        let covered = method
                            .child_text("BlocksCovered")
                            .and_then(|v| v.parse::<u64>().ok())
                            .map_or(false, |blocks| blocks > 0);

                        let mut lines = XmlElement::new("Lines");
                        lines.push_child(
                            XmlElement::new("LnStart").with_text(&injection.start.to_string()),
                        );
                        lines.push_child(
                            XmlElement::new("LnEnd").with_text(&injection.end.to_string()),
                        );
                        lines.push_child(
                            XmlElement::new("Coverage")
                                .with_text(if covered { "0" } else { "2" }),
                        );
                        lines
                            .push_child(XmlElement::new("SourceFileID").with_text(&file_id));
                        method.push_child(lines);
                    }
                }
            }
        }
    }
}

fn ensure_file_entry(fragment: &mut XmlElement, path: &str) -> String {
    if let Some(existing) = fragment
        .children_named("SourceFileNames")
        .find(|e| e.child_text("SourceFileName") == Some(path))
        .and_then(|e| e.child_text("SourceFileID"))
    {
        return existing.to_string();
    }

    let next_id = fragment
        .children_named("SourceFileNames")
        .filter_map(|e| e.child_text("SourceFileID")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let id = next_id.to_string();

    let mut entry = XmlElement::new("SourceFileNames");
    entry.push_child(XmlElement::new("SourceFileID").with_text(&id));
    entry.push_child(XmlElement::new("SourceFileName").with_text(path));
    fragment.push_child(entry);

    id
}

fn fold_synthetic_classes(fragment: &mut XmlElement) {
    fragment.for_each_descendant_mut("NamespaceTable", &mut |namespace| {
        for class in namespace.children_named_mut("Class") {
            let Some(name) = class.child_text("ClassName").map(str::to_string) else {
                continue;
            };
            if !is_synthetic_class_name(&name) {
                continue;
            }

            let member_counts: Vec<(String, usize)> = class
                .children_named("Method")
                .filter_map(|m| {
                    let member = m.child_text("MethodName")?;
                    let entries = m.children_named("Lines").count();
                    Some((member.to_string(), entries))
                })
                .collect();

            match logical_owner(&name, dominant_member(&member_counts)) {
                Some(owner) => {
                    log::debug!("folding synthetic class '{name}' into '{owner}'");
                    // The namespace prefix stays; only the class segment is
                    // rewritten.
                    let local = owner.rsplit("::").next().unwrap_or(&owner).to_string();
                    if let Some(class_name) = class.child_mut("ClassName") {
                        class_name.text = local;
                    }
                }
                None => log::debug!("synthetic class '{name}' has no recoverable owner"),
            }
        }
    });
}

fn qualified_class_name(namespace: &str, class_name: &str) -> String {
    if namespace.is_empty() {
        class_name.to_string()
    } else {
        format!("{namespace}::{class_name}")
    }
}

/// `run` / `run()` / `Calc::run()` → `run`.
fn short_method_name(method_name: &str) -> String {
    let without_args = method_name.split('(').next().unwrap_or(method_name);
    crate::model::normalize_class_name(without_args)
        .rsplit("::")
        .next()
        .unwrap_or(without_args)
        .trim()
        .to_string()
}

/// `SourceFileID` → `SourceFileName` pairs of the document.
fn file_table(fragment: &XmlElement) -> Vec<(String, String)> {
    fragment
        .children_named("SourceFileNames")
        .filter_map(|e| {
            Some((
                e.child_text("SourceFileID")?.to_string(),
                e.child_text("SourceFileName")?.to_string(),
            ))
        })
        .collect()
}

/// Parser for one preprocessed Visual Studio fragment.
pub struct VisualStudioParser {
    fragment: XmlElement,
}

impl VisualStudioParser {
    pub fn new(fragment: XmlElement) -> Self {
        Self { fragment }
    }
}

impl ReportParser for VisualStudioParser {
    fn name(&self) -> &'static str {
        "VisualStudio"
    }

    fn supports_branch_coverage(&self) -> bool {
        false
    }

    fn parse(&self) -> Result<CoverageModel> {
        let mut model = CoverageModel::new(self.name(), self.supports_branch_coverage());
        let files = file_table(&self.fragment);

        for module in self.fragment.children_named("Module") {
            let Some(module_name) = module.child_text("ModuleName") else {
                continue;
            };
            let mut assembly = Assembly::new(module_name);

            for namespace in module.children_named("NamespaceTable") {
                let namespace_name = namespace.child_text("NamespaceName").unwrap_or("");

                for class_el in namespace.children_named("Class") {
                    let Some(class_name) = class_el.child_text("ClassName") else {
                        continue;
                    };
                    let qualified = qualified_class_name(namespace_name, class_name);
                    assembly.add_class(extract_class(class_el, &qualified, module_name, &files));
                }
            }

            model.add_assembly(assembly);
        }

        Ok(model)
    }
}

fn extract_class(
    class_el: &XmlElement,
    qualified_name: &str,
    assembly_name: &str,
    files: &[(String, String)],
) -> Class {
    let mut class = Class::new(qualified_name, assembly_name);

    for method_el in class_el.children_named("Method") {
        let Some(method_name) = method_el.child_text("MethodName") else {
            continue;
        };

        let mut covered = 0usize;
        let mut coverable = 0usize;
        let mut first_line: Option<u32> = None;

        for lines_el in method_el.children_named("Lines") {
            let Some(range) = extract_line_range(lines_el) else {
                continue;
            };
            first_line = first_line.or(Some(range.start));

            let Some(file_path) = files
                .iter()
                .find(|(id, _)| Some(id.as_str()) == lines_el.child_text("SourceFileID"))
                .map(|(_, path)| path.as_str())
            else {
                continue;
            };

            let mut file = CodeFile::new(file_path);
            for line in range.start..=range.end {
                file.record_line(line, range.visits, range.status);
            }
            class.add_file(file);

            coverable += (range.end - range.start + 1) as usize;
            if range.status != LineVisitStatus::NotCovered {
                covered += (range.end - range.start + 1) as usize;
            }
        }

        let mut metric = MethodMetric::new(method_name, &short_method_name(method_name));
        metric.line = first_line;
        metric.add_metric(Metric::sequence_coverage(common::coverage_percent(
            covered, coverable,
        )));
        class.add_method_metric(metric);
    }

    class
}

struct LineRange {
    start: u32,
    end: u32,
    visits: i64,
    status: LineVisitStatus,
}

fn extract_line_range(lines_el: &XmlElement) -> Option<LineRange> {
    let start: u32 = lines_el.child_text("LnStart")?.parse().ok()?;
    let end: u32 = lines_el
        .child_text("LnEnd")
        .and_then(|v| v.parse().ok())
        .unwrap_or(start);

    let (visits, status) = match lines_el.child_text("Coverage") {
        Some("0") => (1, LineVisitStatus::Covered),
        Some("1") => (1, LineVisitStatus::PartiallyCovered),
        _ => (0, LineVisitStatus::NotCovered),
    };

    Some(LineRange {
        start,
        end: end.max(start),
        visits,
        status,
    })
}
