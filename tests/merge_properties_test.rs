//! Merge-algebra properties at the model level: identity, grouping
//! insensitivity and the last-value-wins rule for scalars.

use covmap::model::{
    Assembly, Class, CodeFile, CoverageModel, LineVisitStatus, Metric, MethodMetric,
};
use pretty_assertions::assert_eq;

fn model_with_quota(quota: f64) -> CoverageModel {
    let mut class = Class::new("calc::Calc", "libcalc");
    class.set_coverage_quota(Some(quota));

    let mut assembly = Assembly::new("libcalc");
    assembly.add_class(class);

    let mut model = CoverageModel::new("Test", false);
    model.add_assembly(assembly);
    model
}

fn quota_of(model: &CoverageModel) -> Option<f64> {
    model
        .assembly("libcalc")
        .unwrap()
        .class("calc::Calc")
        .unwrap()
        .coverage_quota()
}

#[test]
fn test_merging_empty_model_is_identity() {
    let mut target = model_with_quota(15.0);
    target.merge(CoverageModel::empty());

    assert_eq!(target.assemblies().len(), 1);
    assert_eq!(quota_of(&target), Some(15.0));
}

#[test]
fn test_coverage_quota_last_merge_wins() {
    let mut target = model_with_quota(15.0);
    target.merge(model_with_quota(20.0));

    assert_eq!(quota_of(&target), Some(20.0));
}

#[test]
fn test_duplicate_metric_last_value_wins_and_new_metrics_append() {
    let with_metrics = |values: &[(&str, f64)]| {
        let mut method = MethodMetric::new("run()", "run");
        for (name, value) in values {
            method.add_metric(Metric::new(
                name,
                covmap::model::MetricKind::CodeQuality,
                Some(*value),
            ));
        }
        let mut class = Class::new("calc::Calc", "libcalc");
        class.add_method_metric(method);
        let mut assembly = Assembly::new("libcalc");
        assembly.add_class(class);
        let mut model = CoverageModel::new("Test", false);
        model.add_assembly(assembly);
        model
    };

    let mut target = with_metrics(&[("Crap score", 10.0), ("Cyclomatic complexity", 4.0)]);
    target.merge(with_metrics(&[("Crap score", 15.0), ("NPath complexity", 8.0)]));

    let class = target
        .assembly("libcalc")
        .unwrap()
        .class("calc::Calc")
        .unwrap();
    let method = &class.method_metrics()[0];

    let entries: Vec<(&str, Option<f64>)> = method
        .metrics()
        .iter()
        .map(|m| (m.name.as_str(), m.value))
        .collect();

    // Duplicate overwritten in place, the new metric appended at the end.
    assert_eq!(
        entries,
        vec![
            ("Crap score", Some(15.0)),
            ("Cyclomatic complexity", Some(4.0)),
            ("NPath complexity", Some(8.0)),
        ]
    );
}

#[test]
fn test_fold_result_is_independent_of_grouping() {
    let fragment = |class_name: &str, line: u32, visits: i64| {
        let mut file = CodeFile::new("/work/src/calc.rs");
        file.record_line(line, visits, LineVisitStatus::Covered);
        let mut class = Class::new(class_name, "libcalc");
        class.add_file(file);
        let mut assembly = Assembly::new("libcalc");
        assembly.add_class(class);
        let mut model = CoverageModel::new("Test", false);
        model.add_assembly(assembly);
        model
    };

    let a = fragment("calc::Calc", 1, 1);
    let b = fragment("calc::Calc", 2, 3);
    let c = fragment("calc::Other", 5, 1);

    let mut left_to_right = a.clone();
    left_to_right.merge(b.clone());
    left_to_right.merge(c.clone());
    left_to_right.finish();

    let mut right_grouped = b;
    right_grouped.merge(c);
    let mut other = a;
    other.merge(right_grouped);
    other.finish();

    let snapshot = |model: &CoverageModel| {
        model
            .assemblies()
            .iter()
            .flat_map(|assembly| {
                assembly.classes().iter().map(|class| {
                    (
                        class.name().to_string(),
                        class
                            .files()
                            .iter()
                            .map(|f| (f.path().to_string(), f.line_coverage().to_vec()))
                            .collect::<Vec<_>>(),
                    )
                })
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(snapshot(&left_to_right), snapshot(&other));
}

#[test]
fn test_class_files_union_by_path_across_fragments() {
    let fragment = |path: &str| {
        let mut file = CodeFile::new(path);
        file.record_line(1, 1, LineVisitStatus::Covered);
        let mut class = Class::new("calc::Calc", "libcalc");
        class.add_file(file);
        let mut assembly = Assembly::new("libcalc");
        assembly.add_class(class);
        let mut model = CoverageModel::new("Test", false);
        model.add_assembly(assembly);
        model
    };

    let mut target = fragment("/work/src/calc.rs");
    // Same file spelled with backslashes still unions.
    target.merge(fragment(r"\work\src\calc.rs"));
    target.merge(fragment("/work/src/calc_ext.rs"));

    let class = target
        .assembly("libcalc")
        .unwrap()
        .class("calc::Calc")
        .unwrap();
    assert_eq!(class.files().len(), 2);
}
