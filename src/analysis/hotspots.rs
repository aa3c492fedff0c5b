//! Top-N risk hotspot ranking.
//!
//! Every class is represented by its single worst method, measured by crap
//! score (complexity × inverse coverage). Candidates are sorted descending
//! and truncated to the requested count.

use serde::{Deserialize, Serialize};

use crate::model::{metric::names, Assembly, MethodMetric};

/// Default number of hotspots reported.
pub const DEFAULT_MAX_HOTSPOTS: usize = 20;

/// One entry of the ranked hotspot list: the worst method of one class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskHotspot {
    pub assembly_short_name: String,
    pub class_name: String,
    pub method_short_name: String,
    pub complexity: Option<f64>,
    pub line_coverage: Option<f64>,
    pub branch_coverage: Option<f64>,
    pub crap_score: f64,
}

/// Ranks the classes of the merged, filtered model by their worst method.
///
/// Classes without any crap-scored method contribute no candidate. The sort
/// is stable, so equal scores keep their input order.
pub fn detect_hotspots(assemblies: &[Assembly], max_hotspots: usize) -> Vec<RiskHotspot> {
    let mut candidates: Vec<RiskHotspot> = Vec::new();

    for assembly in assemblies {
        for class in assembly.classes() {
            let worst = class
                .method_metrics()
                .iter()
                .filter_map(|method| Some((method, method_crap_score(method)?)))
                .max_by(|(_, a), (_, b)| a.total_cmp(b));

            if let Some((method, crap_score)) = worst {
                candidates.push(RiskHotspot {
                    assembly_short_name: assembly.short_name().to_string(),
                    class_name: class.name().to_string(),
                    method_short_name: method.short_name().to_string(),
                    complexity: metric_value(method, names::CYCLOMATIC_COMPLEXITY),
                    line_coverage: metric_value(method, names::LINE_COVERAGE)
                        .or_else(|| metric_value(method, names::SEQUENCE_COVERAGE)),
                    branch_coverage: metric_value(method, names::BRANCH_COVERAGE),
                    crap_score,
                });
            }
        }
    }

    candidates.sort_by(|a, b| b.crap_score.total_cmp(&a.crap_score));
    candidates.truncate(max_hotspots);
    candidates
}

fn method_crap_score(method: &MethodMetric) -> Option<f64> {
    metric_value(method, names::CRAP_SCORE)
}

fn metric_value(method: &MethodMetric, name: &str) -> Option<f64> {
    method.metric(name).and_then(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, Metric};

    fn class_with_scores(name: &str, scores: &[f64]) -> Class {
        let mut class = Class::new(name, "lib");
        for (idx, score) in scores.iter().enumerate() {
            let full = format!("m{idx}()");
            let mut method = MethodMetric::new(&full, &format!("m{idx}"));
            method.add_metric(Metric::crap_score(Some(*score)));
            method.add_metric(Metric::cyclomatic_complexity(Some(2.0)));
            class.add_method_metric(method);
        }
        class
    }

    fn assembly_of(classes: Vec<Class>) -> Assembly {
        let mut assembly = Assembly::new("lib");
        for class in classes {
            assembly.add_class(class);
        }
        assembly
    }

    #[test]
    fn test_top_n_ranking_descending() {
        let assembly = assembly_of(vec![
            class_with_scores("a::A", &[40.0]),
            class_with_scores("a::B", &[30.0]),
            class_with_scores("a::C", &[20.0]),
            class_with_scores("a::D", &[10.0]),
            class_with_scores("a::E", &[50.0]),
        ]);

        let hotspots = detect_hotspots(&[assembly], 3);

        let scores: Vec<f64> = hotspots.iter().map(|h| h.crap_score).collect();
        assert_eq!(scores, vec![50.0, 40.0, 30.0]);
    }

    #[test]
    fn test_one_candidate_per_class() {
        let assembly = assembly_of(vec![class_with_scores("a::A", &[2.0, 22.0])]);

        let hotspots = detect_hotspots(&[assembly], DEFAULT_MAX_HOTSPOTS);

        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].crap_score, 22.0);
        assert_eq!(hotspots[0].method_short_name, "m1");
    }

    #[test]
    fn test_classes_without_scored_methods_contribute_nothing() {
        let mut plain = Class::new("a::Plain", "lib");
        plain.add_method_metric(MethodMetric::new("m()", "m"));

        let assembly = assembly_of(vec![plain, class_with_scores("a::B", &[5.0])]);
        let hotspots = detect_hotspots(&[assembly], DEFAULT_MAX_HOTSPOTS);

        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].class_name, "a::B");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let assembly = assembly_of(vec![
            class_with_scores("a::First", &[7.0]),
            class_with_scores("a::Second", &[7.0]),
        ]);

        let hotspots = detect_hotspots(&[assembly], DEFAULT_MAX_HOTSPOTS);
        assert_eq!(hotspots[0].class_name, "a::First");
        assert_eq!(hotspots[1].class_name, "a::Second");
    }

    #[test]
    fn test_truncates_to_requested_count() {
        let assemblies = vec![assembly_of(
            (0..30)
                .map(|i| class_with_scores(&format!("a::C{i:02}"), &[i as f64]))
                .collect(),
        )];

        let hotspots = detect_hotspots(&assemblies, DEFAULT_MAX_HOTSPOTS);
        assert_eq!(hotspots.len(), DEFAULT_MAX_HOTSPOTS);
    }
}
