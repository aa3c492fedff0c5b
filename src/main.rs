use anyhow::{Context, Result};
use clap::Parser;

use covmap::cli::Args;
use covmap::{
    analyze_thresholds, collect_reports, detect_hotspots, CovmapConfig, PipelineOptions,
    ReportFilters,
};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(args: Args) -> Result<()> {
    let config = CovmapConfig::load(&std::env::current_dir()?)?;

    let filters = ReportFilters::new(
        &args.assembly_filters,
        &args.class_filters,
        &args.file_filters,
    )?;

    let options = PipelineOptions {
        source_directories: args.source_dirs.clone(),
        filters,
    };

    let model = collect_reports(&args.reports, &options);
    if model.assemblies().is_empty() {
        log::warn!("no coverage data could be read from the given reports");
    }

    let max_hotspots = args.hotspots.unwrap_or(config.max_hotspots);
    let hotspots = detect_hotspots(model.assemblies(), max_hotspots);
    let threshold_analysis =
        analyze_thresholds(model.assemblies(), &config.thresholds.by_metric_name());

    let summary = build_summary(&model, &hotspots, &threshold_analysis);
    let rendered = serde_json::to_string_pretty(&summary).context("serializing summary")?;

    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{rendered}"),
    }

    Ok(())
}

fn build_summary(
    model: &covmap::CoverageModel,
    hotspots: &[covmap::RiskHotspot],
    thresholds: &covmap::ThresholdAnalysis,
) -> serde_json::Value {
    let assemblies: Vec<serde_json::Value> = model
        .assemblies()
        .iter()
        .map(|assembly| {
            serde_json::json!({
                "name": assembly.name(),
                "short_name": assembly.short_name(),
                "classes": assembly.classes().len(),
                "covered_lines": assembly.covered_lines(),
                "coverable_lines": assembly.coverable_lines(),
                "coverage_quota": assembly.coverage_quota(),
            })
        })
        .collect();

    serde_json::json!({
        "parsers": model.used_parsers().collect::<Vec<_>>(),
        "supports_branch_coverage": model.supports_branch_coverage(),
        "assemblies": assemblies,
        "risk_hotspots": hotspots,
        "threshold_violations": thresholds.flagged,
        "code_quality_metrics_available": thresholds.code_quality_metrics_available,
    })
}
