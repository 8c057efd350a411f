use std::{fs::File, io::Write, path::Path};

use jane_eyre::eyre::{self, Context};
use tracing::{info, warn};

use crate::{
    aggregate::Aggregate,
    batch::load_batch,
    config::{PlotConfig, DEFAULT_TRACE_DIR},
    event::Category,
    json::JsonPlans,
    layout::plan_category,
    parse::TraceError,
    render::render_category,
    summary::Summary,
    timeline::{load_profile, render_timeline},
};

/// Loads the config and every trace in `dir`. Returns None if there are no traces.
fn load(dir: &Path) -> eyre::Result<Option<(PlotConfig, Aggregate)>> {
    let config = PlotConfig::load_or_default(dir)?;
    let groups = match load_batch(dir, &config.extension) {
        Ok(groups) => groups,
        Err(TraceError::EmptyInput { dir }) => {
            info!(%dir, "No event groups found");
            return Ok(None);
        }
        Err(error) => return Err(error.into()),
    };

    Ok(Some((config, Aggregate::new(groups))))
}

fn trace_dir(args: &[String]) -> &Path {
    Path::new(args.first().map_or(DEFAULT_TRACE_DIR, |dir| dir.as_str()))
}

// Usage: surflog plot [dir] [out_dir]
pub fn plot(args: Vec<String>) -> eyre::Result<()> {
    let dir = trace_dir(&args);
    let out_dir = args.get(1).map_or(dir, Path::new);
    let Some((config, aggregate)) = load(dir)? else {
        return Ok(());
    };
    std::fs::create_dir_all(out_dir)
        .wrap_err_with(|| format!("Failed to create {}", out_dir.display()))?;

    let plans = Category::ALL
        .iter()
        .map(|&category| plan_category(&aggregate, category, &config.layout))
        .collect::<Vec<_>>();
    for plan in &plans {
        render_category(plan, &config, out_dir)?;
    }

    let json = serde_json::to_string_pretty(&JsonPlans::new(&aggregate, &plans))?;
    File::create(out_dir.join("plans.json"))?.write_all(json.as_bytes())?;
    info!(?out_dir, "Done");

    Ok(())
}

// Usage: surflog compare [dir]
pub fn compare(args: Vec<String>) -> eyre::Result<()> {
    let Some((_, aggregate)) = load(trace_dir(&args))? else {
        return Ok(());
    };

    let mismatches = aggregate.check_parity();
    for (left, right, mismatch) in &mismatches {
        warn!(left, right, "{mismatch}");
        println!("{left} vs {right}: {mismatch}");
    }
    if mismatches.is_empty() {
        println!("All {} runs are consistent", aggregate.groups().len());
    }

    Ok(())
}

// Usage: surflog summary [dir]
pub fn summary(args: Vec<String>) -> eyre::Result<()> {
    let Some((_, aggregate)) = load(trace_dir(&args))? else {
        return Ok(());
    };

    for category in Category::ALL {
        println!("{}", category.title());
        for item in aggregate.master_list(category) {
            if let Ok(summary) = Summary::of(&aggregate.values(category, item)) {
                println!("    {item}: {summary}");
            }
        }
    }

    Ok(())
}

// Usage: surflog dump [dir]
pub fn dump(args: Vec<String>) -> eyre::Result<()> {
    let Some((_, aggregate)) = load(trace_dir(&args))? else {
        return Ok(());
    };

    for group in aggregate.groups() {
        println!("Event group for {}", group.path);
        for info in group.info.iter().chain(&group.extra_info) {
            println!("    Info: {}", info.description);
        }
        for category in Category::ALL {
            for event in group.events(category) {
                println!("    {event}");
            }
        }
    }

    Ok(())
}

// Usage: surflog timeline <profile.csv> [out.svg]
pub fn timeline(args: Vec<String>) -> eyre::Result<()> {
    let Some(path) = args.first() else {
        eyre::bail!("Usage: surflog timeline <profile.csv> [out.svg]");
    };
    let out_path = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| format!("{}.svg", path.strip_suffix(".csv").unwrap_or(path)));

    let kernels = load_profile(path)?;
    let svg = render_timeline(&kernels)?;
    info!(%out_path, kernels = kernels.len(), "Writing timeline");
    File::create(&out_path)?.write_all(svg.as_bytes())?;

    Ok(())
}
