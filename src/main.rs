mod aggregate;
mod batch;
mod commands;
mod config;
mod event;
mod json;
mod layout;
mod parse;
mod render;
mod summary;
mod timeline;

use std::env::args;

use jane_eyre::eyre::{self, bail};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eyre::Result<()> {
    jane_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive("surflog=info".parse()?)
                .from_env_lossy(),
        )
        .init();

    let Some(mode) = args().nth(1) else {
        bail!("Usage: surflog <plot|compare|summary|dump|timeline> ...");
    };
    let args = args().skip(2).collect::<Vec<_>>();

    match &*mode {
        // Usage: surflog plot [dir] [out_dir]
        "plot" => crate::commands::plot(args),
        // Usage: surflog compare [dir]
        "compare" => crate::commands::compare(args),
        // Usage: surflog summary [dir]
        "summary" => crate::commands::summary(args),
        // Usage: surflog dump [dir]
        "dump" => crate::commands::dump(args),
        // Usage: surflog timeline <profile.csv> [out.svg]
        "timeline" => crate::commands::timeline(args),
        other => bail!("Unknown command: {other}"),
    }
}
