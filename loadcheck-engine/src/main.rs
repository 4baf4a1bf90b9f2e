use clap::Parser;
use loadcheck_common::{LoadCheckError, Result, RunConfig};
use loadcheck_engine::analyzer;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "loadcheck", about = "HTTP SLA load-testing harness")]
struct Args {
    /// Endpoint to load. Overrides the config file's target.
    #[arg(long)]
    target_url: Option<String>,

    /// Path to a JSON run configuration (stages, thresholds, pauses).
    /// Defaults to the built-in 70s ramp profile.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the JSON report artifact.
    #[arg(long, default_value = "performance-analysis.json")]
    out: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        process::exit(3);
    });

    let report = loadcheck_engine::run(&config).await.unwrap_or_else(|e| {
        eprintln!("Startup error: {e}");
        process::exit(3);
    });

    // The console report always comes from the in-memory summary, even if
    // persisting the artifact fails afterwards.
    analyzer::print_report(&report);

    let artifact = analyzer::build_artifact(&report);
    let artifact_err = analyzer::write_artifact(&args.out, &artifact).err();
    if let Some(e) = &artifact_err {
        eprintln!("{e}");
    }

    let exit_code = if !report.passed {
        1
    } else if artifact_err.is_some() {
        2
    } else {
        0
    };
    process::exit(exit_code);
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| LoadCheckError::ConfigRead(format!("{}: {e}", path.display())))?;
            serde_json::from_str(&raw)
                .map_err(|e| LoadCheckError::ConfigParse(format!("{}: {e}", path.display())))?
        }
        None => RunConfig::default(),
    };

    if let Some(url) = &args.target_url {
        config.target_url = url.clone();
    }

    // Compile once here so malformed input dies before any load starts;
    // the engine compiles again when it runs.
    config.compile()?;
    Ok(config)
}
