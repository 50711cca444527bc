//! Command line arguments and setup shared by the `dependencies` and `ner_eval` binaries.
use clap::Args;
use std::path::PathBuf;
use syneval::{Annotator, CommandAnnotator, PrecomputedAnnotator};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Where the parsed documents come from.
#[derive(Debug, Args)]
pub struct PipelineArgs {
    /// JSON-lines file of documents produced by the pipeline ahead of time
    #[arg(long, conflicts_with = "command", required_unless_present = "command")]
    pub annotations: Option<PathBuf>,
    /// Program running the pipeline. It reads one text per line and writes one JSON document per
    /// line
    #[arg(long)]
    pub command: Option<String>,
    /// Argument of the pipeline program, can be repeated
    #[arg(long = "arg", requires = "command", allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl PipelineArgs {
    pub fn annotator(&self) -> anyhow::Result<Box<dyn Annotator>> {
        match (&self.annotations, &self.command) {
            (Some(path), _) => {
                let annotator = PrecomputedAnnotator::from_path(path)?;
                info!(
                    "loaded {} documents from {}",
                    annotator.len(),
                    path.display()
                );
                Ok(Box::new(annotator))
            }
            (None, Some(program)) => {
                info!("running the pipeline with `{}`", program);
                Ok(Box::new(
                    CommandAnnotator::new(program).args(self.args.iter()),
                ))
            }
            (None, None) => anyhow::bail!("either --annotations or --command is required"),
        }
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (`info` by default).
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
