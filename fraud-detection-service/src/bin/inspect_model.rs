use anyhow::{Context, Result};
use clap::Parser;
use fraud_model::{Classifier, ModelInfo, read_model, resolve_model_path, service_base_dir};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Load a model artifact and print its pipeline description.
#[derive(Parser, Debug)]
#[command(name = "inspect_model")]
struct Args {
    /// Artifact path; relative paths resolve against the executable directory
    model: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let path = resolve_model_path(&service_base_dir(), args.model.as_deref());

    print!("{}", inspect(&path).await?);
    Ok(())
}

async fn inspect(path: &Path) -> Result<String> {
    let model = read_model(path)
        .await
        .with_context(|| format!("failed to load model from {}", path.display()))?;
    Ok(render(&model.describe()))
}

fn render(info: &ModelInfo) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "Model: {} ({})", info.name, info.model_type);
    let _ = writeln!(out, "Number of features: {}", info.n_features);
    let _ = writeln!(out, "Feature names:");
    for name in &info.feature_names {
        let _ = writeln!(out, "  - {}", name);
    }
    let _ = writeln!(out, "Pipeline steps:");
    for step in &info.steps {
        let _ = writeln!(out, "  - {}: {}", step.name, step.kind);
    }
    for (column, categories) in &info.categories {
        let _ = writeln!(out, "  {}: {:?}", column, categories);
    }
    let _ = writeln!(out, "Classes: {:?}", info.classes);
    out
}
