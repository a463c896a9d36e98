use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use digero_core::EngineConfig;
use digero_engine::CategorizationEngine;

mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let mut data_dir: Option<PathBuf> = None;
    if let Some(pos) = args.iter().position(|a| a == "--data-dir") {
        if pos + 1 >= args.len() {
            bail!("--data-dir requires a path");
        }
        args.remove(pos);
        data_dir = Some(PathBuf::from(args.remove(pos)));
    }

    let data_dir = match data_dir {
        Some(dir) => dir,
        None => directories::ProjectDirs::from("com", "digero", "Digero")
            .context("Failed to resolve the app data directory")?
            .data_dir()
            .to_path_buf(),
    };

    let Some((cmd, rest)) = args.split_first() else {
        usage();
    };
    if !matches!(cmd.as_str(), "predict" | "correct" | "train" | "status") {
        eprintln!("Unknown command: {cmd}");
        usage();
    }

    let config = load_config(&data_dir).await?;
    let engine = CategorizationEngine::open(&data_dir, config)
        .await
        .with_context(|| format!("Failed to open engine at {}", data_dir.display()))?;

    match cmd.as_str() {
        "predict" => commands::predict(&engine, rest),
        "correct" => commands::correct(&engine, rest).await,
        "train" => commands::train(&engine).await,
        "status" => commands::status(&engine),
        _ => unreachable!(),
    }
}

/// Reads `digero.toml` from the data directory; defaults apply when the
/// file is absent.
async fn load_config(data_dir: &Path) -> Result<EngineConfig> {
    match tokio::fs::read_to_string(data_dir.join("digero.toml")).await {
        Ok(content) => {
            EngineConfig::from_toml(&content).context("Invalid digero.toml")
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfig::default()),
        Err(e) => Err(e.into()),
    }
}

fn usage() -> ! {
    eprintln!(
        "Usage: digero [--data-dir PATH] <command>\n\
         \n\
         Commands:\n\
         \x20 predict <description...>      Categorise a transaction description\n\
         \x20 correct <description> <label> Record a correction (retrains when due)\n\
         \x20 train                         Retrain from the full correction log\n\
         \x20 status                        Show model and category state"
    );
    std::process::exit(2);
}
