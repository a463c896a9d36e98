use anyhow::{bail, Result};
use digero_engine::CategorizationEngine;

pub fn predict(engine: &CategorizationEngine, args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("predict needs a transaction description");
    }
    let description = args.join(" ");
    let prediction = engine.predict(&description);
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

pub async fn correct(engine: &CategorizationEngine, args: &[String]) -> Result<()> {
    let [description, label] = args else {
        bail!("correct needs exactly <description> <label>");
    };
    let summary = engine.record_correction(description, label).await?;
    if summary.trained {
        tracing::info!(samples = summary.samples, "Retrained after correction");
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub async fn train(engine: &CategorizationEngine) -> Result<()> {
    let summary = engine.retrain().await?;
    if !summary.trained {
        tracing::warn!(
            samples = summary.samples,
            "Not enough corrections to train a model"
        );
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub fn status(engine: &CategorizationEngine) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&engine.status())?);
    Ok(())
}
