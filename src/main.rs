use anyhow::Result;

fn main() -> Result<()> {
    env_logger::init();

    let model_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| plinth::DEFAULT_MODEL_PATH.to_string());

    let app = plinth::viewer(&model_path)?;
    app.run()?;
    Ok(())
}
