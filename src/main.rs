use anyhow::{Context, Result};
use elprice_features::{config::Config, output, telemetry, Pipeline};
use telemetry::init_tracing;
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load().context("loading configuration")?;
    info!(
        hour = cfg.pipeline.hour,
        start = %cfg.pipeline.start,
        end = %cfg.pipeline.end,
        country = %cfg.pipeline.country,
        parallel = cfg.pipeline.parallel,
        "starting feature pipeline"
    );

    let pipeline = Pipeline::from_config(cfg.clone())?;
    let table = pipeline.run().context("building feature table")?;

    output::write_table(&table, &cfg.output.path, cfg.output.format)
        .with_context(|| format!("writing {}", cfg.output.path.display()))?;

    let frame = table.frame();
    info!(
        rows = table.len(),
        columns = table.columns().len(),
        first = ?frame.first_timestamp(),
        last = ?frame.last_timestamp(),
        path = %cfg.output.path.display(),
        "feature table written"
    );
    Ok(())
}
