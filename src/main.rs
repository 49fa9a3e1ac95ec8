//! hypso - height-coordinate interpolation for terrain-following model output
//!
//! This is the main entry point for the hypso application.

use tracing::{error, info};

use hypso::{logging, Config, HeightInterpolator};

fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, input_path) = Config::load()?;

    logging::init_tracing(&config.log_level);
    info!("Starting hypso v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration before touching any data
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let run_id = logging::generate_run_id();
    info!(
        run_id = %run_id,
        input = %input_path.display(),
        heights = ?config.interp.heights,
        "Beginning height interpolation"
    );

    let interpolator = HeightInterpolator::new(config)?;
    let output = interpolator.interp_file(&input_path).map_err(|e| {
        logging::log_error(&e, "height interpolation failed");
        e
    })?;

    info!("Wrote {}", output.display());
    Ok(())
}
