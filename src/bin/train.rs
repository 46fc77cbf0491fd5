use std::env;
use std::process;

use log::info;
use target_locator::config::LocatorConfig;
use target_locator::pipeline::{heading_correction, Provenance, TargetLocator};
use target_locator::render::{Renderer, SilhouetteRenderer};
use target_locator::telemetry::LogTelemetry;

/// Half of the camera's horizontal field of view.
const HALF_FOV_DEGREES: f64 = 30.0;

fn score(locator: &mut TargetLocator, renderer: &SilhouetteRenderer) -> target_locator::Result<()> {
    let config = locator.config().clone();
    let tolerance = config.tolerance;
    let (mut total, mut within) = (0, 0);
    for (size, position) in config.grid.points() {
        if size % 25 != 0 || position % 40 != 0 {
            continue;
        }
        let frame = renderer.render(f64::from(size), f64::from(position));
        let lit = frame.count_above(0);
        if lit == 0 {
            println!("size {size:>3}  target {position:>3}  nothing in frame, skipped");
            continue;
        }
        let offset = locator.locate(&frame)?;
        let error = (offset - f64::from(position)).abs();
        total += 1;
        if error <= tolerance.tolerance(size) {
            within += 1;
        }
        println!(
            "size {:>3}  target {:>3}  lit {:>5}  predicted {:>4}  heading {:>6.1}°",
            size,
            position,
            lit,
            offset,
            heading_correction(offset, config.frame.width, HALF_FOV_DEGREES)
        );
    }
    println!("{within} of {total} frames within tolerance");
    Ok(())
}

fn run(config: LocatorConfig) -> target_locator::Result<()> {
    let renderer = SilhouetteRenderer::new(config.frame);
    let mut locator = TargetLocator::new(config, &renderer, &mut LogTelemetry)?;
    match locator.provenance() {
        Provenance::Loaded => info!("using saved model"),
        Provenance::Trained { epochs, converged } => {
            info!("trained for {epochs} epochs (converged: {converged})")
        }
    }
    score(&mut locator, &renderer)
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [config.json]", args[0]);
        process::exit(1);
    }

    let config = match args.get(1) {
        Some(path) => match LocatorConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading {path}: {e}");
                process::exit(1);
            }
        },
        None => LocatorConfig::default(),
    };

    if let Err(e) = run(config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
