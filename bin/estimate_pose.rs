use std::path::PathBuf;

use bearing_pose::boundary::{EstimatorOptions, StopStrategyKind};
use bearing_pose::core::refine_pose;
use bearing_pose::geometry::Pose;
use bearing_pose::{init_logger, load_correspondences};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    /// Stop when the gradient norm drops below the threshold
    GradientNorm,
    /// Stop when the objective changes by less than the threshold
    ObjectiveDelta,
}

impl From<Strategy> for StopStrategyKind {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::GradientNorm => StopStrategyKind::GradientNorm,
            Strategy::ObjectiveDelta => StopStrategyKind::ObjectiveDelta,
        }
    }
}

#[derive(Parser)]
#[command(name = "estimate_pose")]
#[command(about = "Estimate translation and yaw from landmarks and observed bearings")]
struct Args {
    /// Correspondence file, one `px py pz cx cy cz bx by bz` line per correspondence
    #[arg(short, long)]
    input: PathBuf,

    /// Initial guess as tx,ty,tz,rotz
    #[arg(long, value_parser = parse_pose, default_value = "0,0,0,0", allow_hyphen_values = true)]
    initial: Pose,

    /// Convergence test
    #[arg(short, long, value_enum, default_value = "gradient-norm")]
    strategy: Strategy,

    /// Convergence threshold (0 selects the default of 1e-7)
    #[arg(short, long, default_value = "0")]
    threshold: f64,

    /// Maximum number of optimization iterations
    #[arg(short, long, default_value = "100")]
    max_iterations: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_pose(value: &str) -> Result<Pose, String> {
    let components = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid pose component: {e}"))?;

    Pose::from_slice(&components)
        .ok_or_else(|| format!("expected 4 comma-separated values, got {}", components.len()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    init_logger();

    let options = EstimatorOptions::new()
        .with_verbose(args.verbose)
        .with_stop_strategy(args.strategy.into())
        .with_stop_threshold(args.threshold)
        .with_max_iter(args.max_iterations);

    let correspondences = load_correspondences(&args.input)?;
    info!(
        "Loaded {} correspondences from {}",
        correspondences.len(),
        args.input.display()
    );
    if correspondences.len() < 4 {
        warn!(
            "Only {} correspondences: the pose is not fully determined",
            correspondences.len()
        );
    }

    let result = refine_pose(&correspondences, &args.initial, options.to_optimizer_config())?;

    info!("Initial pose:  {}", args.initial);
    info!("Final pose:    {}", result.parameters);
    info!("Wrapped yaw:   {:.6}", result.parameters.normalized().rotz);
    info!(
        "Residual:      {:.9e} (initial {:.9e})",
        result.final_cost, result.initial_cost
    );
    info!(
        "Status:        {} after {} iterations in {:?}",
        result.status, result.iterations, result.elapsed_time
    );
    info!("{}", result.convergence_info);

    Ok(())
}
