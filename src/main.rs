// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use eikonal_fmm::core::{GridData, SlownessField};
use eikonal_fmm::io;
use eikonal_fmm::marching::{FmmSolver, ProgressInfo};
use eikonal_fmm::media;
use eikonal_fmm::raytrace::{trace_rays, StopReason, TraceOptions};

#[derive(Parser)]
#[command(
    name = "eikonal-fmm",
    about = "Fast Marching eikonal solver with characteristic ray tracing"
)]
struct Cli {
    /// Grid size as rows,cols (ignored for file-based slowness)
    #[arg(short = 's', long, default_value = "256,256")]
    size: String,

    /// Source cell as row,col (defaults to the exit in maze mode)
    #[arg(long)]
    source: Option<String>,

    /// Ray target as row,col (repeatable; defaults to the entrance in maze mode)
    #[arg(long, num_args = 1)]
    target: Vec<String>,

    /// Grid spacing
    #[arg(long, default_value = "1.0")]
    spacing: f64,

    /// Slowness field: "uniform:<n>", "gradient:<min>,<max>",
    /// "interface:<frac>,<n1>,<n2>", "lens:<radius_frac>,<n_lens>,<n_bg>",
    /// "maze:<size>,<seed>", "slowness-file:<path>", or "velocity-file:<path>"
    #[arg(long, default_value = "uniform:1.0")]
    slowness: String,

    /// Ray integration step, in cells
    #[arg(long, default_value = "0.5")]
    step: f64,

    /// Maximum ray integration steps
    #[arg(long, default_value = "30000")]
    max_steps: usize,

    /// Arrival-time output path (.npy or .mat)
    #[arg(short = 'o', long, default_value = "arrival.npy")]
    output: PathBuf,

    /// Ray output path (.npy or .mat); rays are traced only when targets exist
    #[arg(long)]
    rays_output: Option<PathBuf>,

    /// Number of Rayon worker threads for batch ray tracing
    #[arg(long)]
    threads: Option<usize>,

    /// Log solver progress (see --progress-interval)
    #[arg(long)]
    progress: bool,

    /// Progress reporting interval in frozen cells (used with --progress)
    #[arg(long, default_value = "65536")]
    progress_interval: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

/// A slowness field plus the endpoints a generator suggests for it.
struct Medium {
    field: SlownessField,
    default_source: Option<[usize; 2]>,
    default_target: Option<[f64; 2]>,
}

impl From<SlownessField> for Medium {
    fn from(field: SlownessField) -> Self {
        Medium {
            field,
            default_source: None,
            default_target: None,
        }
    }
}

fn init_tracing(verbose: u8, progress: bool) {
    let level = match verbose {
        0 if progress => "info",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_list<T: std::str::FromStr>(s: &str, what: &str) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.split(',')
        .map(|p| p.trim().parse::<T>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: '{}'", what, s))
}

fn parse_pair<T: std::str::FromStr + Copy>(s: &str, what: &str) -> Result<[T; 2]>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match parse_list::<T>(s, what)?.as_slice() {
        &[a, b] => Ok([a, b]),
        parts => bail!("{} expects 2 components, got {}", what, parts.len()),
    }
}

fn build_medium(mode: &str, shape: [usize; 2]) -> Result<Medium> {
    if let Some(val) = mode.strip_prefix("uniform:") {
        let n: f64 = val.parse().context("invalid uniform slowness value")?;
        return Ok(media::homogeneous(shape, n)?.into());
    }

    if let Some(params) = mode.strip_prefix("gradient:") {
        let [n_min, n_max] = parse_pair::<f64>(params, "gradient:<min>,<max>")?;
        return Ok(media::vertical_gradient(shape, n_min, n_max)?.into());
    }

    if let Some(params) = mode.strip_prefix("interface:") {
        let p = parse_list::<f64>(params, "interface:<frac>,<n1>,<n2>")?;
        let &[frac, n1, n2] = p.as_slice() else {
            bail!("interface mode expects 'interface:<frac>,<n1>,<n2>', got '{}'", mode);
        };
        return Ok(media::planar_interface(shape, frac, n1, n2)?.into());
    }

    if let Some(params) = mode.strip_prefix("lens:") {
        let p = parse_list::<f64>(params, "lens:<radius_frac>,<n_lens>,<n_bg>")?;
        let &[radius, n_lens, n_bg] = p.as_slice() else {
            bail!("lens mode expects 'lens:<radius_frac>,<n_lens>,<n_bg>', got '{}'", mode);
        };
        return Ok(media::circular_lens(shape, [0.5, 0.5], radius, n_lens, n_bg)?.into());
    }

    if let Some(params) = mode.strip_prefix("maze:") {
        let [size, seed] = parse_pair::<u64>(params, "maze:<size>,<seed>")?;
        let size = usize::try_from(size).context("maze size does not fit in usize")?;
        let maze = media::maze(shape, size, seed)?;
        return Ok(Medium {
            field: maze.field,
            default_source: Some(maze.end),
            default_target: Some([maze.start[0] as f64, maze.start[1] as f64]),
        });
    }

    if let Some(path) = mode.strip_prefix("slowness-file:") {
        let field = io::load_slowness(Path::new(path))
            .with_context(|| format!("failed to load slowness from '{}'", path))?;
        return Ok(field.into());
    }

    if let Some(path) = mode.strip_prefix("velocity-file:") {
        let field = io::load_velocity_as_slowness(Path::new(path))
            .with_context(|| format!("failed to load velocity from '{}'", path))?;
        return Ok(field.into());
    }

    bail!(
        "unknown --slowness mode: '{}'. Expected 'uniform:<n>', 'gradient:<min>,<max>', \
         'interface:<frac>,<n1>,<n2>', 'lens:<radius_frac>,<n_lens>,<n_bg>', \
         'maze:<size>,<seed>', 'slowness-file:<path>', or 'velocity-file:<path>'",
        mode
    );
}

fn run(cli: &Cli) -> Result<()> {
    let shape = parse_pair::<usize>(&cli.size, "--size")?;
    let medium = build_medium(&cli.slowness, shape)?;
    let field = &medium.field;

    let source = match (&cli.source, medium.default_source) {
        (Some(s), _) => parse_pair::<usize>(s, "--source")?,
        (None, Some(s)) => s,
        (None, None) => bail!("--source must be specified for this slowness mode"),
    };

    let mut targets = cli
        .target
        .iter()
        .map(|t| parse_pair::<f64>(t, "--target"))
        .collect::<Result<Vec<_>>>()?;
    if targets.is_empty() {
        targets.extend(medium.default_target);
    }

    let mut solver = FmmSolver::new(cli.spacing)?;
    if cli.progress {
        solver = solver
            .with_progress_interval(cli.progress_interval)
            .with_progress(Box::new(|p: ProgressInfo| {
                info!(
                    frozen = p.cells_frozen,
                    band = p.narrow_band_len,
                    stale = p.stale_skipped,
                    frontier = p.frontier_time,
                    elapsed_s = p.elapsed.as_secs_f64(),
                    "marching"
                );
            }));
    }

    let (times, stats) = solver.solve_with_stats(field, source, None)?;
    info!(
        rows = field.shape()[0],
        cols = field.shape()[1],
        frozen = stats.cells_frozen,
        unreached = stats.unreached,
        max_time = times.max_finite().unwrap_or(f64::NAN),
        elapsed_s = stats.elapsed.as_secs_f64(),
        "solve complete"
    );

    io::save_arrival_times(&times, &cli.output)
        .with_context(|| format!("failed to write '{}'", cli.output.display()))?;

    if targets.is_empty() {
        return Ok(());
    }

    let opts = TraceOptions {
        step: cli.step,
        max_steps: cli.max_steps,
        ..TraceOptions::default()
    };
    let source_pt = [source[0] as f64, source[1] as f64];
    let rays = trace_rays(&times, &targets, source_pt, &opts);
    for (target, ray) in targets.iter().zip(&rays) {
        info!(
            row = target[0],
            col = target[1],
            points = ray.len(),
            length = ray.arc_length(),
            stop = ?ray.stop(),
            "ray traced"
        );
    }
    let reached = rays
        .iter()
        .filter(|r| r.stop() == StopReason::ReachedSource)
        .count();
    info!(reached, total = rays.len(), "rays complete");

    if let Some(path) = &cli.rays_output {
        io::save_rays(&rays, path)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.progress);

    match cli.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .context("failed to build thread pool")?;
            pool.install(|| run(&cli))
        }
        None => run(&cli),
    }
}
