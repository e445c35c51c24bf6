//! Stream function of a channel flow around an obstacle
//!
//! Solves for the potential on an `L x L` grid, derives the velocity field
//! and writes it to a binary file of `(vx, vy)` pairs.
//!
//! Run with MPI: `mpirun -n 4 cargo run --release --features mpi --example stream_function`
//! Without MPI the ranks are emulated by threads: `cargo run --example stream_function -- --ranks 4`
use clap::Parser;
use poisson2d::io::write_binary_tiled;
use poisson2d::traits::Transport;
use poisson2d::{Bound, Boundary, BoundaryType, ProcessTopology, Result, RunParameters, Solver};
use std::path::PathBuf;

/// Channel flow stream function solver
#[derive(Parser)]
#[command(name = "stream_function", version)]
struct Cli {
    /// Size of the square grid
    #[arg(short = 'L', long, default_value_t = 102)]
    size: usize,

    /// Stopping criterion of the solver
    #[arg(long, default_value_t = 1e-2)]
    epsilon: f64,

    /// Maximum number of iterations
    #[arg(long, default_value_t = 10000)]
    max_iter: usize,

    /// Number of thread-emulated ranks when built without MPI
    #[arg(long, default_value_t = 4)]
    ranks: usize,

    /// Output file for the velocity field
    #[arg(long, default_value = "vec.bin")]
    output: PathBuf,
}

/// Inlet on the top and left walls, outlet on the bottom, and a cross
/// shaped obstacle in the middle of the domain.
fn channel_bound(l: usize) -> Bound<f64> {
    let half = l / 2;
    let quarter = l / 4;
    let three_quarters = 3 * l / 4;
    let lf = l as f64;
    let mut bound = Bound::new(BoundaryType::Dirichlet);

    // obstacle
    bound.add_boundary(Boundary::constant(
        move |i, j| i == half && j >= quarter && j <= three_quarters,
        0.0,
    ));
    bound.add_boundary(Boundary::constant(
        move |i, j| j == half && i >= quarter && i <= three_quarters,
        0.0,
    ));

    // top wall
    bound.add_boundary(Boundary::constant(move |i, j| i == 0 && j <= quarter, 14.0));
    bound.add_boundary(Boundary::new(
        move |i, j| i == 0 && j > quarter && j < half,
        move |_, j| 14.0 - (j as f64 - quarter as f64) * 56.0 / lf,
    ));
    bound.add_boundary(Boundary::constant(move |i, j| i == 0 && j >= half, 0.0));

    // bottom wall
    bound.add_boundary(Boundary::constant(move |i, _| i == l - 1, 7.0));

    // left wall
    bound.add_boundary(Boundary::constant(move |i, j| j == 0 && i <= half, 14.0));
    bound.add_boundary(Boundary::new(
        move |i, j| j == 0 && i > half && i < three_quarters,
        move |i, _| 7.0 + (three_quarters as f64 - i as f64) * 28.0 / lf,
    ));
    bound.add_boundary(Boundary::constant(
        move |i, j| j == 0 && i >= three_quarters,
        7.0,
    ));

    // right wall
    bound.add_boundary(Boundary::constant(move |i, j| j == l - 1 && i <= half, 0.0));
    bound.add_boundary(Boundary::new(
        move |i, j| j == l - 1 && i > half && i < three_quarters,
        move |i, _| (i as f64 - half as f64) * 28.0 / lf,
    ));
    bound.add_boundary(Boundary::constant(
        move |i, j| j == l - 1 && i >= three_quarters,
        7.0,
    ));

    bound
}

fn run<C: Transport>(topology: ProcessTopology<C>, cli: &Cli) -> Result<()> {
    let mut params = RunParameters::square(cli.size, cli.epsilon, cli.max_iter);
    params.broadcast(&topology);
    params.validate()?;

    let solver = Solver::new(params.epsilon, params.max_iter);
    let bound = channel_bound(params.rows);
    let report = solver.solve_distributed(params.rows, params.cols, &bound, &topology)?;
    let gradient = solver.gradient_distributed(&report.field, &topology);
    let velocity = solver.velocity(&gradient);
    write_binary_tiled(&velocity, &report.tile, &cli.output, &topology)?;

    if topology.rank() == 0 {
        println!(
            "{:?} after {} iterations (metric {:?}), velocity written to {}",
            report.status,
            report.iterations,
            report.residual,
            cli.output.display()
        );
    }
    Ok(())
}

#[cfg(feature = "mpi")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    run(ProcessTopology::initialize()?, &cli)
}

#[cfg(not(feature = "mpi"))]
fn main() -> Result<()> {
    use poisson2d::transport::LocalGroup;

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = &cli;
    let endpoints = LocalGroup::new(cli.ranks)?;
    std::thread::scope(|s| {
        let handles = endpoints
            .into_iter()
            .map(|t| s.spawn(move || run(ProcessTopology::new(t), cli)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| panic!("A rank panicked")))
            .collect::<Result<Vec<_>>>()
    })?;
    Ok(())
}
