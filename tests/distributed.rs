use approx::assert_relative_eq;
use poisson2d::io::{write_binary, write_binary_tiled};
use poisson2d::topology::TileExtent;
use poisson2d::transport::{LocalGroup, LocalTransport};
use poisson2d::{Bound, Boundary, BoundaryType, Error, Grid, ProcessTopology, SolveReport, Solver};
use rand::prelude::*;
use rand::SeedableRng;
use std::thread;

fn run_group<R: Send>(
    size: usize,
    f: impl Fn(ProcessTopology<LocalTransport>) -> R + Sync,
) -> Vec<R> {
    let f = &f;
    thread::scope(|s| {
        let handles = LocalGroup::new(size)
            .unwrap()
            .into_iter()
            .map(|t| s.spawn(move || f(ProcessTopology::new(t))))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    })
}

fn channel_bound(n: usize) -> Bound<f64> {
    let mut bound = Bound::new(BoundaryType::Dirichlet);
    bound.add_boundary(Boundary::constant(move |i, j| i == n / 2 && j >= n / 4 && j <= 3 * n / 4, 0.0));
    bound.add_boundary(Boundary::new(
        |i, _| i == 0,
        move |_, j| 14.0 - j as f64 * 14.0 / n as f64,
    ));
    bound.add_boundary(Boundary::constant(move |i, _| i == n - 1, 7.0));
    bound.add_boundary(Boundary::constant(move |_, j| j == 0 || j == n - 1, 3.0));
    bound
}

fn solver(max_iter: usize) -> Solver<f64> {
    let mut solver = Solver::new(0.0, max_iter);
    solver.set_source(|i, j| ((i * 7 + j * 3) % 5) as f64 * 0.01);
    solver
}

fn assemble<T: Clone + Default>(rows: usize, cols: usize, tiles: &[(TileExtent, Grid<T>)]) -> Grid<T> {
    let mut global = Grid::new(rows, cols);
    for (tile, field) in tiles {
        for i in 0..tile.rows {
            for j in 0..tile.cols {
                global[tile.global(i, j)] = field[(i, j)].clone();
            }
        }
    }
    global
}

fn fields(reports: Vec<SolveReport<f64>>) -> Vec<(TileExtent, Grid<f64>)> {
    reports.into_iter().map(|r| (r.tile, r.field)).collect()
}

#[test]
fn test_fixed_iterations_match_serial() {
    let n = 12;
    let serial = solver(40).solve(n, n, &channel_bound(n)).unwrap();
    for size in [1, 2, 4] {
        let reports = run_group(size, |topology| {
            solver(40)
                .solve_distributed(n, n, &channel_bound(n), &topology)
                .unwrap()
        });
        assert!(reports.iter().all(|r| r.iterations == 40));
        let global = assemble(n, n, &fields(reports));
        assert_eq!(global, serial.field, "{} processes", size);
    }
}

#[test]
fn test_converged_solution_matches_serial() {
    let n = 16;
    let mut reference = solver(5000);
    reference.set_epsilon(1e-12);
    let serial = reference.solve(n, n, &channel_bound(n)).unwrap();
    assert!(serial.converged());

    let reports = run_group(4, |topology| {
        let mut s = solver(5000);
        s.set_epsilon(1e-12);
        s.solve_distributed(n, n, &channel_bound(n), &topology).unwrap()
    });
    assert!(reports.iter().all(|r| r.converged()));
    // every rank sees the same global metric, hence stops together
    assert!(reports.iter().all(|r| r.iterations == reports[0].iterations));
    assert!(reports.iter().all(|r| r.residual == reports[0].residual));

    let global = assemble(n, n, &fields(reports));
    for (a, b) in global.data().iter().zip(serial.field.data()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9, max_relative = 1e-9);
    }
}

#[test]
fn test_uneven_grid_rejected() {
    let results = run_group(4, |topology| {
        Solver::<f64>::default().solve_distributed(101, 100, &channel_bound(101), &topology)
    });
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(Error::Configuration(_)))));

    // a 4x4 mesh splits each axis four ways
    let results = run_group(16, |topology| {
        assert_eq!(topology.dims(), [4, 4]);
        Solver::<f64>::default().solve_distributed(101, 100, &channel_bound(101), &topology)
    });
    assert_eq!(results.len(), 16);
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(Error::Configuration(_)))));
}

#[test]
fn test_metric_covers_owned_cells_once() {
    let n = 8;
    let squared_change = |prev: &Grid<f64>, curr: &Grid<f64>, exclude: bool| {
        let skip = usize::from(exclude);
        let mut total = 0.0;
        for i in skip..prev.rows() - skip {
            for j in skip..prev.cols() - skip {
                let d = curr[(i, j)] - prev[(i, j)];
                total += d * d;
            }
        }
        total
    };

    // without exclusion the tiles partition the grid, so the summed
    // squared change equals the serial one
    let mut serial = solver(6);
    serial.set_norm(squared_change);
    let serial = serial.solve(n, n, &channel_bound(n)).unwrap();
    let reports = run_group(4, |topology| {
        let mut s = solver(6);
        s.set_norm(squared_change);
        s.solve_distributed(n, n, &channel_bound(n), &topology).unwrap()
    });
    for r in &reports {
        assert_relative_eq!(r.residual.unwrap(), serial.residual.unwrap(), max_relative = 1e-12);
    }

    // the metric only ever sees the owned cells of each tile
    for exclude in [false, true] {
        let reports = run_group(4, |topology| {
            let mut s = Solver::new(1e6, 10);
            s.options_mut().set_exclude_outer_ring(exclude);
            s.set_norm(|prev, _, exclude| {
                assert_eq!(prev.shape(), [4, 4]);
                if exclude {
                    4.0
                } else {
                    16.0
                }
            });
            s.solve_distributed(n, n, &channel_bound(n), &topology).unwrap()
        });
        let expected = if exclude { 16.0 } else { 64.0 };
        assert!(reports.iter().all(|r| r.residual == Some(expected)));
        assert!(reports.iter().all(|r| r.iterations == 1));
    }
}

#[test]
fn test_gradient_matches_serial() {
    let n = 8;
    let serial_solution = solver(25).solve(n, n, &channel_bound(n)).unwrap();
    let serial = Solver::<f64>::default().gradient(&serial_solution.field);

    let tiles = run_group(4, |topology| {
        let report = solver(25)
            .solve_distributed(n, n, &channel_bound(n), &topology)
            .unwrap();
        let gradient = Solver::<f64>::default().gradient_distributed(&report.field, &topology);
        (report.tile, gradient)
    });
    let global = assemble(n, n, &tiles);
    assert_eq!(global, serial);

    let velocity = Solver::<f64>::default().velocity(&global);
    assert_eq!(velocity[(3, 0)].1, 0.0);
    assert_eq!(velocity[(3, 4)], (global[(3, 4)].1, -global[(3, 4)].0));
}

#[test]
fn test_gradient_of_random_field() {
    let (rows, cols) = (6, 10);
    let mut rng = StdRng::seed_from_u64(0);
    let mut field = Grid::<f64>::new(rows, cols);
    for v in field.data_mut() {
        *v = rng.gen::<f64>();
    }
    let serial = Solver::<f64>::default().gradient(&field);

    let tiles = run_group(2, |topology| {
        let tile = topology.tile(rows, cols).unwrap();
        let mut local = Grid::new(tile.rows, tile.cols);
        local.fill_with(|i, j| field[tile.global(i, j)]);
        (tile, Solver::<f64>::default().gradient_distributed(&local, &topology))
    });
    assert_eq!(assemble(rows, cols, &tiles), serial);
}

#[test]
fn test_tiled_write_matches_serial_write() {
    let n = 8;
    let dir = std::env::temp_dir();
    let tiled = dir.join(format!("poisson2d_tiled_{}.bin", std::process::id()));
    let plain = dir.join(format!("poisson2d_plain_{}.bin", std::process::id()));

    let serial = solver(10).solve(n, n, &channel_bound(n)).unwrap();
    write_binary(&serial.field, &plain).unwrap();

    run_group(4, |topology| {
        let report = solver(10)
            .solve_distributed(n, n, &channel_bound(n), &topology)
            .unwrap();
        write_binary_tiled(&report.field, &report.tile, &tiled, &topology).unwrap();
    });

    assert_eq!(std::fs::read(&tiled).unwrap(), std::fs::read(&plain).unwrap());
    std::fs::remove_file(tiled).unwrap();
    std::fs::remove_file(plain).unwrap();
}
