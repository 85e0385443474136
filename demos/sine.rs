//! Derivative of `sin(x)` on `[0, 2π)` replicated over several packed rows, compared against
//! the analytic derivative.
//!
//! Run with: `cargo run --example sine -- --dx 0.05 --rows 3 [--csv]`
use std::f64::consts::PI;

use anyhow::{ensure, Context, Result};
use clap::{Arg, ArgAction, Command};
use fdm_elastic::{boundary, derive_with, Concurrency, DeriveConfig, Order};

fn max_interior_error(approx: &[f64], exact: &[f64], n: usize, order: Order) -> f64 {
    let len = approx.len();
    (0..len)
        .filter(|&i| !boundary::is_corrected(i, len, n, order))
        .map(|i| (approx[i] - exact[i]).abs())
        .fold(0., f64::max)
}

fn main() -> Result<()> {
    let matches = Command::new("sine")
        .about("Compares the packed finite difference derivative of sin(x) with cos(x).")
        .arg(Arg::new("dx")
            .long("dx")
            .value_name("DX")
            .default_value("0.05")
            .value_parser(clap::value_parser!(f64)))
        .arg(Arg::new("rows")
            .long("rows")
            .value_name("ROWS")
            .default_value("3")
            .value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("serial")
            .long("serial")
            .help("Do not split rows over the rayon pool")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("csv")
            .long("csv")
            .help("Print x, order 2, order 4 and exact values as CSV")
            .action(ArgAction::SetTrue))
        .get_matches();

    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let dx = *matches.get_one::<f64>("dx").context("missing dx")?;
    let rows = *matches.get_one::<usize>("rows").context("missing rows")?;
    ensure!(dx > 0. && dx < PI, "dx must lie in (0, π)");
    ensure!(rows > 0, "need at least one row");

    let n = (2. * PI / dx).ceil() as usize;
    let x: Vec<f64> = (0..n).map(|k| k as f64 * dx).collect();
    let field: Vec<f64> = x.iter().map(|x| x.sin()).collect::<Vec<_>>().repeat(rows);
    let exact: Vec<f64> = x.iter().map(|x| x.cos()).collect::<Vec<_>>().repeat(rows);
    // both stencils are centred half a cell to the right of the sample
    let staggered: Vec<f64> = x.iter().map(|x| (x + 0.5 * dx).cos()).collect::<Vec<_>>().repeat(rows);

    log::info!("{} rows of {} samples, dx = {}", rows, n, dx);

    let mut results = Vec::new();
    for &order in &[Order::Second, Order::Fourth] {
        let mut config = DeriveConfig::new(n, dx, order);
        if matches.get_flag("serial") {
            config.concurrency = Concurrency::Serial;
        }
        let d = derive_with(&field, &config)?;
        log::info!("order {}: max error {:.3e} against cos(x), {:.3e} against cos(x + dx/2)",
                   order,
                   max_interior_error(&d, &exact, n, order),
                   max_interior_error(&d, &staggered, n, order));
        results.push(d);
    }

    if matches.get_flag("csv") {
        println!("x,order2,order4,exact");
        for i in 0..field.len() {
            println!("{},{},{},{}", i as f64 * dx, results[0][i], results[1][i], exact[i]);
        }
    }
    Ok(())
}
