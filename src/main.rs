use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use food_order_sim::clock::WallClock;
use food_order_sim::dispatcher::RandomDispatcher;
use food_order_sim::display::Display;
use food_order_sim::kitchen::{Kitchen, KitchenConfig, ShelfSpec};
use food_order_sim::order::TimeUnit;
use food_order_sim::policy::DefaultOverflowPolicy;
use food_order_sim::source::JsonFileSource;

const DEFAULT_LOG_PATH: &str = "food-order-sim.log";

/// Fourteen positional arguments, in the order spec.md §6 fixes:
/// orders file, time unit, average rate, driver min/max, then
/// capacity+multiplier pairs for hot/cold/frozen/overflow, then
/// verbose. `main` enforces "all or nothing" before this is parsed —
/// clap alone would happily accept a partial positional list.
#[derive(Parser, Debug)]
#[command(name = "food-order-sim", about = "Fulfillment kitchen shelf-decay simulator")]
struct Args {
    /// Path to a JSON array of {name, temp, shelfLife, decayRate} orders
    #[arg(default_value = "orders.json")]
    orders_path: PathBuf,

    /// Time unit the shelf-life/decay numbers and the clock are expressed in
    #[arg(default_value = "seconds")]
    time_unit: String,

    /// Average orders emitted per time unit (Poisson-paced)
    #[arg(default_value_t = 1.0)]
    average_rate: f64,

    /// Minimum driver pickup delay, in time units
    #[arg(default_value_t = 3)]
    driver_min: u64,

    /// Maximum driver pickup delay, in time units
    #[arg(default_value_t = 8)]
    driver_max: u64,

    #[arg(default_value_t = 10)]
    hot_capacity: usize,
    #[arg(default_value_t = 1.0)]
    hot_multiplier: f64,

    #[arg(default_value_t = 10)]
    cold_capacity: usize,
    #[arg(default_value_t = 1.0)]
    cold_multiplier: f64,

    #[arg(default_value_t = 10)]
    frozen_capacity: usize,
    #[arg(default_value_t = 1.0)]
    frozen_multiplier: f64,

    #[arg(default_value_t = 15)]
    overflow_capacity: usize,
    #[arg(default_value_t = 2.0)]
    overflow_multiplier: f64,

    #[arg(default_value_t = false)]
    verbose: bool,
}

const ARG_COUNT: usize = 14;

fn main() -> Result<()> {
    env_logger::init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    if !raw.is_empty() && raw.len() != ARG_COUNT {
        eprintln!(
            "expected 0 or {ARG_COUNT} arguments: orders_path time_unit average_rate driver_min \
             driver_max hot_capacity hot_multiplier cold_capacity cold_multiplier frozen_capacity \
             frozen_multiplier overflow_capacity overflow_multiplier verbose"
        );
        std::process::exit(2);
    }

    let args = Args::parse();
    let time_unit: TimeUnit = args
        .time_unit
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("invalid time unit")?;

    let config = KitchenConfig {
        time_unit,
        temp_shelves: vec![
            ShelfSpec { temp: "hot".into(), capacity: args.hot_capacity, multiplier: args.hot_multiplier },
            ShelfSpec { temp: "cold".into(), capacity: args.cold_capacity, multiplier: args.cold_multiplier },
            ShelfSpec { temp: "frozen".into(), capacity: args.frozen_capacity, multiplier: args.frozen_multiplier },
        ],
        overflow_capacity: args.overflow_capacity,
        overflow_multiplier: args.overflow_multiplier,
    };

    let kitchen = Kitchen::new(
        config,
        Arc::new(WallClock::new(time_unit)),
        Arc::new(DefaultOverflowPolicy),
        Arc::new(RandomDispatcher::new(args.driver_min, args.driver_max)),
    );

    let source = JsonFileSource::new(&args.orders_path, args.average_rate, time_unit);
    let mut display = Display::new(DEFAULT_LOG_PATH, args.verbose)?;

    info!("starting simulation, reading orders from {}", args.orders_path.display());
    let events = kitchen.process_orders(&source);
    for event in events {
        let event = event?;
        display.record(&event)?;
    }
    display.finish(kitchen.tally())?;

    Ok(())
}
