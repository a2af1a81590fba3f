//! `lastmile fleet` command - Fleet-wide route KPIs

use std::sync::Arc;

use clap::Parser;

use super::or_na;
use crate::backend::DispatchBackend;
use crate::config::RuntimeConfig;
use crate::fleet::{FleetAggregator, FleetSnapshot};
use crate::route::DriverId;

#[derive(Parser, Debug)]
pub struct FleetArgs {
    /// Drivers to include (default: every active driver)
    #[arg(short, long = "driver")]
    drivers: Vec<DriverId>,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(
    args: FleetArgs,
    backend: Arc<dyn DispatchBackend>,
    config: &RuntimeConfig,
) -> anyhow::Result<()> {
    let aggregator = FleetAggregator::new(backend).with_fetch_timeout(config.fetch_timeout);

    let snapshot = if args.drivers.is_empty() {
        aggregator.aggregate_active().await?
    } else {
        aggregator.aggregate(&args.drivers).await
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &FleetSnapshot) {
    println!("🚚 Fleet - {} drivers ({} reporting)\n",
        snapshot.per_driver_routes.len(),
        snapshot.present_count()
    );

    for (driver_id, route) in &snapshot.per_driver_routes {
        match route {
            Some(route) => println!("  #{:<6} {:>3} stops  {:>7.1} km  ETA {}",
                driver_id,
                route.len(),
                route.total_distance_km,
                or_na(route.total_duration_min, "min")
            ),
            None => println!("  #{:<6} unavailable: {}",
                driver_id,
                snapshot.failures.get(driver_id).map(String::as_str).unwrap_or("unknown error")
            ),
        }
    }

    println!("{}", "━".repeat(48));
    println!("Total distance: {:.1} km", snapshot.total_distance_km);
    println!("Total ETA:      {}", or_na(snapshot.total_duration_min, "min"));
    if snapshot.absent_count() > 0 {
        println!("(totals exclude {} unavailable drivers)", snapshot.absent_count());
    }
}
