//! `lastmile route` command - Show a driver's route

use std::sync::Arc;

use clap::Parser;

use super::or_na;
use crate::backend::DispatchBackend;
use crate::route::{DriverId, RouteProgressTracker, RouteSequencer};
use crate::session::Session;

#[derive(Parser, Debug)]
pub struct RouteArgs {
    /// Driver account id
    #[arg(short, long)]
    driver: DriverId,

    /// Number of stops already delivered this session
    #[arg(long, default_value_t = 0)]
    delivered: usize,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: RouteArgs, backend: Arc<dyn DispatchBackend>) -> anyhow::Result<()> {
    let mut sequencer = RouteSequencer::new(Session::new(args.driver), backend);
    sequencer.reload().await?;
    for _ in 0..args.delivered {
        sequencer.advance();
    }

    let tracker = sequencer.tracker();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tracker.route())?);
        return Ok(());
    }

    print_route(tracker);
    Ok(())
}

pub(crate) fn print_route(tracker: &RouteProgressTracker) {
    let route = match tracker.route() {
        Some(r) if !r.is_empty() => r,
        _ => {
            println!("No route assigned");
            return;
        }
    };

    println!("Driver #{} - {} stops, {:.1} km, ETA {}",
        route.driver_id,
        route.len(),
        route.total_distance_km,
        or_na(route.total_duration_min, "min")
    );
    println!("Progress: {}% ({} of {} delivered)\n",
        tracker.progress_percent(),
        tracker.delivered_count(),
        tracker.total()
    );

    for (index, stop) in route.stops.iter().enumerate() {
        let marker = if index < tracker.cursor() {
            "✓"
        } else if index == tracker.cursor() {
            "▶"
        } else {
            "○"
        };
        println!("  {} {:>2}. {:<16} {:<32} {}",
            marker,
            stop.sequence,
            stop.tracking_no,
            stop.address,
            or_na(stop.distance_km, "km")
        );
    }

    match tracker.current() {
        Some(stop) => {
            println!("\nNext stop: {} ({})", stop.address, stop.tracking_no);
            if !stop.google_maps_url.is_empty() {
                println!("  Google Maps: {}", stop.google_maps_url);
            }
            if !stop.waze_url.is_empty() {
                println!("  Waze:        {}", stop.waze_url);
            }
        }
        None => println!("\nAll stops delivered"),
    }
}
