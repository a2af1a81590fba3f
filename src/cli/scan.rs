//! `lastmile scan` command - Interactive sorting station

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::backend::{DispatchBackend, RejectionKind};
use crate::config::RuntimeConfig;
use crate::session::Session;
use crate::sorting::{ScanClassifier, ScanState};

#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Sorter account id
    #[arg(short, long)]
    sorter: i64,

    /// Shift goal (overrides config)
    #[arg(long)]
    goal: Option<u32>,
}

pub async fn execute(
    args: ScanArgs,
    backend: Arc<dyn DispatchBackend>,
    config: &RuntimeConfig,
) -> anyhow::Result<()> {
    let mut station = ScanClassifier::new(Session::new(args.sorter), backend)
        .with_shift_goal(args.goal.unwrap_or(config.shift_goal))
        .with_tracking_pattern(config.tracking_pattern.clone());
    station.sync_today_count().await;

    println!("📦 Sorting station - scan a tracking number, 'q' to quit\n");
    print_counter(&station);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            break;
        }

        match station.state() {
            ScanState::Ready => {
                station.set_input(line);
                station.scan_input().await;
            }
            ScanState::Success(_) if line.eq_ignore_ascii_case("u") => station.undo().await,
            ScanState::Success(_) | ScanState::Error(_) if line.is_empty() => station.acknowledge(),
            ScanState::Success(_) | ScanState::Error(_) => {
                println!("  (press Enter to continue)");
                continue;
            }
        }

        print_state(&station);
    }

    println!("\nScanned today: {}", station.today_count());
    Ok(())
}

fn print_state(station: &ScanClassifier) {
    match station.state() {
        ScanState::Ready => print_counter(station),
        ScanState::Success(result) => {
            let position = result
                .bag_position
                .map(|p| p.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!("\x1b[32m  ✓ {}  →  {}  |  position {}\x1b[0m",
                result.tracking_no,
                result.driver_name,
                position
            );
            println!("  Enter to continue, 'u' to undo");
        }
        ScanState::Error(error) => {
            let label = match error.kind {
                RejectionKind::AlreadySorted => "ALREADY SORTED",
                RejectionKind::NotFound => "NOT FOUND",
            };
            println!("\x1b[31m  ✗ {}: {}\x1b[0m", label, error.message);
            println!("  Enter to continue");
        }
    }
}

fn print_counter(station: &ScanClassifier) {
    println!("  Today: {} / {} ({}%){}",
        station.today_count(),
        station.shift_goal(),
        station.shift_progress_percent(),
        station
            .last_scanned()
            .map(|t| format!("  last: {}", t))
            .unwrap_or_default()
    );
}
