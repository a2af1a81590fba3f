//! `lastmile reorder` command - Move upcoming stops and commit

use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;

use super::route::print_route;
use crate::backend::DispatchBackend;
use crate::route::{DriverId, MoveDirection, RouteSequencer};
use crate::session::Session;

#[derive(Parser, Debug)]
pub struct ReorderArgs {
    /// Driver account id
    #[arg(short, long)]
    driver: DriverId,

    /// Moves to apply in order, as <index>:<up|down> (0-based list index)
    #[arg(short = 'm', long = "move", required = true)]
    moves: Vec<StopMove>,

    /// Show the resulting order without committing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopMove {
    index: usize,
    direction: MoveDirection,
}

impl FromStr for StopMove {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (index, direction) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <index>:<up|down>, got '{}'", s))?;
        let index = index
            .trim()
            .parse()
            .map_err(|_| format!("invalid stop index '{}'", index))?;
        let direction = match direction.trim().to_ascii_lowercase().as_str() {
            "up" | "-1" => MoveDirection::Up,
            "down" | "+1" | "1" => MoveDirection::Down,
            other => return Err(format!("invalid direction '{}'", other)),
        };
        Ok(Self { index, direction })
    }
}

pub async fn execute(args: ReorderArgs, backend: Arc<dyn DispatchBackend>) -> anyhow::Result<()> {
    let mut sequencer = RouteSequencer::new(Session::new(args.driver), backend);
    sequencer.reload().await?;
    sequencer.begin_reorder();

    for m in &args.moves {
        if !sequencer.move_stop(m.index, m.direction) {
            println!("Skipped move {:?} of stop {}: outside the upcoming stops", m.direction, m.index);
        }
    }

    if args.dry_run {
        println!("Dry run - local order, not committed:\n");
        print_route(sequencer.tracker());
        sequencer.cancel_reorder();
        return Ok(());
    }

    sequencer.commit().await?;
    println!("✅ New order committed\n");
    print_route(sequencer.tracker());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stop_move() {
        assert_eq!(
            "3:up".parse::<StopMove>().unwrap(),
            StopMove { index: 3, direction: MoveDirection::Up }
        );
        assert_eq!(
            "0:DOWN".parse::<StopMove>().unwrap(),
            StopMove { index: 0, direction: MoveDirection::Down }
        );
        assert!("3".parse::<StopMove>().is_err());
        assert!("x:up".parse::<StopMove>().is_err());
        assert!("2:left".parse::<StopMove>().is_err());
    }
}
