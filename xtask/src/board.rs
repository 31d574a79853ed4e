use anyhow::{Context, Result};
use board_manager::{BoardManager, BoardStatus};
use colored::Colorize;

pub fn run(json: bool, all: bool) -> Result<()> {
    let mut board = BoardManager::new(&board_demo::DEVKIT);
    board
        .init()
        .map_err(|err| anyhow::anyhow!("board init failed: {err}"))?;

    if all {
        let skipped: Vec<&str> = board
            .devices()
            .statuses()
            .filter(|status| status.init_skip && !status.is_active())
            .map(|status| status.name)
            .collect();
        for name in skipped {
            if let Err(err) = board.init_device(name) {
                eprintln!("{}", format!("  ⚠ {name}: {err}").yellow());
            }
        }
    }

    let status = board.status();
    if json {
        let text = serde_json::to_string_pretty(&status).context("Failed to encode status")?;
        println!("{text}");
    } else {
        print_report(&status);
    }

    board
        .deinit()
        .map_err(|err| anyhow::anyhow!("board teardown failed: {err}"))?;
    Ok(())
}

fn print_report(status: &BoardStatus) {
    println!();
    println!("{}", "📋 Board resources".cyan().bold());
    println!();
    for line in status.to_string().lines() {
        println!("  {line}");
    }
    println!();
    println!(
        "{}",
        format!(
            "✓ {} of {} resources active",
            status.active_count(),
            status.peripherals.len().saturating_add(status.devices.len())
        )
        .green()
        .bold()
    );
    println!();
}
