//! Host walk-through of the devkit bring-up.
//!
//! Run with: cargo run -p board-demo
//! Verbose:  RUST_LOG=debug cargo run -p board-demo

#![allow(clippy::print_stdout)]

use anyhow::{Context, Result};
use board_demo::display::EinkPanel;
use board_demo::es9038q2m::Es9038q2m;
use board_demo::DEVKIT;
use board_manager::BoardManager;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut board = BoardManager::new(&DEVKIT);
    board.init().context("board bring-up")?;
    println!("{}", board.status());

    board.device_power_ctrl("audio_dac", true)?;
    let dac = board
        .device_handle("audio_dac")?
        .downcast_ref::<Es9038q2m>()
        .context("audio_dac is not an ES9038Q2M")?;
    println!(
        "audio_dac at 0x{:02X}, muted: {}",
        dac.addr,
        dac.is_muted()
    );

    board.init_device("display")?;
    board
        .device_handle_mut("display")?
        .downcast_mut::<EinkPanel>()
        .context("display is not an e-ink panel")?
        .refresh_full();
    println!("{}", board.status());

    board.device_power_ctrl("audio_dac", false)?;
    board.deinit_device("display")?;
    board.deinit().context("board teardown")?;
    println!("{}", board.status());
    Ok(())
}
