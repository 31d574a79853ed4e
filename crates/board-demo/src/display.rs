//! E-ink panel on the SPI bus.
//!
//! Declared `init_skip`: the panel is brought up on demand by the UI, not by
//! board bring-up.

use board_manager::{DeviceContext, DeviceImpl, DriverError, Handle};

use crate::bus::{self, SimSpiBus};
use crate::config::DisplayConfig;

/// Runtime state of the panel.
#[derive(Debug)]
pub struct EinkPanel {
    /// Horizontal resolution.
    pub width: u16,
    /// Vertical resolution.
    pub height: u16,
    /// Full refreshes since init.
    pub refreshes: u32,
}

impl EinkPanel {
    /// Run a full refresh.
    pub fn refresh_full(&mut self) {
        self.refreshes = self.refreshes.saturating_add(1);
    }
}

/// `display` device implementation.
pub const DISPLAY: DeviceImpl = DeviceImpl {
    kind: "display",
    init: display_init,
    deinit: display_deinit,
};

fn display_init(ctx: &mut DeviceContext<'_>) -> Result<Handle, DriverError> {
    let config = ctx.config().get::<DisplayConfig>()?;
    if config.width == 0 || config.height == 0 {
        return Err(DriverError::InvalidConfig);
    }
    bus::acquire(ctx.peripherals(), &[config.spi])?;

    let spi_hz = ctx
        .peripherals()
        .handle(config.spi)
        .ok()
        .and_then(|handle| handle.downcast_ref::<SimSpiBus>())
        .map(|spi| spi.frequency_hz);
    tracing::info!(
        device = ctx.name(),
        sub_type = ctx.sub_type(),
        width = config.width,
        height = config.height,
        ?spi_hz,
        "panel ready"
    );
    Ok(Handle::new(EinkPanel {
        width: config.width,
        height: config.height,
        refreshes: 0,
    }))
}

fn display_deinit(handle: Handle, ctx: &mut DeviceContext<'_>) -> Result<(), DriverError> {
    let config = ctx.config().get::<DisplayConfig>()?;
    let panel = handle
        .into_inner::<EinkPanel>()
        .map_err(|_| DriverError::InvalidConfig)?;
    tracing::debug!(device = ctx.name(), refreshes = panel.refreshes, "panel sleep");
    bus::release_all(ctx.peripherals(), &[config.spi]);
    Ok(())
}
