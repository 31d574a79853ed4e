//! ES9038Q2M DAC: register map, init sequence and board entry.
//!
//! The devkit's `audio_dac` device has kind `audio_codec`. The codec
//! implementation does nothing chip-specific itself; it hands off to the board
//! entry named by the descriptor's `sub_type`, here `"es9038q2m"`.
//!
//! Reference: ESS Technology ES9038Q2M datasheet Rev 3.0, Section 9.

use board_manager::{BoardEntry, DeviceContext, DeviceImpl, DriverError, Handle};
use embedded_hal::i2c::I2c;

use crate::bus;
use crate::config::CodecConfig;

/// 7-bit I2C address with ADDR pulled low.
pub const I2C_ADDR_LOW: u8 = 0x48;
/// 7-bit I2C address with ADDR pulled high.
pub const I2C_ADDR_HIGH: u8 = 0x49;

/// Register 0: system configuration (soft reset, clock gear).
pub const REG_SYSTEM: u8 = 0;
/// Register 7: filter shape.
pub const REG_FILTER: u8 = 7;
/// Register 15: left-channel attenuation.
pub const REG_ATT_L: u8 = 15;
/// Register 16: right-channel attenuation.
pub const REG_ATT_R: u8 = 16;

/// Attenuation that mutes the output (-127.5 dB).
pub const ATT_MUTED: u8 = 0xFF;
/// Attenuation for full scale (0 dB).
pub const ATT_FULL_VOLUME: u8 = 0x00;

/// Runtime state of the DAC.
#[derive(Debug)]
pub struct Es9038q2m {
    /// I2C address.
    pub addr: u8,
    /// Attenuation currently programmed on both channels.
    pub attenuation: u8,
    config: &'static CodecConfig,
}

impl Es9038q2m {
    /// `true` while the outputs are at [`ATT_MUTED`].
    pub fn is_muted(&self) -> bool {
        self.attenuation == ATT_MUTED
    }

    /// Program the same attenuation on both channels.
    pub fn set_attenuation<I: I2c>(&mut self, i2c: &mut I, attenuation: u8) -> Result<(), I::Error> {
        write_attenuation(i2c, self.addr, attenuation)?;
        self.attenuation = attenuation;
        Ok(())
    }
}

fn write_attenuation<I: I2c>(i2c: &mut I, addr: u8, attenuation: u8) -> Result<(), I::Error> {
    i2c.write(addr, &[REG_ATT_L, attenuation])?;
    i2c.write(addr, &[REG_ATT_R, attenuation])
}

/// Bring the DAC out of reset with its outputs muted.
///
/// 1. Both channels to [`ATT_MUTED`]
/// 2. Soft reset, then normal operation
/// 3. Linear phase fast roll-off filter
pub fn init_sequence<I: I2c>(i2c: &mut I, addr: u8) -> Result<(), I::Error> {
    write_attenuation(i2c, addr, ATT_MUTED)?;
    i2c.write(addr, &[REG_SYSTEM, 0x01])?;
    i2c.write(addr, &[REG_SYSTEM, 0x00])?;
    i2c.write(addr, &[REG_FILTER, 0x00])
}

/// `audio_codec` device implementation: dispatches on `sub_type`.
pub const AUDIO_CODEC: DeviceImpl = DeviceImpl {
    kind: "audio_codec",
    init: codec_init,
    deinit: codec_deinit,
};

/// Chip entry selected by `sub_type = "es9038q2m"`.
pub const ENTRY: BoardEntry = BoardEntry {
    name: "es9038q2m",
    init: entry_init,
    deinit: entry_deinit,
};

fn codec_init(ctx: &mut DeviceContext<'_>) -> Result<Handle, DriverError> {
    let sub_type = ctx.sub_type();
    ctx.init_entry(sub_type)
}

fn codec_deinit(handle: Handle, ctx: &mut DeviceContext<'_>) -> Result<(), DriverError> {
    let sub_type = ctx.sub_type();
    ctx.deinit_entry(sub_type, handle)
}

fn entry_init(ctx: &mut DeviceContext<'_>) -> Result<Handle, DriverError> {
    let config = ctx.config().get::<CodecConfig>()?;
    let buses = [config.i2c, config.i2s];
    bus::acquire(ctx.peripherals(), &buses)?;

    let programmed = bus::i2c_bus(ctx.peripherals(), config.i2c)
        .and_then(|i2c| init_sequence(i2c, config.addr).map_err(DriverError::from));
    if let Err(err) = programmed {
        tracing::error!(device = ctx.name(), addr = config.addr, %err, "DAC not responding");
        bus::release_all(ctx.peripherals(), &buses);
        return Err(err);
    }

    tracing::info!(device = ctx.name(), addr = config.addr, "ES9038Q2M ready (muted)");
    Ok(Handle::new(Es9038q2m {
        addr: config.addr,
        attenuation: ATT_MUTED,
        config,
    }))
}

fn entry_deinit(handle: Handle, ctx: &mut DeviceContext<'_>) -> Result<(), DriverError> {
    let dac = handle
        .into_inner::<Es9038q2m>()
        .map_err(|_| DriverError::InvalidConfig)?;
    let buses = [dac.config.i2c, dac.config.i2s];

    // Mute before the clocks go away.
    let muted = bus::i2c_bus(ctx.peripherals(), dac.config.i2c)
        .and_then(|i2c| write_attenuation(i2c, dac.addr, ATT_MUTED).map_err(DriverError::from));
    bus::release_all(ctx.peripherals(), &buses);
    muted
}
