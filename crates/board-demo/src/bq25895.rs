//! BQ25895 USB-C charger / power-path IC.
//!
//! Reference: Texas Instruments BQ25895 datasheet (SLUSCD3B)

use board_manager::{DeviceContext, DeviceImpl, DriverError, Handle};
use embedded_hal::i2c::I2c;

use crate::bus;
use crate::config::PmicConfig;

/// 7-bit I2C address (fixed in silicon).
pub const I2C_ADDR: u8 = 0x6A;
/// REG00: input source control (IINLIM).
pub const REG00_INPUT_SOURCE: u8 = 0x00;
/// REG01: power-on configuration (WD_RST, CHG_CONFIG).
pub const REG01_POWER_ON_CONFIG: u8 = 0x01;
/// REG02: charge current (ICHG).
pub const REG02_CHARGE_CURRENT: u8 = 0x02;
/// REG04: charge voltage (VREG).
pub const REG04_CHARGE_VOLTAGE: u8 = 0x04;

/// IINLIM: 3.25 A input limit for a 3 A USB-C source.
pub const IINLIM_3250MA: u8 = 0b11_0010;
/// ICHG: ~1472 mA charge current (64 mA/LSB).
pub const ICHG_1500MA: u8 = 0b001_0111;
/// VREG (pre-shifted): 4.208 V charge voltage.
pub const VREG_4208MV: u8 = 23 << 2;
/// REG01: charging enabled (CHG_CONFIG=1, WD_RST=1).
pub const REG01_ENABLE_CHARGING: u8 = (1 << 6) | (1 << 4);
/// REG01: charging disabled, watchdog kicked.
pub const REG01_DISABLE_CHARGING: u8 = 1 << 6;

/// Program input limit, charge current and voltage, then enable charging.
pub fn init_sequence<I: I2c>(i2c: &mut I, addr: u8) -> Result<(), I::Error> {
    i2c.write(addr, &[REG00_INPUT_SOURCE, IINLIM_3250MA])?;
    i2c.write(addr, &[REG02_CHARGE_CURRENT, ICHG_1500MA])?;
    i2c.write(addr, &[REG04_CHARGE_VOLTAGE, VREG_4208MV])?;
    i2c.write(addr, &[REG01_POWER_ON_CONFIG, REG01_ENABLE_CHARGING])
}

/// Runtime state of the charger.
#[derive(Debug)]
pub struct Bq25895 {
    /// I2C address.
    pub addr: u8,
}

/// `pmic` device implementation.
pub const PMIC: DeviceImpl = DeviceImpl {
    kind: "pmic",
    init: pmic_init,
    deinit: pmic_deinit,
};

fn pmic_init(ctx: &mut DeviceContext<'_>) -> Result<Handle, DriverError> {
    let config = ctx.config().get::<PmicConfig>()?;
    bus::acquire(ctx.peripherals(), &[config.i2c])?;

    let programmed = bus::i2c_bus(ctx.peripherals(), config.i2c)
        .and_then(|i2c| init_sequence(i2c, config.addr).map_err(DriverError::from));
    if let Err(err) = programmed {
        tracing::error!(device = ctx.name(), addr = config.addr, %err, "charger not responding");
        bus::release_all(ctx.peripherals(), &[config.i2c]);
        return Err(err);
    }

    tracing::info!(device = ctx.name(), addr = config.addr, "BQ25895 charging enabled");
    Ok(Handle::new(Bq25895 { addr: config.addr }))
}

fn pmic_deinit(handle: Handle, ctx: &mut DeviceContext<'_>) -> Result<(), DriverError> {
    let config = ctx.config().get::<PmicConfig>()?;
    let pmic = handle
        .into_inner::<Bq25895>()
        .map_err(|_| DriverError::InvalidConfig)?;
    let stopped = bus::i2c_bus(ctx.peripherals(), config.i2c).and_then(|i2c| {
        i2c.write(pmic.addr, &[REG01_POWER_ON_CONFIG, REG01_DISABLE_CHARGING])
            .map_err(DriverError::from)
    });
    bus::release_all(ctx.peripherals(), &[config.i2c]);
    stopped
}
