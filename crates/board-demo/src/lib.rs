//! soul-dap-devkit board description
//!
//! Static peripheral and device tables for the SoulAudio DAP development kit,
//! wired to simulated drivers so the whole bring-up runs on the host.
//!
//! # Resources
//!
//! ```text
//! peripherals  i2c_master ── audio_dac, pmic
//!              i2s_tx ───── audio_dac
//!              gpio_pa ──── power_amp
//!              spi_master ─ display
//!
//! devices      power_amp   power_switch/gpio      (exposes gpio_power_ctrl)
//!              pmic        pmic/bq25895
//!              audio_dac   audio_codec/es9038q2m  (powered by power_amp)
//!              display     display/ssd1677        (init_skip)
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod bq25895;
pub mod bus;
pub mod config;
pub mod display;
pub mod es9038q2m;
pub mod power;

use board_manager::{
    BoardDef, BoardEntry, BoardInfo, Config, DeviceDesc, DeviceImpl, ExtraFnEntry, PeripheralDesc,
};

use crate::config::{
    CodecConfig, DisplayConfig, GpioConfig, I2cConfig, I2sConfig, PmicConfig, PowerSwitchConfig,
    SpiConfig,
};

/// Enable pin of the headphone amplifier rail (PA7).
pub const AMP_ENABLE_PIN: u8 = 7;

static I2C_MASTER: I2cConfig = I2cConfig {
    port: 1,
    frequency_hz: 400_000,
    nack_addr: None,
};

static I2S_TX: I2sConfig = I2sConfig {
    port: 1,
    sample_rate_hz: 192_000,
    bits_per_sample: 32,
};

static GPIO_PA: GpioConfig = GpioConfig {
    port: 'A',
    output_mask: 1 << AMP_ENABLE_PIN,
};

static SPI_MASTER: SpiConfig = SpiConfig {
    port: 1,
    frequency_hz: 8_000_000,
};

static POWER_AMP: PowerSwitchConfig = PowerSwitchConfig {
    gpio: "gpio_pa",
    pin: AMP_ENABLE_PIN,
};

static PMIC: PmicConfig = PmicConfig {
    i2c: "i2c_master",
    addr: bq25895::I2C_ADDR,
};

static AUDIO_DAC: CodecConfig = CodecConfig {
    i2c: "i2c_master",
    i2s: "i2s_tx",
    addr: es9038q2m::I2C_ADDR_LOW,
};

static DISPLAY: DisplayConfig = DisplayConfig {
    spi: "spi_master",
    width: 800,
    height: 480,
};

/// Peripherals in bring-up order.
pub static PERIPHERALS: [PeripheralDesc; 4] = [
    PeripheralDesc::new("i2c_master", "i2c", "master", Config::new(&I2C_MASTER)),
    PeripheralDesc::new("i2s_tx", "i2s", "tx", Config::new(&I2S_TX)),
    PeripheralDesc::new("gpio_pa", "gpio", "output", Config::new(&GPIO_PA)),
    PeripheralDesc::new("spi_master", "spi", "master", Config::new(&SPI_MASTER)),
];

/// Devices in bring-up order.
pub static DEVICES: [DeviceDesc; 4] = [
    DeviceDesc::new("power_amp", "power_switch", "gpio", Config::new(&POWER_AMP)),
    DeviceDesc::new("pmic", "pmic", "bq25895", Config::new(&PMIC)),
    DeviceDesc::new("audio_dac", "audio_codec", "es9038q2m", Config::new(&AUDIO_DAC))
        .with_power_ctrl("power_amp"),
    DeviceDesc::new("display", "display", "ssd1677", Config::new(&DISPLAY)).skip_init(),
];

/// Device implementations, one per kind.
pub static DEVICE_IMPLS: [DeviceImpl; 4] = [
    power::POWER_SWITCH,
    bq25895::PMIC,
    es9038q2m::AUDIO_CODEC,
    display::DISPLAY,
];

/// Chip drivers selected by `sub_type`.
pub static ENTRIES: [BoardEntry; 1] = [es9038q2m::ENTRY];

/// Auxiliary functions.
pub static EXTRA_FNS: [ExtraFnEntry; 1] =
    [ExtraFnEntry::power_ctrl("gpio_power_ctrl", power::gpio_power_ctrl)];

/// The development kit.
pub static DEVKIT: BoardDef = BoardDef {
    info: BoardInfo {
        name: "soul-dap-devkit",
        chip: "stm32h743zi",
        version: "0.3",
        manufacturer: "SoulAudio",
        description: "DAP development kit: ES9038Q2M DAC, BQ25895 charger, 800x480 e-ink",
    },
    peripherals: &PERIPHERALS,
    peripheral_impls: &bus::PERIPHERAL_IMPLS,
    devices: &DEVICES,
    device_impls: &DEVICE_IMPLS,
    entries: &ENTRIES,
    extra_fns: &EXTRA_FNS,
};
