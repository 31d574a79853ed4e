//! Typed configuration blobs referenced from the devkit descriptor tables.
//!
//! Every struct here is only ever built in a `static` and handed to the
//! registries through [`board_manager::Config::new`].

/// I2C controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cConfig {
    /// Controller index (I2C1 = 1).
    pub port: u8,
    /// SCL frequency in Hz.
    pub frequency_hz: u32,
    /// Address that never acknowledges, to simulate a missing chip.
    pub nack_addr: Option<u8>,
}

/// I2S transmitter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2sConfig {
    /// SAI block index.
    pub port: u8,
    /// Frame rate in Hz.
    pub sample_rate_hz: u32,
    /// Bits per sample slot.
    pub bits_per_sample: u8,
}

/// GPIO port configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioConfig {
    /// Port letter, e.g. `'A'`.
    pub port: char,
    /// Bit mask of pins configured as outputs.
    pub output_mask: u16,
}

/// SPI controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    /// Controller index.
    pub port: u8,
    /// SCK frequency in Hz.
    pub frequency_hz: u32,
}

/// Audio codec configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Control bus peripheral name.
    pub i2c: &'static str,
    /// Audio data peripheral name.
    pub i2s: &'static str,
    /// 7-bit I2C address.
    pub addr: u8,
}

/// GPIO-driven power switch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerSwitchConfig {
    /// GPIO peripheral name.
    pub gpio: &'static str,
    /// Pin number on that port.
    pub pin: u8,
}

/// Power-management IC configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmicConfig {
    /// Control bus peripheral name.
    pub i2c: &'static str,
    /// 7-bit I2C address.
    pub addr: u8,
}

/// E-ink panel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    /// SPI peripheral name.
    pub spi: &'static str,
    /// Horizontal resolution.
    pub width: u16,
    /// Vertical resolution.
    pub height: u16,
}
