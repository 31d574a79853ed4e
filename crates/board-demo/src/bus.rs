//! Simulated buses and controllers.
//!
//! Stand-ins for the STM32H7 I2C, SAI/I2S, GPIO and SPI blocks. The I2C bus
//! implements [`embedded_hal::i2c::I2c`] and records every write, so chip
//! drivers run their real register sequences against it.

use board_manager::{Config, DriverError, Handle, PeripheralImpl, PeripheralRegistry};
use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation};

use crate::config::{GpioConfig, I2cConfig, I2sConfig, SpiConfig};

/// Error raised by the simulated I2C bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Nothing acknowledged the address.
    Nack(u8),
}

impl i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Nack(_) => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
        }
    }
}

impl From<BusError> for DriverError {
    fn from(_: BusError) -> Self {
        DriverError::Communication
    }
}

/// Simulated I2C controller.
#[derive(Debug)]
pub struct SimI2cBus {
    /// Controller index.
    pub port: u8,
    /// SCL frequency in Hz.
    pub frequency_hz: u32,
    nack_addr: Option<u8>,
    writes: Vec<(u8, Vec<u8>)>,
}

impl SimI2cBus {
    /// Bus configured from `config`, with an empty write log.
    pub fn new(config: &I2cConfig) -> Self {
        Self {
            port: config.port,
            frequency_hz: config.frequency_hz,
            nack_addr: config.nack_addr,
            writes: Vec::new(),
        }
    }

    /// Every write so far as `(address, bytes)`.
    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }

    /// Last value written to register `reg` of the chip at `addr`.
    pub fn register(&self, addr: u8, reg: u8) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(a, data)| *a == addr && data.first() == Some(&reg))
            .and_then(|(_, data)| data.get(1).copied())
    }
}

impl i2c::ErrorType for SimI2cBus {
    type Error = BusError;
}

impl i2c::I2c for SimI2cBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.nack_addr == Some(address) {
            return Err(BusError::Nack(address));
        }
        for op in operations.iter_mut() {
            match op {
                Operation::Write(data) => self.writes.push((address, data.to_vec())),
                Operation::Read(buf) => buf.fill(0),
            }
        }
        Ok(())
    }
}

/// Simulated I2S transmitter.
#[derive(Debug)]
pub struct SimI2sTx {
    /// SAI block index.
    pub port: u8,
    /// Frame rate in Hz.
    pub sample_rate_hz: u32,
    /// Bits per sample slot.
    pub bits_per_sample: u8,
}

/// Simulated GPIO port.
#[derive(Debug)]
pub struct SimGpioPort {
    /// Port letter.
    pub port: char,
    /// Pins usable as outputs.
    pub output_mask: u16,
}

impl SimGpioPort {
    /// `true` if `pin` is configured as an output.
    pub fn is_output(&self, pin: u8) -> bool {
        pin < 16 && self.output_mask & (1 << pin) != 0
    }
}

/// Simulated SPI controller.
#[derive(Debug)]
pub struct SimSpiBus {
    /// Controller index.
    pub port: u8,
    /// SCK frequency in Hz.
    pub frequency_hz: u32,
}

/// Peripheral implementations of the devkit.
pub static PERIPHERAL_IMPLS: [PeripheralImpl; 4] = [
    PeripheralImpl {
        kind: "i2c",
        role: "master",
        init: i2c_master_init,
        deinit: release::<SimI2cBus>,
    },
    PeripheralImpl {
        kind: "i2s",
        role: "tx",
        init: i2s_tx_init,
        deinit: release::<SimI2sTx>,
    },
    PeripheralImpl {
        kind: "gpio",
        role: "output",
        init: gpio_init,
        deinit: release::<SimGpioPort>,
    },
    PeripheralImpl {
        kind: "spi",
        role: "master",
        init: spi_master_init,
        deinit: release::<SimSpiBus>,
    },
];

fn i2c_master_init(config: Config) -> Result<Handle, DriverError> {
    let config = config.get::<I2cConfig>()?;
    if config.frequency_hz == 0 || config.frequency_hz > 1_000_000 {
        return Err(DriverError::InvalidConfig);
    }
    tracing::debug!(port = config.port, hz = config.frequency_hz, "I2C master up");
    Ok(Handle::new(SimI2cBus::new(config)))
}

fn i2s_tx_init(config: Config) -> Result<Handle, DriverError> {
    let config = config.get::<I2sConfig>()?;
    if !matches!(config.bits_per_sample, 16 | 24 | 32) {
        return Err(DriverError::InvalidConfig);
    }
    tracing::debug!(port = config.port, rate = config.sample_rate_hz, "I2S TX up");
    Ok(Handle::new(SimI2sTx {
        port: config.port,
        sample_rate_hz: config.sample_rate_hz,
        bits_per_sample: config.bits_per_sample,
    }))
}

fn gpio_init(config: Config) -> Result<Handle, DriverError> {
    let config = config.get::<GpioConfig>()?;
    tracing::debug!(port = %config.port, mask = config.output_mask, "GPIO port up");
    Ok(Handle::new(SimGpioPort {
        port: config.port,
        output_mask: config.output_mask,
    }))
}

fn spi_master_init(config: Config) -> Result<Handle, DriverError> {
    let config = config.get::<SpiConfig>()?;
    tracing::debug!(port = config.port, hz = config.frequency_hz, "SPI master up");
    Ok(Handle::new(SimSpiBus {
        port: config.port,
        frequency_hz: config.frequency_hz,
    }))
}

/// Take one reference on each of `names`, all or nothing.
pub(crate) fn acquire(
    periphs: &mut PeripheralRegistry,
    names: &[&'static str],
) -> Result<(), DriverError> {
    for (held, name) in names.iter().enumerate() {
        if let Err(err) = periphs.init(name) {
            release_all(periphs, names.get(..held).unwrap_or_default());
            return Err(err.into());
        }
    }
    Ok(())
}

/// Drop one reference on each of `names`, last acquired first.
pub(crate) fn release_all(periphs: &mut PeripheralRegistry, names: &[&'static str]) {
    for name in names.iter().rev() {
        if let Err(err) = periphs.deinit(name) {
            tracing::warn!(peripheral = name, %err, "release failed");
        }
    }
}

/// Borrow the simulated I2C bus registered as `name`.
pub(crate) fn i2c_bus<'a>(
    periphs: &'a mut PeripheralRegistry,
    name: &str,
) -> Result<&'a mut SimI2cBus, DriverError> {
    periphs
        .handle_mut(name)?
        .downcast_mut::<SimI2cBus>()
        .ok_or(DriverError::InvalidConfig)
}

/// Teardown shared by every simulated peripheral: check the handle type and drop it.
fn release<T: 'static>(handle: Handle) -> Result<(), DriverError> {
    handle
        .into_inner::<T>()
        .map(drop)
        .map_err(|_| DriverError::InvalidConfig)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embedded_hal::i2c::I2c;

    static I2C: I2cConfig = I2cConfig {
        port: 1,
        frequency_hz: 400_000,
        nack_addr: Some(0x6A),
    };

    #[test]
    fn i2c_bus_records_writes_and_nacks() {
        let mut bus = SimI2cBus::new(&I2C);
        bus.write(0x48, &[15, 0xFF]).unwrap();
        bus.write(0x48, &[15, 0x20]).unwrap();
        assert_eq!(bus.register(0x48, 15), Some(0x20));
        assert_eq!(bus.write(0x6A, &[0, 0]), Err(BusError::Nack(0x6A)));
        assert_eq!(bus.writes().len(), 2);
    }

    #[test]
    fn i2c_init_rejects_bad_frequency() {
        static BAD: I2cConfig = I2cConfig {
            port: 2,
            frequency_hz: 0,
            nack_addr: None,
        };
        assert_eq!(
            i2c_master_init(Config::new(&BAD)).unwrap_err(),
            DriverError::InvalidConfig
        );
    }

    #[test]
    fn release_checks_handle_type() {
        let handle = Handle::new(SimSpiBus {
            port: 1,
            frequency_hz: 8_000_000,
        });
        assert_eq!(release::<SimI2cBus>(handle), Err(DriverError::InvalidConfig));
    }

    #[test]
    fn gpio_output_mask() {
        let port = SimGpioPort {
            port: 'A',
            output_mask: 0b1000_0000,
        };
        assert!(port.is_output(7));
        assert!(!port.is_output(6));
        assert!(!port.is_output(16));
    }
}
