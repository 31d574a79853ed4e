//! GPIO-driven power switch for the headphone amplifier rail.
//!
//! Devices chained to it through `power_ctrl` switch the rail with the
//! `gpio_power_ctrl` extra function. The rail stays on while at least one
//! consumer has asked for it.

use core::convert::Infallible;

use board_manager::{DeviceContext, DeviceImpl, DriverError, Handle};
use embedded_hal::digital::{self, OutputPin};

use crate::bus::{self, SimGpioPort};
use crate::config::PowerSwitchConfig;

/// Simulated push-pull output pin.
#[derive(Debug)]
pub struct SimOutputPin {
    /// Port letter.
    pub port: char,
    /// Pin number.
    pub pin: u8,
    high: bool,
}

impl SimOutputPin {
    /// Current output level.
    pub fn is_set_high(&self) -> bool {
        self.high
    }
}

impl digital::ErrorType for SimOutputPin {
    type Error = Infallible;
}

impl OutputPin for SimOutputPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }
}

/// Runtime state of the switch.
#[derive(Debug)]
pub struct GpioPowerSwitch {
    /// Enable pin of the rail.
    pub pin: SimOutputPin,
    consumers: Vec<String>,
}

impl GpioPowerSwitch {
    /// `true` while the rail is enabled.
    pub fn is_on(&self) -> bool {
        self.pin.is_set_high()
    }

    /// Devices currently asking for power.
    pub fn consumers(&self) -> &[String] {
        &self.consumers
    }
}

/// `power_switch` device implementation.
pub const POWER_SWITCH: DeviceImpl = DeviceImpl {
    kind: "power_switch",
    init: switch_init,
    deinit: switch_deinit,
};

fn switch_init(ctx: &mut DeviceContext<'_>) -> Result<Handle, DriverError> {
    let config = ctx.config().get::<PowerSwitchConfig>()?;
    bus::acquire(ctx.peripherals(), &[config.gpio])?;

    let port = ctx
        .peripherals()
        .handle(config.gpio)
        .ok()
        .and_then(|handle| handle.downcast_ref::<SimGpioPort>())
        .filter(|port| port.is_output(config.pin))
        .map(|port| port.port);
    let Some(port) = port else {
        tracing::error!(device = ctx.name(), pin = config.pin, "enable pin is not an output");
        bus::release_all(ctx.peripherals(), &[config.gpio]);
        return Err(DriverError::InvalidConfig);
    };

    tracing::info!(device = ctx.name(), %port, pin = config.pin, "power switch ready (off)");
    Ok(Handle::new(GpioPowerSwitch {
        pin: SimOutputPin {
            port,
            pin: config.pin,
            high: false,
        },
        consumers: Vec::new(),
    }))
}

fn switch_deinit(handle: Handle, ctx: &mut DeviceContext<'_>) -> Result<(), DriverError> {
    let config = ctx.config().get::<PowerSwitchConfig>()?;
    let mut switch = handle
        .into_inner::<GpioPowerSwitch>()
        .map_err(|_| DriverError::InvalidConfig)?;
    if !switch.consumers.is_empty() {
        tracing::warn!(device = ctx.name(), consumers = ?switch.consumers, "rail cut while in use");
    }
    settle(switch.pin.set_low());
    bus::release_all(ctx.peripherals(), &[config.gpio]);
    Ok(())
}

fn settle(result: Result<(), Infallible>) {
    match result {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// `gpio_power_ctrl` extra function.
pub fn gpio_power_ctrl(handle: &mut Handle, device: &str, on: bool) -> Result<(), DriverError> {
    let switch = handle
        .downcast_mut::<GpioPowerSwitch>()
        .ok_or(DriverError::InvalidConfig)?;
    if on {
        if !switch.consumers.iter().any(|name| name == device) {
            switch.consumers.push(device.to_owned());
        }
    } else {
        switch.consumers.retain(|name| name != device);
    }

    settle(if switch.consumers.is_empty() {
        switch.pin.set_low()
    } else {
        switch.pin.set_high()
    });

    tracing::debug!(device, on, rail = switch.is_on(), "power control");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn switch() -> Handle {
        Handle::new(GpioPowerSwitch {
            pin: SimOutputPin {
                port: 'A',
                pin: 7,
                high: false,
            },
            consumers: Vec::new(),
        })
    }

    fn rail(handle: &Handle) -> bool {
        handle.downcast_ref::<GpioPowerSwitch>().unwrap().is_on()
    }

    #[test]
    fn rail_follows_consumers() {
        let mut handle = switch();
        gpio_power_ctrl(&mut handle, "audio_dac", true).unwrap();
        gpio_power_ctrl(&mut handle, "audio_dac", true).unwrap();
        gpio_power_ctrl(&mut handle, "line_out", true).unwrap();
        assert!(rail(&handle));

        gpio_power_ctrl(&mut handle, "audio_dac", false).unwrap();
        assert!(rail(&handle), "line_out still needs power");
        gpio_power_ctrl(&mut handle, "line_out", false).unwrap();
        assert!(!rail(&handle));
    }

    #[test]
    fn wrong_handle_type_is_rejected() {
        let mut handle = Handle::new(0u8);
        assert_eq!(
            gpio_power_ctrl(&mut handle, "audio_dac", true),
            Err(DriverError::InvalidConfig)
        );
    }
}
