//! Diagnostic snapshot of a board.
//!
//! Rendered as a fixed-width table by `Display` (for logs and the demo binary)
//! and as JSON through `serde` (for `cargo xtask board --json`).

use alloc::vec::Vec;
use core::fmt;

use crate::descriptor::BoardInfo;
use crate::handle::HandleId;

/// State of one peripheral or device.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResourceStatus {
    /// Resource name.
    pub name: &'static str,
    /// Peripheral or device kind.
    pub kind: &'static str,
    /// Peripheral role, or device sub-type.
    pub role: &'static str,
    /// Outstanding references.
    pub ref_count: u32,
    /// Handle identity while active.
    pub handle: Option<HandleId>,
    /// A matching implementation is registered.
    pub implemented: bool,
    /// Left out of bulk initialization (devices only).
    pub init_skip: bool,
    /// Power device this one is chained to (devices only).
    pub power_ctrl: Option<&'static str>,
}

impl ResourceStatus {
    /// `true` while at least one reference is held.
    pub fn is_active(&self) -> bool {
        self.ref_count > 0
    }

    fn state(&self) -> &'static str {
        match (self.implemented, self.is_active(), self.init_skip) {
            (false, _, _) => "no-impl",
            (true, true, _) => "active",
            (true, false, true) => "skipped",
            (true, false, false) => "idle",
        }
    }
}

/// Snapshot of a whole board.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoardStatus {
    /// Board identification.
    pub info: BoardInfo,
    /// Whether [`BoardManager::init`](crate::BoardManager::init) has completed.
    pub initialized: bool,
    /// Peripherals in declared order.
    pub peripherals: Vec<ResourceStatus>,
    /// Devices in declared order.
    pub devices: Vec<ResourceStatus>,
}

impl BoardStatus {
    /// Number of active peripherals and devices.
    pub fn active_count(&self) -> usize {
        self.peripherals
            .iter()
            .chain(&self.devices)
            .filter(|status| status.is_active())
            .count()
    }

    /// Status of the peripheral or device named `name`.
    pub fn find(&self, name: &str) -> Option<&ResourceStatus> {
        self.peripherals
            .iter()
            .chain(&self.devices)
            .find(|status| status.name == name)
    }
}

struct Section<'a>(&'a str, &'a [ResourceStatus]);

impl fmt::Display for Section<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.0)?;
        if self.1.is_empty() {
            return writeln!(f, "  (none)");
        }
        for status in self.1 {
            write!(
                f,
                "  {:<16} {:<12} {:<12} {:<8} refs={:<3}",
                status.name,
                status.kind,
                status.role,
                status.state(),
                status.ref_count
            )?;
            if let Some(handle) = status.handle {
                write!(f, " handle={handle}")?;
            }
            if let Some(power) = status.power_ctrl {
                write!(f, " power={power}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for BoardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "board {} v{} ({}, {})",
            self.info.name, self.info.version, self.info.chip, self.info.manufacturer
        )?;
        writeln!(
            f,
            "state: {}",
            if self.initialized { "initialized" } else { "down" }
        )?;
        write!(f, "{}", Section("peripherals", &self.peripherals))?;
        write!(f, "{}", Section("devices", &self.devices))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    const INFO: BoardInfo = BoardInfo {
        name: "bench",
        chip: "stm32h743",
        version: "1.0",
        manufacturer: "lab",
        description: "test bench",
    };

    fn status(name: &'static str, ref_count: u32, implemented: bool) -> ResourceStatus {
        ResourceStatus {
            name,
            kind: "i2c",
            role: "master",
            ref_count,
            handle: None,
            implemented,
            init_skip: false,
            power_ctrl: None,
        }
    }

    #[test]
    fn state_labels() {
        assert_eq!(status("a", 0, false).state(), "no-impl");
        assert_eq!(status("a", 2, true).state(), "active");
        assert_eq!(status("a", 0, true).state(), "idle");
        let skipped = ResourceStatus {
            init_skip: true,
            ..status("a", 0, true)
        };
        assert_eq!(skipped.state(), "skipped");
    }

    #[test]
    fn counts_and_lookup() {
        let board = BoardStatus {
            info: INFO,
            initialized: true,
            peripherals: vec![status("i2c_master", 1, true), status("spi", 0, true)],
            devices: vec![status("dac", 1, true)],
        };
        assert_eq!(board.active_count(), 2);
        assert_eq!(board.find("dac").unwrap().ref_count, 1);
        assert!(board.find("uart").is_none());
    }

    #[test]
    fn table_rendering() {
        let board = BoardStatus {
            info: INFO,
            initialized: false,
            peripherals: vec![ResourceStatus {
                power_ctrl: Some("amp"),
                ..status("i2c_master", 0, true)
            }],
            devices: vec![],
        };
        let text = board.to_string();
        assert!(text.starts_with("board bench v1.0 (stm32h743, lab)\n"));
        assert!(text.contains("state: down"));
        assert!(text.contains("i2c_master"));
        assert!(text.contains("power=amp"));
        assert!(text.contains("devices:\n  (none)"));
    }
}
