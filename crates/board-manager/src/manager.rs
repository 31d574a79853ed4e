//! Board manager facade.
//!
//! Owns both registries for one [`BoardDef`] and sequences whole-board
//! bring-up and teardown:
//!
//! ```text
//! init():   peripherals.init_all()  →  devices.init_all()
//!                                       └─ nothing came up → peripherals.deinit_all()
//! deinit(): devices.deinit_all()    →  peripherals.deinit_all()
//! ```
//!
//! Single-resource calls pass straight through to the registries; their errors
//! come back wrapped as [`BoardError::Peripheral`] or [`BoardError::Device`].

use crate::descriptor::{BoardDef, BoardInfo};
use crate::device::DeviceRegistry;
use crate::error::BoardError;
use crate::handle::{Config, Handle, HandleId};
use crate::peripheral::PeripheralRegistry;
use crate::status::BoardStatus;

/// Whole-board lifecycle on top of the peripheral and device registries.
pub struct BoardManager {
    board: &'static BoardDef,
    peripherals: PeripheralRegistry,
    devices: DeviceRegistry,
    initialized: bool,
}

impl BoardManager {
    /// Build both registries for `board`. Nothing is initialized yet.
    pub fn new(board: &'static BoardDef) -> Self {
        info!(
            "board '{}': {} peripherals, {} devices",
            board.info.name,
            board.peripherals.len(),
            board.devices.len()
        );
        Self {
            board,
            peripherals: PeripheralRegistry::new(board),
            devices: DeviceRegistry::new(board),
            initialized: false,
        }
    }

    /// Bring up every peripheral, then every device not marked `init_skip`.
    ///
    /// Both passes are best effort. If devices were attempted and none came
    /// up, the peripherals are rolled back and the first device error is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`BoardError::AlreadyInitialized`] - called twice without [`deinit`](Self::deinit)
    /// - [`BoardError::Device`] - every attempted device failed
    pub fn init(&mut self) -> Result<(), BoardError> {
        if self.initialized {
            warn!("board '{}' already initialized", self.board.info.name);
            return Err(BoardError::AlreadyInitialized);
        }
        info!("board '{}' init", self.board.info.name);

        let periph_report = self.peripherals.init_all();
        if periph_report.failed > 0 {
            warn!(
                "board '{}': {} of {} peripherals failed",
                self.board.info.name,
                periph_report.failed,
                periph_report.attempted
            );
        }

        let device_report = self.devices.init_all(&mut self.peripherals);
        if device_report.is_total_failure() {
            error!(
                "board '{}': no device came up, rolling back peripherals",
                self.board.info.name
            );
            self.peripherals.deinit_all();
            let err = device_report.first_error.map_or(BoardError::NotInitialized, BoardError::Device);
            return Err(err);
        }
        if device_report.failed > 0 {
            warn!(
                "board '{}': {} of {} devices failed",
                self.board.info.name,
                device_report.failed,
                device_report.attempted
            );
        }

        self.initialized = true;
        info!(
            "board '{}' ready: {} peripherals, {} devices",
            self.board.info.name,
            periph_report.succeeded,
            device_report.succeeded
        );
        Ok(())
    }

    /// Tear down every device, then every peripheral, in reverse declared order.
    ///
    /// # Errors
    ///
    /// [`BoardError::NotInitialized`] if [`init`](Self::init) has not succeeded.
    pub fn deinit(&mut self) -> Result<(), BoardError> {
        if !self.initialized {
            warn!("board '{}' not initialized", self.board.info.name);
            return Err(BoardError::NotInitialized);
        }
        info!("board '{}' deinit", self.board.info.name);

        let device_report = self.devices.deinit_all(&mut self.peripherals);
        let periph_report = self.peripherals.deinit_all();
        if device_report.failed > 0 || periph_report.failed > 0 {
            warn!(
                "board '{}' deinit: {} device and {} peripheral failures",
                self.board.info.name,
                device_report.failed,
                periph_report.failed
            );
        }

        self.initialized = false;
        info!("board '{}' down", self.board.info.name);
        Ok(())
    }

    /// `true` between a successful [`init`](Self::init) and [`deinit`](Self::deinit).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Identification of the managed board.
    pub fn board_info(&self) -> &'static BoardInfo {
        &self.board.info
    }

    /// The peripheral registry.
    pub fn peripherals(&self) -> &PeripheralRegistry {
        &self.peripherals
    }

    /// The device registry.
    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    /// Snapshot of every peripheral and device.
    pub fn status(&self) -> BoardStatus {
        BoardStatus {
            info: self.board.info,
            initialized: self.initialized,
            peripherals: self.peripherals.statuses().collect(),
            devices: self.devices.statuses().collect(),
        }
    }

    // ── Devices ─────────────────────────────────────────────────────────────

    /// Acquire one reference on device `name`.
    pub fn init_device(&mut self, name: &str) -> Result<(), BoardError> {
        self.devices
            .init(name, &mut self.peripherals)
            .map_err(BoardError::Device)
    }

    /// Release one reference on device `name`.
    pub fn deinit_device(&mut self, name: &str) -> Result<(), BoardError> {
        self.devices
            .deinit(name, &mut self.peripherals)
            .map_err(BoardError::Device)
    }

    /// Handle of active device `name`.
    pub fn device_handle(&self, name: &str) -> Result<&Handle, BoardError> {
        self.devices.handle(name).map_err(BoardError::Device)
    }

    /// Mutable handle of active device `name`.
    pub fn device_handle_mut(&mut self, name: &str) -> Result<&mut Handle, BoardError> {
        self.devices.handle_mut(name).map_err(BoardError::Device)
    }

    /// Static configuration of device `name`.
    pub fn device_config(&self, name: &str) -> Result<Config, BoardError> {
        self.devices.config(name).map_err(BoardError::Device)
    }

    /// Static configuration of the device owning handle `id`.
    pub fn device_config_by_handle(&self, id: HandleId) -> Result<Config, BoardError> {
        self.devices.config_by_handle(id).map_err(BoardError::Device)
    }

    /// Name of the device owning handle `id`.
    pub fn device_name_by_handle(&self, id: HandleId) -> Result<&'static str, BoardError> {
        self.devices.name_by_handle(id).map_err(BoardError::Device)
    }

    /// Reference count of device `name`.
    pub fn device_ref_count(&self, name: &str) -> Result<u32, BoardError> {
        self.devices.ref_count(name).map_err(BoardError::Device)
    }

    /// Switch device `name`'s power through its `power_ctrl` device.
    pub fn device_power_ctrl(&mut self, name: &str, on: bool) -> Result<(), BoardError> {
        self.devices
            .power_ctrl(name, on, &mut self.peripherals)
            .map_err(BoardError::Device)
    }

    // ── Peripherals ─────────────────────────────────────────────────────────

    /// Acquire one reference on peripheral `name`.
    pub fn init_periph(&mut self, name: &str) -> Result<(), BoardError> {
        self.peripherals.init(name).map_err(BoardError::Peripheral)
    }

    /// Release one reference on peripheral `name`.
    pub fn deinit_periph(&mut self, name: &str) -> Result<(), BoardError> {
        self.peripherals.deinit(name).map_err(BoardError::Peripheral)
    }

    /// Handle of active peripheral `name`.
    pub fn periph_handle(&self, name: &str) -> Result<&Handle, BoardError> {
        self.peripherals.handle(name).map_err(BoardError::Peripheral)
    }

    /// Mutable handle of active peripheral `name`.
    pub fn periph_handle_mut(&mut self, name: &str) -> Result<&mut Handle, BoardError> {
        self.peripherals
            .handle_mut(name)
            .map_err(BoardError::Peripheral)
    }

    /// Static configuration of peripheral `name`.
    pub fn periph_config(&self, name: &str) -> Result<Config, BoardError> {
        self.peripherals.config(name).map_err(BoardError::Peripheral)
    }

    /// Name of the peripheral owning handle `id`.
    pub fn periph_name_by_handle(&self, id: HandleId) -> Result<&'static str, BoardError> {
        self.peripherals
            .name_by_handle(id)
            .map_err(BoardError::Peripheral)
    }

    /// Reference count of peripheral `name`.
    pub fn periph_ref_count(&self, name: &str) -> Result<u32, BoardError> {
        self.peripherals
            .ref_count(name)
            .map_err(BoardError::Peripheral)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::descriptor::{DeviceDesc, DeviceImpl, PeripheralDesc, PeripheralImpl};
    use crate::error::{DriverError, Error};
    use crate::mocks::{self, MockConfig, MockDeviceConfig, Op};

    const INFO: BoardInfo = BoardInfo {
        name: "bench",
        chip: "host",
        version: "0.1",
        manufacturer: "lab",
        description: "facade tests",
    };

    static BUS0: MockConfig = MockConfig::new("bus0");
    static PERIPHERALS: [PeripheralDesc; 1] =
        [PeripheralDesc::new("bus0", "bus", "m", Config::new(&BUS0))];
    static PERIPHERAL_IMPLS: [PeripheralImpl; 1] = [mocks::peripheral_impl("bus", "m")];
    static DEVICE_IMPLS: [DeviceImpl; 1] = [mocks::device_impl("mock")];

    static SENSOR_A: MockDeviceConfig = MockDeviceConfig::new("sensorA", &["bus0"]);
    static DEAD: MockDeviceConfig = MockDeviceConfig::new("dead", &["bus0"]).failing_init();

    static GOOD_DEVICES: [DeviceDesc; 1] =
        [DeviceDesc::new("sensorA", "mock", "plain", Config::new(&SENSOR_A))];
    static DEAD_DEVICES: [DeviceDesc; 1] =
        [DeviceDesc::new("dead", "mock", "plain", Config::new(&DEAD))];

    static GOOD: BoardDef = BoardDef {
        info: INFO,
        peripherals: &PERIPHERALS,
        peripheral_impls: &PERIPHERAL_IMPLS,
        devices: &GOOD_DEVICES,
        device_impls: &DEVICE_IMPLS,
        entries: &[],
        extra_fns: &[],
    };

    static DEAD_BOARD: BoardDef = BoardDef {
        info: INFO,
        peripherals: &PERIPHERALS,
        peripheral_impls: &PERIPHERAL_IMPLS,
        devices: &DEAD_DEVICES,
        device_impls: &DEVICE_IMPLS,
        entries: &[],
        extra_fns: &[],
    };

    #[test]
    fn init_twice_is_rejected() {
        mocks::clear_journal();
        let mut board = BoardManager::new(&GOOD);
        board.init().unwrap();
        assert_eq!(board.init(), Err(BoardError::AlreadyInitialized));
        assert_eq!(mocks::count(Op::Init, "sensorA"), 1);
    }

    #[test]
    fn deinit_before_init_is_rejected() {
        let mut board = BoardManager::new(&GOOD);
        assert_eq!(board.deinit(), Err(BoardError::NotInitialized));
    }

    #[test]
    fn init_deinit_cycle() {
        let mut board = BoardManager::new(&GOOD);
        board.init().unwrap();
        assert!(board.is_initialized());
        assert_eq!(board.periph_ref_count("bus0"), Ok(2));
        assert_eq!(board.device_ref_count("sensorA"), Ok(1));

        board.deinit().unwrap();
        assert!(!board.is_initialized());
        assert_eq!(board.status().active_count(), 0);
        assert_eq!(board.deinit(), Err(BoardError::NotInitialized));
    }

    #[test]
    fn total_device_failure_rolls_back_peripherals() {
        let mut board = BoardManager::new(&DEAD_BOARD);
        assert_eq!(
            board.init(),
            Err(BoardError::Device(Error::InitFailed(DriverError::Communication)))
        );
        assert!(!board.is_initialized());
        assert_eq!(board.periph_ref_count("bus0"), Ok(0));
    }

    #[test]
    fn pass_through_errors_are_wrapped() {
        let mut board = BoardManager::new(&GOOD);
        assert_eq!(
            board.init_device("nope"),
            Err(BoardError::Device(Error::NotFound))
        );
        assert_eq!(
            board.periph_handle("bus0").unwrap_err(),
            BoardError::Peripheral(Error::NotActive)
        );
        assert_eq!(
            board.device_power_ctrl("sensorA", true),
            Err(BoardError::Device(Error::NoPowerCtrl))
        );
    }

    #[test]
    fn reverse_lookups_through_facade() {
        let mut board = BoardManager::new(&GOOD);
        board.init_device("sensorA").unwrap();
        let device_id = board.device_handle("sensorA").unwrap().id();
        let bus_id = board.periph_handle("bus0").unwrap().id();

        assert_eq!(board.device_name_by_handle(device_id), Ok("sensorA"));
        assert_eq!(board.periph_name_by_handle(bus_id), Ok("bus0"));
        let config = board.device_config_by_handle(device_id).unwrap();
        assert_eq!(config.get::<MockDeviceConfig>().unwrap().tag, "sensorA");
        assert_eq!(
            board.periph_config("bus0").unwrap().get::<MockConfig>().unwrap().tag,
            "bus0"
        );
    }

    #[test]
    fn status_reflects_board_info() {
        let board = BoardManager::new(&GOOD);
        let status = board.status();
        assert_eq!(status.info, INFO);
        assert!(!status.initialized);
        assert_eq!(status.peripherals.len(), 1);
        assert_eq!(status.devices.len(), 1);
        assert_eq!(board.board_info().name, "bench");
    }
}
