//! Property-based tests for reference counting.
//! Random acquire/release sequences must keep the counters, the handle slots and
//! the number of real driver calls consistent with a simple model.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use board_manager::mocks::{self, MockConfig, MockDeviceConfig, Op};
use board_manager::{
    Config, DeviceDesc, DeviceImpl, DeviceRegistry, ExtraFnEntry, PeripheralDesc, PeripheralImpl,
    PeripheralRegistry,
};
use proptest::prelude::*;

const NAMES: [&str; 2] = ["bus0", "bus1"];

static BUS0: MockConfig = MockConfig::new("bus0");
static BUS1: MockConfig = MockConfig::new("bus1");

static PERIPHERALS: [PeripheralDesc; 2] = [
    PeripheralDesc::new("bus0", "i2c", "master", Config::new(&BUS0)),
    PeripheralDesc::new("bus1", "spi", "master", Config::new(&BUS1)),
];
static PERIPHERAL_IMPLS: [PeripheralImpl; 2] = [
    mocks::peripheral_impl("i2c", "master"),
    mocks::peripheral_impl("spi", "master"),
];

static SWITCH: MockDeviceConfig = MockDeviceConfig::new("switch", &[]);
static SENSOR_A: MockDeviceConfig = MockDeviceConfig::new("sensorA", &["bus0"]);
static SENSOR_B: MockDeviceConfig = MockDeviceConfig::new("sensorB", &["bus0", "bus1"]);

const DEPENDENTS: [&str; 2] = ["sensorA", "sensorB"];

static DEVICES: [DeviceDesc; 3] = [
    DeviceDesc::new("switch", "mock", "gpio", Config::new(&SWITCH)),
    DeviceDesc::new("sensorA", "mock", "plain", Config::new(&SENSOR_A)).with_power_ctrl("switch"),
    DeviceDesc::new("sensorB", "mock", "plain", Config::new(&SENSOR_B)).with_power_ctrl("switch"),
];
static DEVICE_IMPLS: [DeviceImpl; 1] = [mocks::device_impl("mock")];
static EXTRA_FNS: [ExtraFnEntry; 1] =
    [ExtraFnEntry::power_ctrl("gpio_power_ctrl", mocks::power_ctrl)];

#[derive(Debug, Clone, Copy)]
enum Step {
    Acquire(usize),
    Release(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..2usize).prop_map(Step::Acquire),
        (0..2usize).prop_map(Step::Release),
    ]
}

proptest! {
    /// Acquire adds exactly one; release of an active resource removes exactly one;
    /// release at zero changes nothing. Init runs once per 0 → 1 transition.
    #[test]
    fn peripheral_ref_count_follows_model(steps in prop::collection::vec(step(), 0..64)) {
        mocks::clear_journal();
        let mut periphs = PeripheralRegistry::from_tables(&PERIPHERALS, &PERIPHERAL_IMPLS);
        let mut model = [0u32; 2];
        let mut activations = [0usize; 2];

        for step in steps {
            match step {
                Step::Acquire(i) => {
                    periphs.init(NAMES[i]).unwrap();
                    if model[i] == 0 {
                        activations[i] += 1;
                    }
                    model[i] += 1;
                }
                Step::Release(i) => {
                    periphs.deinit(NAMES[i]).unwrap();
                    model[i] = model[i].saturating_sub(1);
                }
            }
            for i in 0..2 {
                prop_assert_eq!(periphs.ref_count(NAMES[i]).unwrap(), model[i]);
                prop_assert_eq!(periphs.handle(NAMES[i]).is_ok(), model[i] > 0);
                prop_assert_eq!(mocks::count(Op::Init, NAMES[i]), activations[i]);
            }
        }
    }

    /// A shared power device holds exactly one reference per active dependent,
    /// and each bus holds one reference per active device using it.
    #[test]
    fn power_device_refs_match_active_dependents(steps in prop::collection::vec(step(), 0..64)) {
        mocks::clear_journal();
        let mut periphs = PeripheralRegistry::from_tables(&PERIPHERALS, &PERIPHERAL_IMPLS);
        let mut devices = DeviceRegistry::from_tables(&DEVICES, &DEVICE_IMPLS, &[], &EXTRA_FNS);

        for step in steps {
            match step {
                Step::Acquire(i) => devices.init(DEPENDENTS[i], &mut periphs).unwrap(),
                Step::Release(i) => devices.deinit(DEPENDENTS[i], &mut periphs).unwrap(),
            }
            let a = u32::from(devices.is_active("sensorA"));
            let b = u32::from(devices.is_active("sensorB"));
            prop_assert_eq!(devices.ref_count("switch").unwrap(), a + b);
            prop_assert_eq!(periphs.ref_count("bus0").unwrap(), a + b);
            prop_assert_eq!(periphs.ref_count("bus1").unwrap(), b);
        }

        let init_calls = mocks::count(Op::Init, "switch");
        let deinit_calls = mocks::count(Op::Deinit, "switch");
        prop_assert!(init_calls - deinit_calls <= 1);
    }
}
