//! End-to-end bridge scenarios driven from a board description

mod common;

use common::{bridge, LogSink, TestBridge};
use tandem_core::config::parse_config;
use tandem_core::signal::SignalLine;
use tandem_core::{DeviceId, LogicValue};
use tandem_hal::mock::MockPin;

const BOARD: &str = r#"
trace = true

[console]
tx = "gpio0"
rx = "gpio1"

[console.proxy.detect]
source = "gpio2"
source_name = "DETECT"
target = "gpio6"
target_name = "DETECT"
on_state = "high"
debounce_on_ms = 100
hold_off_ms = 500
sequences = "amplifier"

[console.monitor.power]
pin = "^gpio8"

[amplifier]
tx = "gpio4"
rx = "gpio5"
wait_for_peer = true
powered = false

[amplifier.proxy.announce]
source = "gpio7"
target = "!gpio3"
on_state = "low"
"#;

fn started() -> (TestBridge, LogSink) {
    let config = parse_config(BOARD).unwrap();
    config.validate().unwrap();

    let mut bridge = bridge(&config);
    let mut sink = LogSink::new();
    bridge.start(0, &mut sink);
    (bridge, sink)
}

fn line_mut<'a>(
    bridge: &'a mut TestBridge,
    id: DeviceId,
    name: &str,
) -> &'a mut SignalLine<MockPin> {
    bridge.device_mut(id).line_mut(name).unwrap()
}

fn set_detect(bridge: &mut TestBridge, high: bool) {
    line_mut(bridge, DeviceId::Console, "detect")
        .as_proxy_mut()
        .unwrap()
        .source_pin_mut()
        .set_input(high);
}

fn detect_output(bridge: &TestBridge) -> Option<bool> {
    bridge
        .device(DeviceId::Console)
        .line("detect")
        .and_then(|l| l.as_proxy())
        .unwrap()
        .target_pin()
        .driven_level()
}

fn amplifier_on(bridge: &TestBridge) -> bool {
    bridge.device(DeviceId::Amplifier).is_active()
}

fn run(bridge: &mut TestBridge, sink: &mut LogSink, from: u32, to: u32) {
    for t in from..to {
        bridge.tick(t, sink);
    }
}

#[test]
fn test_initial_state() {
    let (bridge, _) = started();

    assert!(bridge.device(DeviceId::Console).is_active());
    assert!(!amplifier_on(&bridge));
    // Detect held low for the amplifier until the console asserts it
    assert_eq!(detect_output(&bridge), Some(false));

    let announce = bridge
        .device(DeviceId::Amplifier)
        .line("announce")
        .unwrap();
    assert!(announce.is_suspended());
    assert_eq!(announce.as_proxy().unwrap().target_pin().driven_level(), None);
}

#[test]
fn test_debounced_power_up() {
    let (mut bridge, mut sink) = started();
    run(&mut bridge, &mut sink, 1, 10);

    set_detect(&mut bridge, true);
    run(&mut bridge, &mut sink, 10, 110);
    assert!(!amplifier_on(&bridge));
    assert_eq!(detect_output(&bridge), Some(false));

    bridge.tick(110, &mut sink);
    assert!(amplifier_on(&bridge));
    assert_eq!(detect_output(&bridge), Some(true));
    assert!(sink.contains("Pin 2 (DETECT) -> 6 (DETECT): on (HIGH)"));
}

#[test]
fn test_announce_held_inactive_after_power_up() {
    let (mut bridge, mut sink) = started();
    run(&mut bridge, &mut sink, 1, 10);
    set_detect(&mut bridge, true);
    run(&mut bridge, &mut sink, 10, 111);
    assert!(amplifier_on(&bridge));
    run(&mut bridge, &mut sink, 111, 120);

    let announce = bridge
        .device(DeviceId::Amplifier)
        .line("announce")
        .unwrap();
    assert!(!announce.is_suspended());
    // Never determined before power-up, so it resumes at its inactive level
    assert_eq!(
        announce.as_proxy().unwrap().target_pin().driven_level(),
        Some(false)
    );
}

#[test]
fn test_glitch_does_not_power_up() {
    let (mut bridge, mut sink) = started();
    run(&mut bridge, &mut sink, 1, 10);

    set_detect(&mut bridge, true);
    run(&mut bridge, &mut sink, 10, 60);
    set_detect(&mut bridge, false);
    run(&mut bridge, &mut sink, 60, 400);

    assert!(!amplifier_on(&bridge));
    assert_eq!(
        bridge.device(DeviceId::Amplifier).transport().open_count(),
        0
    );
}

#[test]
fn test_power_down_and_hold_off() {
    let (mut bridge, mut sink) = started();
    run(&mut bridge, &mut sink, 1, 10);
    set_detect(&mut bridge, true);
    run(&mut bridge, &mut sink, 10, 111);
    assert!(amplifier_on(&bridge));

    set_detect(&mut bridge, false);
    bridge.tick(200, &mut sink);
    assert!(!amplifier_on(&bridge));
    assert_eq!(detect_output(&bridge), Some(false));

    // Back on after 100 ms, but the hold-off runs until 700
    set_detect(&mut bridge, true);
    run(&mut bridge, &mut sink, 300, 700);
    assert!(!amplifier_on(&bridge));

    bridge.tick(700, &mut sink);
    assert!(amplifier_on(&bridge));
}

#[test]
fn test_amplifier_waits_for_console() {
    let (mut bridge, mut sink) = started();
    bridge.tick(1, &mut sink);
    set_detect(&mut bridge, true);
    run(&mut bridge, &mut sink, 10, 111);
    assert!(bridge.device(DeviceId::Amplifier).is_waiting());

    // Boot noise from the amplifier is not passed on
    bridge
        .device_mut(DeviceId::Amplifier)
        .transport_mut()
        .inject(&[0x00, 0xFF, 0x00]);
    bridge.tick(111, &mut sink);
    assert!(bridge.device(DeviceId::Console).transport().written().is_empty());

    bridge
        .device_mut(DeviceId::Console)
        .transport_mut()
        .inject(&[0xAA, 0x01, 0x00, 0x00]);
    bridge.tick(112, &mut sink);
    assert_eq!(
        bridge.device(DeviceId::Amplifier).transport().written(),
        [0xAA, 0x01, 0x00, 0x00]
    );
    assert!(sink.contains("00 FF 00 [discarded]"));
    assert!(!bridge.device(DeviceId::Amplifier).is_waiting());

    bridge
        .device_mut(DeviceId::Amplifier)
        .transport_mut()
        .inject(&[0xAA, 0x81, 0x00, 0x00]);
    bridge.tick(113, &mut sink);
    assert_eq!(
        bridge.device(DeviceId::Console).transport().written(),
        [0xAA, 0x81, 0x00, 0x00]
    );
}

#[test]
fn test_console_monitor_reports() {
    let (mut bridge, mut sink) = started();
    bridge.tick(1, &mut sink);
    assert!(sink.contains("Pin 8: LOW"));

    let power = bridge
        .device_mut(DeviceId::Console)
        .line_mut("power")
        .and_then(|l| l.as_monitor_mut())
        .unwrap();
    power.pin_mut().set_input(true);
    bridge.tick(2, &mut sink);
    assert!(sink.contains("Pin 8: HIGH"));
    assert_eq!(
        bridge
            .device(DeviceId::Console)
            .line("power")
            .and_then(|l| l.as_monitor())
            .unwrap()
            .value(),
        LogicValue::High
    );
}
