//! Relay ordering and flush boundary properties

mod common;

use common::{device, dump, LogSink, TestDevice};
use proptest::prelude::*;
use tandem_core::config::{BridgeConfig, DeviceConfig};
use tandem_core::relay::{FlushReason, IDLE_FLUSH_MS, MAX_MESSAGE_LEN, SYNC_BYTE};
use tandem_core::signal::TransitionQueue;
use tandem_core::DeviceId;

fn pair() -> (TestDevice, TestDevice) {
    let config = BridgeConfig::new(
        DeviceConfig::new("console", 0, 1),
        DeviceConfig::new("amplifier", 4, 5),
    );
    let mut console = device(DeviceId::Console, &config);
    let mut amplifier = device(DeviceId::Amplifier, &config);
    console.activate(&mut LogSink::new()).unwrap();
    amplifier.activate(&mut LogSink::new()).unwrap();
    (console, amplifier)
}

/// Reference flush boundaries for a stream delivered without idle gaps
fn expected_flushes(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut flushes = Vec::new();
    let mut buffer: Vec<u8> = Vec::new();

    for &byte in bytes {
        if byte == SYNC_BYTE && !buffer.is_empty() && buffer[0] != SYNC_BYTE {
            flushes.push(std::mem::take(&mut buffer));
        }
        buffer.push(byte);

        let complete = buffer.len() >= 4
            && buffer[0] == SYNC_BYTE
            && buffer.len() >= buffer[2] as usize + 4;
        if buffer.len() == MAX_MESSAGE_LEN || complete {
            flushes.push(std::mem::take(&mut buffer));
        }
    }

    if !buffer.is_empty() {
        flushes.push(buffer);
    }
    flushes
}

#[test]
fn test_unframed_stream_flushes_on_size_then_idle() {
    let (mut console, mut amplifier) = pair();
    let mut queue = TransitionQueue::new();
    let mut sink = LogSink::new();

    let bytes: Vec<u8> = (0..300).map(|i| (i % 0x50) as u8).collect();
    console.transport_mut().inject(&bytes);
    console.tick(&mut amplifier, 1000, &mut sink, &mut queue);

    assert_eq!(console.stats().flushes, 1);
    assert_eq!(console.stats().last_flush, Some(FlushReason::SizeLimit));
    assert_eq!(console.buffer().len(), 300 - MAX_MESSAGE_LEN);

    console.tick(&mut amplifier, 1000 + IDLE_FLUSH_MS - 1, &mut sink, &mut queue);
    assert_eq!(console.stats().flushes, 1);

    console.tick(&mut amplifier, 1000 + IDLE_FLUSH_MS, &mut sink, &mut queue);
    assert_eq!(console.stats().flushes, 2);
    assert_eq!(console.stats().last_flush, Some(FlushReason::Idle));

    let mut expected = dump(&bytes[..MAX_MESSAGE_LEN]);
    expected.extend(dump(&bytes[MAX_MESSAGE_LEN..]));
    assert_eq!(sink.by_source("console"), expected);
    assert_eq!(amplifier.transport().written(), &bytes[..]);
}

#[test]
fn test_back_to_back_frames() {
    let (mut console, mut amplifier) = pair();
    let mut queue = TransitionQueue::new();
    let mut sink = LogSink::new();

    console
        .transport_mut()
        .inject(&[0xAA, 0x10, 0x01, 0x00, 0x7F, 0xAA, 0x11, 0x00, 0x00]);
    console.tick(&mut amplifier, 0, &mut sink, &mut queue);

    assert_eq!(sink.by_source("console"), ["AA 10 01 00 7F", "AA 11 00 00"]);
    assert!(console.buffer().is_empty());
}

#[test]
fn test_directions_interleave_in_arrival_order() {
    let (mut console, mut amplifier) = pair();
    let mut queue = TransitionQueue::new();
    let mut sink = LogSink::new();

    console.transport_mut().inject(&[0x01, 0x02]);
    console.tick(&mut amplifier, 0, &mut sink, &mut queue);
    amplifier.transport_mut().inject(&[0x81]);
    amplifier.tick(&mut console, 0, &mut sink, &mut queue);
    console.transport_mut().inject(&[0x03]);
    console.tick(&mut amplifier, 1, &mut sink, &mut queue);
    console.tick(&mut amplifier, 100, &mut sink, &mut queue);

    let sources: Vec<&str> = sink.lines.iter().map(|(_, s, _)| s.as_str()).collect();
    assert_eq!(sources, ["console", "amplifier", "console"]);
    assert_eq!(amplifier.transport().written(), [0x01, 0x02, 0x03]);
    assert_eq!(console.transport().written(), [0x81]);
}

fn stream() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            4 => any::<u8>(),
            1 => Just(SYNC_BYTE),
            1 => 0u8..8,
        ],
        0..700,
    )
}

proptest! {
    #[test]
    fn prop_bytes_forwarded_in_order(bytes in stream(), chunk in 1usize..64) {
        let (mut console, mut amplifier) = pair();
        let mut queue = TransitionQueue::new();
        let mut sink = LogSink::new();

        for (i, part) in bytes.chunks(chunk).enumerate() {
            console.transport_mut().inject(part);
            console.tick(&mut amplifier, i as u32, &mut sink, &mut queue);
        }

        prop_assert_eq!(amplifier.transport().written(), &bytes[..]);
        prop_assert!(console.buffer().len() < MAX_MESSAGE_LEN);
    }

    #[test]
    fn prop_flushes_only_on_frame_rules(bytes in stream(), chunk in 1usize..64) {
        let (mut console, mut amplifier) = pair();
        let mut queue = TransitionQueue::new();
        let mut sink = LogSink::new();

        let mut now = 0;
        for part in bytes.chunks(chunk) {
            console.transport_mut().inject(part);
            console.tick(&mut amplifier, now, &mut sink, &mut queue);
            now += 1;
        }
        console.tick(&mut amplifier, now + IDLE_FLUSH_MS, &mut sink, &mut queue);

        let flushes = expected_flushes(&bytes);
        let expected: Vec<String> = flushes.iter().flat_map(|f| dump(f)).collect();
        prop_assert_eq!(sink.by_source("console"), expected);
        prop_assert_eq!(console.stats().flushes as usize, flushes.len());
        prop_assert!(console.buffer().is_empty());
    }
}
