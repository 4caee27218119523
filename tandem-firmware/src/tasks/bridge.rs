//! Bridge tick task
//!
//! Services both UARTs and ticks the bridge on a fixed period. All relay,
//! debounce and sequencing work happens inside [`Bridge::tick`].

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};
use tandem_core::config::MAX_LINES;
use tandem_core::{Bridge, DeviceId};
use tandem_hal_rp2040::{RpPin, RpSerial};

use crate::trace::DefmtSink;

/// Tick interval in milliseconds
pub const TICK_INTERVAL_MS: u32 = 1;

/// Bridge over the RP2040 transports and pins
pub type FwBridge = Bridge<RpSerial, RpPin, MAX_LINES>;

#[embassy_executor::task]
pub async fn bridge_task(mut bridge: FwBridge) {
    info!("Bridge task started");

    let mut sink = DefmtSink;
    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS as u64));
    let start = Instant::now();

    bridge.start(0, &mut sink);

    loop {
        ticker.next().await;

        let now_ms = start.elapsed().as_millis() as u32;

        for id in DeviceId::ALL {
            if let Err(e) = bridge.device_mut(id).transport_mut().service() {
                debug!("{}: UART service failed: {:?}", id, e);
            }
        }

        bridge.tick(now_ms, &mut sink);
    }
}
