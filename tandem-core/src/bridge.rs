//! Bridge coordinator
//!
//! Owns the console and amplifier devices and ticks them in turn. Proxies
//! raise [`Transition`] events instead of calling back into the bridge; the
//! events are drained after each device tick and turned into power
//! sequencing of the target device.

use tandem_hal::{FlexPin, SerialPort};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::relay::{Device, DeviceError};
use crate::signal::{Transition, TransitionQueue, TRANSITION_CAPACITY};
use crate::trace::TraceSink;

/// Upper bound on transitions handled in one dispatch
///
/// Powering a device up or down can make its proxies raise further
/// transitions; anything beyond this is treated as a sequencing loop.
pub const MAX_DISPATCH: usize = 2 * TRANSITION_CAPACITY;

/// Which side of the bridge a device is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceId {
    Console,
    Amplifier,
}

impl DeviceId {
    /// Both devices, in tick order
    pub const ALL: [DeviceId; 2] = [DeviceId::Console, DeviceId::Amplifier];

    /// The device on the other side of the bridge
    pub const fn peer(self) -> Self {
        match self {
            DeviceId::Console => DeviceId::Amplifier,
            DeviceId::Amplifier => DeviceId::Console,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            DeviceId::Console => 0,
            DeviceId::Amplifier => 1,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceId::Console => "console",
            DeviceId::Amplifier => "amplifier",
        }
    }
}

/// Split the device pair into `id` and its peer
fn pair_mut<T>(devices: &mut [T; 2], id: DeviceId) -> (&mut T, &mut T) {
    let [console, amplifier] = devices;
    match id {
        DeviceId::Console => (console, amplifier),
        DeviceId::Amplifier => (amplifier, console),
    }
}

/// Two paired devices and their power sequencing
pub struct Bridge<U, P, const N: usize> {
    devices: [Device<U, P, N>; 2],
    /// Power state each device takes at start
    powered: [bool; 2],
    transitions: TransitionQueue,
    started: bool,
}

impl<U: SerialPort, P: FlexPin, const N: usize> Bridge<U, P, N> {
    /// Pair two devices
    ///
    /// Pairing is fixed here: the console's peer is always the amplifier.
    pub fn new(
        config: &BridgeConfig,
        console: Device<U, P, N>,
        amplifier: Device<U, P, N>,
    ) -> Self {
        debug_assert_eq!(console.id(), DeviceId::Console);
        debug_assert_eq!(amplifier.id(), DeviceId::Amplifier);

        Self {
            devices: [console, amplifier],
            powered: [config.console.powered, config.amplifier.powered],
            transitions: TransitionQueue::new(),
            started: false,
        }
    }

    pub fn device(&self, id: DeviceId) -> &Device<U, P, N> {
        &self.devices[id.index()]
    }

    pub fn device_mut(&mut self, id: DeviceId) -> &mut Device<U, P, N> {
        &mut self.devices[id.index()]
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Set pins to their initial state and power the devices configured as
    /// powered; the others have their lines suspended
    pub fn start<S: TraceSink>(&mut self, now_ms: u32, sink: &mut S) {
        for device in self.devices.iter_mut() {
            device.start();
        }

        for id in DeviceId::ALL {
            if self.powered[id.index()] {
                if let Err(e) = self.power_up(id, now_ms, sink) {
                    log_warn!(sink, id.as_str(), "Not powered at start: {:?}", e);
                }
            } else {
                let (device, peer) = pair_mut(&mut self.devices, id);
                device.suspend(peer, now_ms, sink, &mut self.transitions);
            }
        }

        self.started = true;
        self.dispatch(now_ms, sink);
        log_info!(sink, "bridge", "Started");
    }

    /// Tick the console, then the amplifier, handling power sequencing
    /// raised by each
    pub fn tick<S: TraceSink>(&mut self, now_ms: u32, sink: &mut S) {
        if !self.started {
            log_warn!(sink, "bridge", "Tick before start ignored");
            return;
        }

        for id in DeviceId::ALL {
            let (device, peer) = pair_mut(&mut self.devices, id);
            device.tick(peer, now_ms, sink, &mut self.transitions);
            self.dispatch(now_ms, sink);
        }
    }

    /// Activate a device's transport and then its lines
    ///
    /// Does nothing if the device is already active.
    pub fn power_up<S: TraceSink>(
        &mut self,
        id: DeviceId,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<(), DeviceError> {
        let (device, peer) = pair_mut(&mut self.devices, id);
        if device.is_active() {
            return Ok(());
        }

        log_info!(sink, id.as_str(), "Power up");
        device.resume(peer, now_ms, sink, &mut self.transitions)?;
        Ok(())
    }

    /// Suspend a device's lines and then close its transport
    ///
    /// Does nothing if the device is already inactive.
    pub fn power_down<S: TraceSink>(&mut self, id: DeviceId, now_ms: u32, sink: &mut S) {
        let (device, peer) = pair_mut(&mut self.devices, id);
        if !device.is_active() {
            return;
        }

        log_info!(sink, id.as_str(), "Power down");
        device.suspend(peer, now_ms, sink, &mut self.transitions);
    }

    /// Apply queued transitions in the order they were raised
    fn dispatch<S: TraceSink>(&mut self, now_ms: u32, sink: &mut S) {
        let mut handled = 0;

        while let Some(Transition { target, on }) = self.transitions.pop_front() {
            if handled == MAX_DISPATCH {
                log_warn!(
                    sink,
                    "bridge",
                    "Sequencing loop, dropped {} transitions",
                    self.transitions.len() + 1
                );
                self.transitions.clear();
                break;
            }
            handled += 1;

            if on {
                // Open failures are already reported by the port
                let _ = self.power_up(target, now_ms, sink);
            } else {
                self.power_down(target, now_ms, sink);
            }
        }
    }
}
