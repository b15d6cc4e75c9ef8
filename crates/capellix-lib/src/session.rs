//! Commander Core session: framing, endpoint reads, init, color push.
//!
//! A [`CommanderCore`] owns one open controller. The foreground caller and
//! the keepalive thread share its core through an `Arc`; the transport sits
//! behind the transfer lock so at most one HID transfer is in flight.
//!
//! Protocol operations never fail. A timeout or transport error reads as an
//! empty response, and every consumer of a response has a documented
//! fallback for that case.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::device::{DeviceInfo, FirmwareVersion, HidTransport};
use crate::frame;
use crate::keepalive::{KeepaliveConfig, KeepaliveGuard};
use crate::led::{self, Rgb};
use crate::models::DeviceProfile;
use crate::protocol::{
    CMD_CLOSE_ENDPOINT, CMD_GET_FIRMWARE, CMD_HARDWARE_MODE, CMD_OPEN_COLOR_ENDPOINT,
    CMD_OPEN_ENDPOINT, CMD_READ, CMD_SOFTWARE_MODE, MAX_LED_CHANNELS, MODE_GET_LEDS,
    MODE_SET_COLOR, PORT_SETTLE_DELAY_MS, READ_TIMEOUT_MS, SETTLE_DELAY_MS, init_port_command,
};
use crate::topology::ChannelTable;

// ── Options ──

/// Delays applied around HID transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolTiming {
    /// Pause between a write and its read.
    pub settle_delay: Duration,
    /// Pause after enabling all LED ports.
    pub port_settle: Duration,
    /// Read timeout per transfer, in milliseconds.
    pub read_timeout_ms: i32,
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            port_settle: Duration::from_millis(PORT_SETTLE_DELAY_MS),
            read_timeout_ms: READ_TIMEOUT_MS,
        }
    }
}

impl ProtocolTiming {
    /// No delays at all. For in-memory transports.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            port_settle: Duration::ZERO,
            read_timeout_ms: 0,
        }
    }
}

/// Everything a session needs besides the transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub timing: ProtocolTiming,
    pub keepalive: KeepaliveConfig,
}

// ── Init sequence ──

/// One step of session initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    ReadFirmware,
    SoftwareMode,
    InitPorts,
    QueryTopology,
    OpenColorEndpoint,
    StartKeepalive,
}

/// The device's state machine requires exactly this order.
pub const INIT_SEQUENCE: [InitStep; 6] = [
    InitStep::ReadFirmware,
    InitStep::SoftwareMode,
    InitStep::InitPorts,
    InitStep::QueryTopology,
    InitStep::OpenColorEndpoint,
    InitStep::StartKeepalive,
];

/// What one keepalive wakeup did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveAction {
    /// Last commit is recent enough.
    Idle,
    /// Resent the last color buffer.
    Resent,
    /// Nothing was ever sent; pinged with a firmware query.
    Pinged,
}

// ── Shared core ──

fn lock<M>(m: &Mutex<M>) -> MutexGuard<'_, M> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the foreground session and the keepalive thread.
struct Shared<T> {
    /// The transfer lock. `None` once the session has been torn down.
    transport: Mutex<Option<T>>,
    profile: DeviceProfile,
    timing: ProtocolTiming,
    threshold: Duration,
    last_colors: Mutex<Vec<u8>>,
    last_commit: Mutex<Instant>,
}

impl<T: HidTransport> Shared<T> {
    /// One framed write + read on an already locked transport.
    fn transfer_on(&self, dev: &T, command: &[u8], payload: &[u8]) -> Vec<u8> {
        let pkt = frame::build_packet(self.profile.write_buffer_size, command, payload);
        if let Err(e) = dev.write(&pkt) {
            log::warn!("write {command:02X?} failed: {e}");
            return Vec::new();
        }
        if !self.timing.settle_delay.is_zero() {
            thread::sleep(self.timing.settle_delay);
        }

        let mut buf = vec![0u8; self.profile.buffer_size];
        match dev.read_timeout(&mut buf, self.timing.read_timeout_ms) {
            Ok(n) => {
                buf.truncate(n);
                buf
            }
            Err(e) => {
                log::warn!("read after {command:02X?} failed: {e}");
                Vec::new()
            }
        }
    }

    fn transfer(&self, command: &[u8], payload: &[u8]) -> Vec<u8> {
        let guard = lock(&self.transport);
        match guard.as_ref() {
            Some(dev) => self.transfer_on(dev, command, payload),
            None => {
                log::debug!("transfer {command:02X?} after teardown ignored");
                Vec::new()
            }
        }
    }

    fn read_endpoint(&self, mode: u8) -> Vec<u8> {
        let guard = lock(&self.transport);
        let Some(dev) = guard.as_ref() else {
            return Vec::new();
        };
        self.transfer_on(dev, CMD_CLOSE_ENDPOINT, &[mode]);
        self.transfer_on(dev, CMD_OPEN_ENDPOINT, &[mode]);
        let resp = self.transfer_on(dev, CMD_READ, &[mode]);
        self.transfer_on(dev, CMD_CLOSE_ENDPOINT, &[mode]);
        resp
    }

    /// One color chunk run on an already locked transport.
    fn write_colors_on(&self, dev: &T, rgb: &[u8]) {
        let payload = frame::build_color_payload(rgb);
        for (command, chunk) in frame::color_chunks(&payload, self.profile.max_chunk) {
            self.transfer_on(dev, command, chunk);
        }
        *lock(&self.last_commit) = Instant::now();
    }

    fn send_colors(&self, rgb: &[u8]) {
        if rgb.is_empty() {
            return;
        }
        let guard = lock(&self.transport);
        let Some(dev) = guard.as_ref() else {
            log::debug!("color write after teardown ignored");
            return;
        };
        *lock(&self.last_colors) = rgb.to_vec();
        self.write_colors_on(dev, rgb);
    }

    fn keepalive_tick(&self, now: Instant) -> KeepaliveAction {
        let elapsed = now.saturating_duration_since(*lock(&self.last_commit));
        if elapsed <= self.threshold {
            return KeepaliveAction::Idle;
        }

        let guard = lock(&self.transport);
        let Some(dev) = guard.as_ref() else {
            return KeepaliveAction::Idle;
        };
        // Read under the transfer lock: the buffer is whatever the last
        // completed foreground write stored.
        let last = lock(&self.last_colors).clone();
        if last.is_empty() {
            log::debug!("keepalive: no colors yet, pinging");
            self.transfer_on(dev, CMD_GET_FIRMWARE, &[]);
            *lock(&self.last_commit) = Instant::now();
            KeepaliveAction::Pinged
        } else {
            log::debug!("keepalive: resending {} color bytes", last.len());
            self.write_colors_on(dev, &last);
            KeepaliveAction::Resent
        }
    }
}

// ── Session ──

/// An open Commander Core.
///
/// Construct with [`CommanderCore::new`] and run [`initialize`](Self::initialize),
/// or use [`CommanderCore::open`] for both. Dropping the session runs
/// [`shutdown`](Self::shutdown).
pub struct CommanderCore<T: HidTransport + 'static> {
    shared: Arc<Shared<T>>,
    info: DeviceInfo,
    firmware: Option<FirmwareVersion>,
    channels: ChannelTable,
    keepalive_config: KeepaliveConfig,
    keepalive: KeepaliveGuard,
    /// Set once the host has taken lighting control.
    software_mode: AtomicBool,
    shut_down: bool,
}

impl<T: HidTransport + 'static> CommanderCore<T> {
    /// Wrap an open transport. Performs no I/O.
    pub fn new(transport: T, info: DeviceInfo, options: SessionOptions) -> Self {
        let profile = DeviceProfile::for_product(info.product_id);
        log::debug!(
            "{} (0x{:04X}): {}-byte reports, {}-byte chunks",
            info.model(),
            info.product_id,
            profile.buffer_size,
            profile.max_chunk
        );
        let shared = Arc::new(Shared {
            transport: Mutex::new(Some(transport)),
            profile,
            timing: options.timing,
            threshold: options.keepalive.threshold,
            last_colors: Mutex::new(Vec::new()),
            last_commit: Mutex::new(Instant::now()),
        });
        Self {
            shared,
            info,
            firmware: None,
            channels: ChannelTable::default(),
            keepalive_config: options.keepalive,
            keepalive: KeepaliveGuard::idle(),
            software_mode: AtomicBool::new(false),
            shut_down: false,
        }
    }

    /// [`new`](Self::new) followed by [`initialize`](Self::initialize).
    pub fn open(transport: T, info: DeviceInfo, options: SessionOptions) -> Self {
        let mut session = Self::new(transport, info, options);
        session.initialize();
        session
    }

    // ── Framing ──

    /// Send one framed command and return whatever the device answered.
    ///
    /// An empty vector means timeout or transport failure.
    pub fn transfer(&self, command: &[u8], payload: &[u8]) -> Vec<u8> {
        self.shared.transfer(command, payload)
    }

    /// Close, open, read, close an endpoint in `mode`; return the read reply.
    pub fn read_endpoint(&self, mode: u8) -> Vec<u8> {
        self.shared.read_endpoint(mode)
    }

    // ── Init steps ──

    /// Query the firmware version. `None` on a short or empty reply.
    pub fn read_firmware(&mut self) -> Option<FirmwareVersion> {
        let resp = self.transfer(CMD_GET_FIRMWARE, &[]);
        self.firmware = FirmwareVersion::from_response(&resp);
        match self.firmware {
            Some(fw) => log::debug!("firmware {fw}"),
            None => log::warn!("firmware query returned {} bytes", resp.len()),
        }
        self.firmware
    }

    /// Hand lighting control to the host.
    pub fn set_software_mode(&self) {
        self.transfer(CMD_SOFTWARE_MODE, &[]);
        self.software_mode.store(true, Ordering::SeqCst);
    }

    /// Hand lighting control back to the controller firmware.
    pub fn set_hardware_mode(&self) {
        self.transfer(CMD_HARDWARE_MODE, &[]);
    }

    /// Enable every LED port, then give the device time to apply it.
    pub fn init_ports(&self) {
        for port in 0..MAX_LED_CHANNELS as u8 {
            self.transfer(&init_port_command(port), &[]);
        }
        if !self.shared.timing.port_settle.is_zero() {
            thread::sleep(self.shared.timing.port_settle);
        }
    }

    /// Re-read the LED configuration and replace the channel table.
    pub fn query_led_config(&mut self) -> &ChannelTable {
        let resp = self.read_endpoint(MODE_GET_LEDS);
        self.channels = ChannelTable::parse(&resp);
        log::debug!(
            "{} channels, {} LEDs{}",
            self.channels.len(),
            self.channels.total_leds(),
            if self.channels.fallback { " (default layout)" } else { "" }
        );
        &self.channels
    }

    /// Open the color endpoint. It stays open for the rest of the session.
    pub fn open_color_endpoint(&self) {
        self.transfer(CMD_CLOSE_ENDPOINT, &[MODE_SET_COLOR]);
        self.transfer(CMD_OPEN_COLOR_ENDPOINT, &[MODE_SET_COLOR]);
    }

    /// (Re)start the keepalive thread. The silence clock starts over.
    pub fn start_keepalive(&mut self) {
        self.keepalive.stop();
        *lock(&self.shared.last_commit) = Instant::now();
        let shared = Arc::clone(&self.shared);
        self.keepalive = KeepaliveGuard::start(self.keepalive_config.interval, move || {
            shared.keepalive_tick(Instant::now());
        });
    }

    /// Stop the keepalive thread and wait for it to exit.
    pub fn stop_keepalive(&mut self) {
        self.keepalive.stop();
    }

    pub fn keepalive_running(&self) -> bool {
        self.keepalive.is_running()
    }

    /// Run one initialization step.
    pub fn run_step(&mut self, step: InitStep) {
        log::debug!("init: {step:?}");
        match step {
            InitStep::ReadFirmware => {
                self.read_firmware();
            }
            InitStep::SoftwareMode => self.set_software_mode(),
            InitStep::InitPorts => self.init_ports(),
            InitStep::QueryTopology => {
                self.query_led_config();
            }
            InitStep::OpenColorEndpoint => self.open_color_endpoint(),
            InitStep::StartKeepalive => self.start_keepalive(),
        }
    }

    /// Run [`INIT_SEQUENCE`]. Never aborts; each step absorbs its own failures.
    pub fn initialize(&mut self) {
        for step in INIT_SEQUENCE {
            self.run_step(step);
        }
    }

    // ── Colors ──

    /// Push a flat RGB buffer (already in device zone layout).
    ///
    /// An empty buffer does nothing.
    pub fn send_colors(&self, rgb: &[u8]) {
        self.shared.send_colors(rgb);
    }

    /// Push one color per LED, in channel order.
    pub fn update_leds(&self, colors: &[Rgb]) {
        let rgb = led::pack_zones(&self.channels, colors);
        self.send_colors(&rgb);
    }

    /// Run one keepalive check as if the clock read `now`.
    pub fn keepalive_tick(&self, now: Instant) -> KeepaliveAction {
        self.shared.keepalive_tick(now)
    }

    /// Copy of the last buffer passed to [`send_colors`](Self::send_colors).
    pub fn last_color_buffer(&self) -> Vec<u8> {
        lock(&self.shared.last_colors).clone()
    }

    // ── Identity ──

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn total_leds(&self) -> usize {
        self.channels.total_leds()
    }

    pub fn firmware(&self) -> Option<FirmwareVersion> {
        self.firmware
    }

    /// Firmware as `v{major}.{minor}.{patch}`, or `"unknown"`.
    pub fn firmware_version(&self) -> String {
        self.firmware
            .map(|fw| fw.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn serial(&self) -> Option<&str> {
        self.info.serial.as_deref()
    }

    /// USB product string, or the model name if the device sent none.
    pub fn device_name(&self) -> &str {
        if self.info.product_name.is_empty() {
            self.info.model()
        } else {
            &self.info.product_name
        }
    }

    /// Model name from the product table, e.g. "Commander ST".
    pub fn model(&self) -> &str {
        self.info.model()
    }

    pub fn device_path(&self) -> &str {
        &self.info.path
    }

    pub fn profile(&self) -> DeviceProfile {
        self.shared.profile
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    // ── Teardown ──

    /// Stop keepalive, restore hardware lighting, release the transport.
    ///
    /// Hardware mode is only sent if this session switched the device to
    /// software mode; a read-only session leaves the lighting untouched.
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.keepalive.stop();
        if self.software_mode.load(Ordering::SeqCst) {
            self.set_hardware_mode();
        }
        let transport = lock(&self.shared.transport).take();
        drop(transport);
        log::debug!("session closed");
    }
}

impl<T: HidTransport + 'static> Drop for CommanderCore<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
