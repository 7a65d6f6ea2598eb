//! Coordinator side of the network
//!
//! The coordinator keeps a registry of the nodes that announced themselves,
//! answers their broadcasts, collects their data and tells the ones that
//! went quiet to sleep.

mod handlers;
pub mod registry;

pub use self::registry::{Announcement, Device, DeviceStatus, Registry};

use tracing::{debug, info, warn};

use crate::core::{Address, Command, CoordinatorConfig, Result};
use crate::protocol::{Cmd, CommandTable, Envelope, Link, PayloadDecoder};

/// Command table for the coordinator role
pub static MASTER_COMMANDS: CommandTable<Coordinator> = CommandTable::new(&[
    Cmd::new(Command::Broadcast, handlers::broadcast),
    Cmd::new(Command::Data, handlers::data),
    Cmd::new(Command::Sleep, handlers::sleep),
    Cmd::end(),
]);

/// What one housekeeping sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Occupied slots inspected
    pub scanned: usize,
    /// Devices a sleep command was sent to
    pub notified: Vec<Address>,
    /// Devices whose slot was freed afterwards
    pub released: Vec<Address>,
    /// Sleep commands the transport failed to send
    pub failures: usize,
}

/// Coordinator state: the device registry and the payload sink
pub struct Coordinator {
    config: CoordinatorConfig,
    registry: Registry,
    decoder: Box<dyn PayloadDecoder>,
}

impl Coordinator {
    /// Creates a coordinator with an empty registry
    pub fn new(config: CoordinatorConfig, decoder: Box<dyn PayloadDecoder>) -> Result<Self> {
        config.validate()?;
        let registry = Registry::new(config.registry_capacity);

        Ok(Coordinator {
            config,
            registry,
            decoder,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Routes an incoming envelope through the coordinator command table
    pub fn handle(&mut self, link: &mut Link<'_>, envelope: &mut Envelope) -> Result<Option<usize>> {
        MASTER_COMMANDS.dispatch(self, link, envelope)
    }

    /// Asks a device to push its data
    ///
    /// The reply arrives later as a DATA envelope and is handled like any
    /// other incoming envelope.
    pub fn request_data(&mut self, link: &mut Link<'_>, address: Address) -> Result<usize> {
        let mut envelope = Envelope::default();
        let sent = link.send(&mut envelope, address, Command::Data)?;
        debug!(address = %address, sent, "Data requested");
        Ok(sent)
    }

    /// Sends a sleep command to every device silent for longer than the timeout
    ///
    /// Slots are visited in slot order. Local status is left alone unless
    /// `release_stale` is set, in which case the slot is freed once the
    /// command has gone out. Send failures are counted and the sweep goes on.
    pub fn poll(&mut self, link: &mut Link<'_>) -> SweepReport {
        let now = link.now();
        let timeout = self.config.device_timeout.as_secs();
        let mut report = SweepReport {
            scanned: self.registry.len(),
            ..Default::default()
        };

        let mut envelope = Envelope::default();
        for address in self.registry.stale(now, timeout) {
            if let Some(dev) = self.registry.get(address) {
                debug!(
                    address = %address,
                    status = ?dev.status,
                    age = now.since(dev.last_seen),
                    "Device timed out"
                );
            }

            envelope.reset();
            match link.send(&mut envelope, address, Command::Sleep) {
                Ok(sent) => {
                    info!(address = %address, sent, "Sleep sent");
                    report.notified.push(address);
                    if self.config.release_stale && self.registry.release(address) {
                        report.released.push(address);
                    }
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "Sleep send failed");
                    report.failures += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use crate::core::{Error, Ticks, ACK, NACK};
    use crate::hal::ManualClock;
    use crate::protocol::NoPayload;
    use crate::testing::RecordingTransport;

    fn coordinator(capacity: usize) -> Coordinator {
        let config = CoordinatorConfig {
            registry_capacity: capacity,
            device_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        Coordinator::new(config, Box::new(NoPayload)).unwrap()
    }

    fn announce(master: &mut Coordinator, transport: &mut RecordingTransport, clock: &ManualClock, addr: u8) -> Envelope {
        let mut link = Link::new(transport, clock);
        let mut envelope = Envelope::new(Address(addr), Command::Broadcast, vec![]);
        master.handle(&mut link, &mut envelope).unwrap();
        envelope
    }

    #[test]
    fn test_broadcast_registers_and_acks() {
        let mut master = coordinator(4);
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(100);

        for addr in [10, 20, 10, 30] {
            announce(&mut master, &mut transport, &clock, addr);
        }

        assert_eq!(master.registry().len(), 3);
        let replies = transport.drain_sent();
        assert_eq!(replies.len(), 4);
        for (reply, addr) in replies.iter().zip([10, 20, 10, 30]) {
            assert_eq!(reply.address, Address(addr));
            assert_eq!(reply.command(), Some(Command::Broadcast));
            assert_eq!(reply.payload, vec![ACK]);
        }
    }

    #[test]
    fn test_broadcast_nack_when_full() {
        let mut master = coordinator(2);
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);

        announce(&mut master, &mut transport, &clock, 1);
        announce(&mut master, &mut transport, &clock, 2);
        let before = master.registry().slots().to_vec();

        clock.advance(5);
        let reply = announce(&mut master, &mut transport, &clock, 3);

        assert_eq!(reply.address, Address(3));
        assert_eq!(reply.payload, vec![NACK]);
        assert_eq!(master.registry().slots(), &before[..]);
    }

    #[test]
    fn test_sleep_handler() {
        let mut master = coordinator(4);
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);
        announce(&mut master, &mut transport, &clock, 10);
        transport.drain_sent();

        clock.set(7);
        let mut link = Link::new(&mut transport, &clock);
        let mut envelope = Envelope::new(Address(10), Command::Sleep, vec![ACK]);
        assert_eq!(master.handle(&mut link, &mut envelope).unwrap(), Some(0));

        let mut envelope = Envelope::new(Address(55), Command::Sleep, vec![ACK]);
        assert_eq!(master.handle(&mut link, &mut envelope).unwrap(), Some(0));

        let dev = master.registry().get(Address(10)).unwrap();
        assert_eq!(dev.status, DeviceStatus::Asleep);
        assert_eq!(dev.last_seen, Ticks(7));
        assert!(master.registry().get(Address(55)).is_none());
        assert!(transport.sent.is_empty());
    }

    struct Collect(Rc<RefCell<Vec<Envelope>>>);

    impl PayloadDecoder for Collect {
        fn decode(&mut self, envelope: &Envelope) -> Result<()> {
            self.0.borrow_mut().push(envelope.clone());
            Ok(())
        }
    }

    #[test]
    fn test_data_handler_passes_through() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut master = Coordinator::new(CoordinatorConfig::default(), Box::new(Collect(seen.clone()))).unwrap();
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);

        let mut link = Link::new(&mut transport, &clock);
        let mut envelope = Envelope::new(Address(10), Command::Data, vec![1, 0x2a]);
        master.handle(&mut link, &mut envelope).unwrap();

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].payload, vec![1, 0x2a]);
        // Data never touches the registry
        assert!(master.registry().is_empty());
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_unknown_command_ignored() {
        let mut master = coordinator(4);
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);

        let mut link = Link::new(&mut transport, &clock);
        let mut envelope = Envelope { address: Address(10), command: 0x44, payload: vec![] };
        assert_eq!(master.handle(&mut link, &mut envelope).unwrap(), None);
        assert!(master.registry().is_empty());
    }

    #[test]
    fn test_poll_notifies_every_cycle_until_refreshed() {
        let mut master = coordinator(4);
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);

        announce(&mut master, &mut transport, &clock, 10);
        clock.set(5);
        announce(&mut master, &mut transport, &clock, 20);
        transport.drain_sent();

        // Nobody is past the timeout yet
        clock.set(10);
        let report = master.poll(&mut Link::new(&mut transport, &clock));
        assert_eq!(report.scanned, 2);
        assert!(report.notified.is_empty());

        // Device 10 is stale and gets one notice per sweep
        clock.set(11);
        for _ in 0..3 {
            let report = master.poll(&mut Link::new(&mut transport, &clock));
            assert_eq!(report.notified, vec![Address(10)]);
        }
        let sent = transport.drain_sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|e| e.address == Address(10) && e.command() == Some(Command::Sleep)));

        // Local status is untouched by the sweep
        assert_eq!(master.registry().get(Address(10)).unwrap().status, DeviceStatus::NewlyRegistered);

        // A fresh broadcast stops the notices
        announce(&mut master, &mut transport, &clock, 10);
        transport.drain_sent();
        let report = master.poll(&mut Link::new(&mut transport, &clock));
        assert!(report.notified.is_empty());
    }

    #[test]
    fn test_poll_visits_slots_in_order() {
        let mut master = coordinator(4);
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);

        for addr in [30, 10, 20] {
            announce(&mut master, &mut transport, &clock, addr);
        }
        transport.drain_sent();

        clock.set(60);
        let report = master.poll(&mut Link::new(&mut transport, &clock));
        assert_eq!(report.notified, vec![Address(30), Address(10), Address(20)]);
    }

    #[test]
    fn test_poll_counts_failures() {
        let mut master = coordinator(4);
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);
        announce(&mut master, &mut transport, &clock, 10);
        announce(&mut master, &mut transport, &clock, 20);

        let mut broken = RecordingTransport::failing();
        clock.set(30);
        let report = master.poll(&mut Link::new(&mut broken, &clock));

        assert!(report.notified.is_empty());
        assert_eq!(report.failures, 2);
        assert_eq!(master.registry().len(), 2);
    }

    #[test]
    fn test_poll_release_stale() {
        let config = CoordinatorConfig {
            registry_capacity: 1,
            device_timeout: Duration::from_secs(10),
            release_stale: true,
            ..Default::default()
        };
        let mut master = Coordinator::new(config, Box::new(NoPayload)).unwrap();
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);

        announce(&mut master, &mut transport, &clock, 10);
        clock.set(20);
        let report = master.poll(&mut Link::new(&mut transport, &clock));
        assert_eq!(report.released, vec![Address(10)]);
        assert!(master.registry().is_empty());

        // The freed slot accepts a newcomer
        let reply = announce(&mut master, &mut transport, &clock, 40);
        assert_eq!(reply.payload, vec![ACK]);
    }

    #[test]
    fn test_request_data() {
        let mut master = coordinator(4);
        let mut transport = RecordingTransport::default();
        let clock = ManualClock::new(0);

        let sent = master.request_data(&mut Link::new(&mut transport, &clock), Address(20)).unwrap();
        assert_eq!(sent, 2);
        assert_eq!(transport.sent, vec![Envelope::new(Address(20), Command::Data, vec![])]);

        let mut broken = RecordingTransport::failing();
        assert!(master.request_data(&mut Link::new(&mut broken, &clock), Address(20)).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CoordinatorConfig {
            registry_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(Coordinator::new(config, Box::new(NoPayload)), Err(Error::Config(_))));
    }
}
