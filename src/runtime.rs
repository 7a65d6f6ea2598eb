//! Cooperative run loops for each role
//!
//! Each loop owns its role context and, on every tick, first drains the
//! transport through the role's command table and then runs the role's
//! housekeeping poll. Everything happens on one task, so the context is
//! never touched concurrently.

use tokio::sync::oneshot;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::Result;
use crate::hal::{Clock, Power};
use crate::master::Coordinator;
use crate::protocol::{Envelope, Link};
use crate::slave::{Node, PollOutcome};
use crate::transport::Transport;

/// Upper bound on envelopes handled per tick, so polls are never starved
pub const MAX_DISPATCH_PER_TICK: usize = 16;

/// Counters describing a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks processed
    pub cycles: u64,
    /// Envelopes routed through the command table
    pub dispatched: u64,
    /// Times standby was entered
    pub standbys: u64,
}

/// Routes pending envelopes to `handle` until the transport runs dry
///
/// Handler failures are logged and do not stop the drain. A receive failure
/// is logged and ends the drain for this tick; the caller still polls.
fn drain<F>(link: &mut Link<'_>, mut handle: F) -> u64
where
    F: FnMut(&mut Link<'_>, &mut Envelope) -> Result<Option<usize>>,
{
    let mut handled = 0;
    for _ in 0..MAX_DISPATCH_PER_TICK {
        let mut envelope = match link.transport.try_recv() {
            Ok(Some(envelope)) => envelope,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Receive failed");
                break;
            }
        };

        let from = envelope.address;
        let command = envelope.command;
        if let Err(e) = handle(&mut *link, &mut envelope) {
            warn!(address = %from, command, error = %e, "Handler failed");
        }
        handled += 1;
    }
    handled
}

/// Runs the coordinator until `shutdown` fires
pub async fn run_coordinator<T, K>(
    coordinator: &mut Coordinator,
    transport: &mut T,
    clock: &K,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<RunSummary>
where
    T: Transport,
    K: Clock,
{
    let mut ticker = interval(coordinator.config().poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = RunSummary::default();

    info!(capacity = coordinator.registry().capacity(), "Coordinator started");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let mut link = Link::new(&mut *transport, clock);
                summary.dispatched += drain(&mut link, |link, envelope| coordinator.handle(link, envelope));

                let report = coordinator.poll(&mut link);
                if !report.notified.is_empty() || report.failures > 0 {
                    debug!(?report, "Sweep");
                }
                summary.cycles += 1;
            }
        }
    }

    info!(?summary, "Coordinator stopped");
    Ok(summary)
}

/// Runs a sensor node until `shutdown` fires
///
/// When the node asks for standby the wake alarm is armed and the power
/// primitive invoked. Control coming back means the suspension is simulated,
/// so the loop waits out the alarm itself and wakes the node.
pub async fn run_node<T, K, P>(
    node: &mut Node,
    transport: &mut T,
    clock: &mut K,
    power: &mut P,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<RunSummary>
where
    T: Transport,
    K: Clock,
    P: Power,
{
    let mut ticker = interval(node.config().poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = RunSummary::default();

    info!(address = %node.config().address, "Node started");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let outcome = {
                    let mut link = Link::new(&mut *transport, &*clock);
                    summary.dispatched += drain(&mut link, |link, envelope| node.handle(link, envelope));
                    node.poll(&mut link)
                };
                summary.cycles += 1;

                match outcome {
                    Ok(PollOutcome::Standby { wake_after, reason }) => {
                        clock.set_alarm(wake_after)?;
                        power.standby()?;
                        summary.standbys += 1;
                        debug!(?reason, ?wake_after, "Standby");

                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = sleep(wake_after) => {}
                        }
                        node.wake();
                        ticker.reset();
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Poll failed"),
                }
            }
        }
    }

    info!(?summary, "Node stopped");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::core::{Address, CoordinatorConfig, NodeConfig};
    use crate::hal::{HostPower, ManualClock, SystemClock};
    use crate::master::DeviceStatus;
    use crate::protocol::NoPayload;
    use crate::slave::NodeStatus;
    use crate::transport::ChannelTransport;

    fn node_config(address: u8) -> NodeConfig {
        NodeConfig {
            address: Address(address),
            retry_limit: 3,
            standby_interval: Duration::from_millis(200),
            poll_interval: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn test_node_registers_with_coordinator() {
        let (mut master_link, mut node_link) = ChannelTransport::pair();

        let mut coordinator = Coordinator::new(
            CoordinatorConfig {
                poll_interval: Duration::from_millis(10),
                ..Default::default()
            },
            Box::new(NoPayload),
        ).unwrap();
        let mut node = Node::new(node_config(30), Box::new(NoPayload)).unwrap();

        let master_clock = SystemClock::new();
        let mut node_clock = SystemClock::new();
        let mut power = HostPower::new();

        let (stop_master, master_shutdown) = oneshot::channel();
        let (stop_node, node_shutdown) = oneshot::channel();

        let stopper = async {
            sleep(Duration::from_millis(300)).await;
            let _ = stop_node.send(());
            let _ = stop_master.send(());
        };

        let (master_summary, node_summary, _) = tokio::join!(
            run_coordinator(&mut coordinator, &mut master_link, &master_clock, master_shutdown),
            run_node(&mut node, &mut node_link, &mut node_clock, &mut power, node_shutdown),
            stopper,
        );

        let master_summary = master_summary.unwrap();
        let node_summary = node_summary.unwrap();

        assert!(master_summary.cycles > 0);
        assert!(master_summary.dispatched >= 1);
        assert_eq!(node_summary.standbys, 0);

        let dev = coordinator.registry().get(Address(30)).unwrap();
        assert_eq!(dev.status, DeviceStatus::NewlyRegistered);
        assert_eq!(node.status(), NodeStatus::WaitingForAck);
        assert_eq!(power.standby_count(), 0);
    }

    #[tokio::test]
    async fn test_unanswered_node_enters_standby() {
        // Nobody listens on the other end, but keep it alive
        let (_master_link, mut node_link) = ChannelTransport::pair();

        let mut node = Node::new(node_config(30), Box::new(NoPayload)).unwrap();
        let mut clock = ManualClock::new(0);
        let mut power = HostPower::new();
        let (stop, shutdown) = oneshot::channel();

        let stopper = async {
            // Three broadcasts and a standby fit well inside this window
            sleep(Duration::from_millis(350)).await;
            let _ = stop.send(());
        };

        let (summary, _) = tokio::join!(
            run_node(&mut node, &mut node_link, &mut clock, &mut power, shutdown),
            stopper,
        );

        let summary = summary.unwrap();
        assert!(summary.standbys >= 1);
        assert_eq!(power.standby_count() as u64, summary.standbys);
        assert_eq!(clock.alarm(), Some(Duration::from_millis(200)));
        // At most three broadcasts fit between standbys
        assert!(node.retries() <= 3);
    }

    #[test]
    fn test_drain_limits_envelopes_per_tick() {
        use crate::core::Command;
        use crate::testing::RecordingTransport;

        let mut transport = RecordingTransport::default();
        for addr in 1..=(MAX_DISPATCH_PER_TICK as u8 + 4) {
            transport.inbox.push_back(Envelope::new(Address(addr), Command::Broadcast, vec![]));
        }
        let clock = ManualClock::new(0);
        let mut coordinator = Coordinator::new(CoordinatorConfig::default(), Box::new(NoPayload)).unwrap();

        let mut link = Link::new(&mut transport, &clock);
        let handled = drain(&mut link, |link, envelope| coordinator.handle(link, envelope));

        assert_eq!(handled, MAX_DISPATCH_PER_TICK as u64);
        assert_eq!(transport.inbox.len(), 4);
        // Five slots by default; the rest were refused
        assert_eq!(coordinator.registry().len(), 5);
    }

    #[test]
    fn test_drain_stops_on_receive_error() {
        use crate::core::Command;
        use crate::testing::RecordingTransport;

        let mut transport = RecordingTransport {
            recv_errors: 1,
            ..Default::default()
        };
        transport.inbox.push_back(Envelope::new(Address(10), Command::Broadcast, vec![]));
        let clock = ManualClock::new(0);
        let mut coordinator = Coordinator::new(CoordinatorConfig::default(), Box::new(NoPayload)).unwrap();

        let mut link = Link::new(&mut transport, &clock);
        assert_eq!(drain(&mut link, |link, envelope| coordinator.handle(link, envelope)), 0);
        assert!(coordinator.registry().is_empty());

        // The next tick picks up where the glitch left off
        let mut link = Link::new(&mut transport, &clock);
        assert_eq!(drain(&mut link, |link, envelope| coordinator.handle(link, envelope)), 1);
        assert!(coordinator.registry().get(Address(10)).is_some());
    }

    #[test]
    fn test_drain_continues_past_handler_errors() {
        use crate::core::Command;
        use crate::testing::RecordingTransport;

        // Every ACK reply fails to send
        let mut transport = RecordingTransport::failing();
        for addr in [10, 20, 30] {
            transport.inbox.push_back(Envelope::new(Address(addr), Command::Broadcast, vec![]));
        }
        let clock = ManualClock::new(0);
        let mut coordinator = Coordinator::new(CoordinatorConfig::default(), Box::new(NoPayload)).unwrap();

        let mut link = Link::new(&mut transport, &clock);
        let handled = drain(&mut link, |link, envelope| coordinator.handle(link, envelope));

        assert_eq!(handled, 3);
        assert!(transport.inbox.is_empty());
        assert_eq!(coordinator.registry().len(), 3);
    }

    #[tokio::test]
    async fn test_coordinator_survives_receive_error() {
        use crate::testing::RecordingTransport;

        let mut transport = RecordingTransport {
            recv_errors: 1,
            ..Default::default()
        };
        let mut coordinator = Coordinator::new(
            CoordinatorConfig {
                poll_interval: Duration::from_millis(10),
                ..Default::default()
            },
            Box::new(NoPayload),
        ).unwrap();
        let clock = ManualClock::new(0);
        let (stop, shutdown) = oneshot::channel();

        let stopper = async {
            sleep(Duration::from_millis(100)).await;
            let _ = stop.send(());
        };

        let (summary, _) = tokio::join!(
            run_coordinator(&mut coordinator, &mut transport, &clock, shutdown),
            stopper,
        );

        // Ran until shutdown rather than bailing on the first tick
        let summary = summary.unwrap();
        assert!(summary.cycles > 1);
        assert_eq!(transport.recv_errors, 0);
    }

    #[tokio::test]
    async fn test_node_with_dead_radio_reaches_standby() {
        use crate::testing::RecordingTransport;

        // Broadcasts fail and the first receive is garbled
        let mut transport = RecordingTransport {
            failing: true,
            recv_errors: 1,
            ..Default::default()
        };
        let mut node = Node::new(node_config(30), Box::new(NoPayload)).unwrap();
        let mut clock = ManualClock::new(0);
        let mut power = HostPower::new();
        let (stop, shutdown) = oneshot::channel();

        let stopper = async {
            sleep(Duration::from_millis(150)).await;
            let _ = stop.send(());
        };

        let (summary, _) = tokio::join!(
            run_node(&mut node, &mut transport, &mut clock, &mut power, shutdown),
            stopper,
        );

        let summary = summary.unwrap();
        assert!(summary.cycles >= 4);
        assert_eq!(summary.standbys, 1);
        assert_eq!(power.standby_count(), 1);
        assert!(transport.sent.is_empty());
        assert!(node.is_suspended());
    }
}
