use std::time::Duration;

use radiopoll::core::{Address, CoordinatorConfig, NodeConfig};
use radiopoll::hal::{Clock, ManualClock};
use radiopoll::master::DeviceStatus;
use radiopoll::measure::{MeasurementEncoder, MemoryBackup, ReadingDecoder, Sensor};
use radiopoll::protocol::Link;
use radiopoll::slave::PollOutcome;
use radiopoll::transport::ChannelTransport;
use radiopoll::{Coordinator, Node, Result};

/// Thermistor that warms up a little on every sample
struct Thermistor {
    raw: u16,
}

impl Sensor for Thermistor {
    fn sample(&mut self) -> Result<Vec<u8>> {
        self.raw += 3;
        Ok(self.raw.to_le_bytes().to_vec())
    }
}

fn main() -> Result<()> {
    radiopoll::util::init_tracing("info")?;

    let (mut master_radio, mut node_radio) = ChannelTransport::pair();
    let mut clock = ManualClock::new(0);

    let (decoder, mut readings) = ReadingDecoder::new();
    let mut coordinator = Coordinator::new(
        CoordinatorConfig {
            registry_capacity: 4,
            device_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        Box::new(decoder),
    )?;

    let node_address = Address(30);
    let encoder = MeasurementEncoder::new(Thermistor { raw: 2600 }, MemoryBackup::default());
    let mut node = Node::new(
        NodeConfig {
            address: node_address,
            ..Default::default()
        },
        Box::new(encoder),
    )?;

    println!("Simulating one coordinator and node {} over an in-memory link", node_address);

    let mut data_requested = false;
    for second in 0..20 {
        clock.set(second);

        // Node: handle what the coordinator sent, then announce
        let outcome = {
            let mut link = Link::new(&mut node_radio, &clock);
            while let Some(mut envelope) = link.transport.try_recv()? {
                node.handle(&mut link, &mut envelope)?;
            }
            node.poll(&mut link)?
        };
        println!("t={:>2}s node: {:?} (status {:?})", second, outcome, node.status());

        // Coordinator: answer announcements, collect data, sweep
        {
            let mut link = Link::new(&mut master_radio, &clock);
            while let Some(mut envelope) = link.transport.try_recv()? {
                coordinator.handle(&mut link, &mut envelope)?;
            }

            if !data_requested && coordinator.registry().get(node_address).is_some() {
                coordinator.request_data(&mut link, node_address)?;
                data_requested = true;
            }

            let report = coordinator.poll(&mut link);
            if !report.notified.is_empty() {
                println!("t={:>2}s coordinator: sleep sent to {:?}", second, report.notified);
            }
        }

        while let Ok(reading) = readings.try_recv() {
            println!(
                "t={:>2}s reading from {}: {:?} (changed: {})",
                second, reading.address, &reading.data[..], reading.changed
            );
        }

        if let PollOutcome::Standby { wake_after, reason } = outcome {
            clock.set_alarm(wake_after)?;
            println!("t={:>2}s node entering standby ({:?}), alarm in {:?}", second, reason, wake_after);
            break;
        }
    }

    // Let the coordinator see the node's sleep acknowledgment
    {
        let mut link = Link::new(&mut master_radio, &clock);
        while let Some(mut envelope) = link.transport.try_recv()? {
            coordinator.handle(&mut link, &mut envelope)?;
        }
    }

    println!("\nRegistry:");
    for (slot, dev) in coordinator.registry().slots().iter().enumerate() {
        match dev.status {
            DeviceStatus::Empty => println!("  {}: empty", slot),
            status => println!("  {}: addr {} {:?} last seen t={}s", slot, dev.address, status, dev.last_seen.0),
        }
    }

    Ok(())
}
