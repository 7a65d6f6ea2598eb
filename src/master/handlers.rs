use tracing::{debug, info};

use crate::core::{Command, Result, ACK, NACK};
use crate::protocol::{Envelope, Link};
use crate::util::hex;
use super::Coordinator;

/// Registers or refreshes the announcing device and answers ACK or NACK
pub(super) fn broadcast(master: &mut Coordinator, link: &mut Link<'_>, envelope: &mut Envelope) -> Result<usize> {
    let from = envelope.address;
    let outcome = master.registry.announce(from, link.now());
    let reply = if outcome.is_accepted() { ACK } else { NACK };

    info!(address = %from, ?outcome, reply, "Broadcast");

    link.send_byte(envelope, from, Command::Broadcast, reply)
}

/// Hands sensor data to the payload decoder
pub(super) fn data(master: &mut Coordinator, _link: &mut Link<'_>, envelope: &mut Envelope) -> Result<usize> {
    debug!(address = %envelope.address, payload = %hex(&envelope.payload), "Data");
    master.decoder.decode(envelope)?;
    Ok(0)
}

/// Records that a device acknowledged going to sleep
pub(super) fn sleep(master: &mut Coordinator, link: &mut Link<'_>, envelope: &mut Envelope) -> Result<usize> {
    let from = envelope.address;
    if master.registry.mark_asleep(from, link.now()) {
        info!(address = %from, "Sleep ACK");
    } else {
        debug!(address = %from, "Sleep ACK from unknown device");
    }
    Ok(0)
}
