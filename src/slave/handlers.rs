use tracing::{debug, info};

use crate::core::{Command, Result, ACK};
use crate::protocol::{Envelope, Link};
use super::{Node, NodeStatus};

/// Reads the coordinator's verdict on our last broadcast
///
/// An ACK moves the node to waiting. Anything else leaves it announcing;
/// the retry counter is not touched either way.
pub(super) fn broadcast(node: &mut Node, _link: &mut Link<'_>, envelope: &mut Envelope) -> Result<usize> {
    if envelope.verdict() == Some(ACK) {
        node.status = NodeStatus::WaitingForAck;
        info!(retries = node.retries, "Broadcast ACK");
    } else {
        info!(retries = node.retries, verdict = ?envelope.verdict(), "Broadcast NACK");
    }
    Ok(0)
}

/// Pushes a fresh DATA envelope built from this node's payload
pub(super) fn data(node: &mut Node, link: &mut Link<'_>, envelope: &mut Envelope) -> Result<usize> {
    debug!(address = %envelope.address, command = envelope.command, "Send data");
    envelope.reset();
    node.encoder.encode(envelope)?;

    let own = node.config.address;
    link.send(envelope, own, Command::Data)
}

/// Schedules standby and acknowledges the request
pub(super) fn sleep(node: &mut Node, link: &mut Link<'_>, envelope: &mut Envelope) -> Result<usize> {
    node.status = NodeStatus::ShutdownRequested;
    info!("Sleep requested");

    let from = envelope.address;
    link.send_byte(envelope, from, Command::Sleep, ACK)
}
