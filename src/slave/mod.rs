//! Sensor node side of the network
//!
//! A node announces itself to the coordinator until it is acknowledged,
//! pushes its data when asked, and gives up into standby after too many
//! unanswered announcements or when told to sleep.

mod handlers;

use std::time::Duration;

use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::core::{Command, NodeConfig, Result};
use crate::protocol::{Cmd, CommandTable, Envelope, Link, PayloadEncoder};

/// Command table for the node role
pub static SLAVE_COMMANDS: CommandTable<Node> = CommandTable::new(&[
    Cmd::new(Command::Broadcast, handlers::broadcast),
    Cmd::new(Command::Data, handlers::data),
    Cmd::new(Command::Sleep, handlers::sleep),
    Cmd::end(),
]);

/// Negotiation state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Announcing itself every poll
    #[default]
    Active,
    /// Acknowledged by the coordinator; announcements paused
    WaitingForAck,
    /// Told to sleep; standby on the next poll
    ShutdownRequested,
}

/// Why a node is going into standby
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandbyReason {
    /// The coordinator sent a sleep command
    Requested,
    /// Too many broadcasts went unacknowledged
    RetriesExhausted,
}

/// Result of one node housekeeping cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Acknowledged and pausing; nothing sent
    Waiting,
    /// A broadcast went out
    Announced {
        /// Bytes put on air
        sent: usize,
        /// Broadcasts made so far, this one included
        attempt: u8,
    },
    /// The caller should arm the alarm and suspend
    Standby {
        /// Alarm delay to arm before suspending
        wake_after: Duration,
        /// What triggered it
        reason: StandbyReason,
    },
}

/// Node state: status, retry counter and payload source
pub struct Node {
    config: NodeConfig,
    status: NodeStatus,
    retries: u8,
    suspended: bool,
    encoder: Box<dyn PayloadEncoder>,
}

impl Node {
    /// Creates a node in the active state with no retries spent
    pub fn new(config: NodeConfig, encoder: Box<dyn PayloadEncoder>) -> Result<Self> {
        config.validate()?;

        Ok(Node {
            config,
            status: NodeStatus::Active,
            retries: 0,
            suspended: false,
            encoder,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    /// Broadcasts made without the counter being reset
    pub fn retries(&self) -> u8 {
        self.retries
    }

    /// Whether the last poll handed standby to the caller
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Routes an incoming envelope through the node command table
    pub fn handle(&mut self, link: &mut Link<'_>, envelope: &mut Envelope) -> Result<Option<usize>> {
        SLAVE_COMMANDS.dispatch(self, link, envelope)
    }

    /// Runs one announcement cycle
    ///
    /// A waiting node returns before anything else is considered, so the
    /// retry ceiling only applies to broadcasts that were never
    /// acknowledged. Otherwise a sleep request or an exhausted retry
    /// counter yields [`PollOutcome::Standby`]. Failing both, a broadcast
    /// is sent and counted even if the transport rejects it, in which case
    /// the transport error is returned.
    pub fn poll(&mut self, link: &mut Link<'_>) -> Result<PollOutcome> {
        if self.status == NodeStatus::WaitingForAck {
            debug!(now = link.now().0, "Waiting");
            return Ok(PollOutcome::Waiting);
        }

        if let Some(reason) = self.standby_reason() {
            if !self.suspended {
                info!(?reason, retries = self.retries, "Entering standby");
                self.suspended = true;
            }
            return Ok(PollOutcome::Standby {
                wake_after: self.config.standby_interval,
                reason,
            });
        }

        let mut envelope = Envelope::default();
        let sent = link.send(&mut envelope, self.config.address, Command::Broadcast);
        self.retries = self.retries.saturating_add(1);

        match sent {
            Ok(sent) => {
                debug!(sent, attempt = self.retries, "Broadcast sent");
                Ok(PollOutcome::Announced {
                    sent,
                    attempt: self.retries,
                })
            }
            Err(e) => {
                warn!(error = %e, attempt = self.retries, "Broadcast send failed");
                Err(e)
            }
        }
    }

    /// Restores the power-on state after the wake alarm fired
    pub fn wake(&mut self) {
        info!(address = %self.config.address, "Woke from standby");
        self.status = NodeStatus::Active;
        self.retries = 0;
        self.suspended = false;
    }

    fn standby_reason(&self) -> Option<StandbyReason> {
        if self.status == NodeStatus::ShutdownRequested {
            Some(StandbyReason::Requested)
        } else if self.retries >= self.config.retry_limit {
            Some(StandbyReason::RetriesExhausted)
        } else {
            None
        }
    }
}
