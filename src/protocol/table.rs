use tracing::debug;

use crate::core::{Command, Result};
use super::envelope::Envelope;
use super::Link;

/// Code reserved for the table terminator, never a legal command
pub const TERMINATOR: u8 = 0;

/// Handler invoked for a matching command code
///
/// Receives the role context, the link the envelope arrived on and the
/// envelope itself, which it may overwrite to build a reply. Returns the
/// number of bytes sent, zero when nothing was sent.
pub type Handler<C> = fn(&mut C, &mut Link<'_>, &mut Envelope) -> Result<usize>;

/// One `(code, handler)` entry of a command table
pub struct Cmd<C: 'static> {
    /// Command code this entry answers to
    pub code: u8,
    /// Handler, `None` only for the terminator
    pub handler: Option<Handler<C>>,
}

impl<C: 'static> Cmd<C> {
    /// Creates an entry binding `command` to `handler`
    pub const fn new(command: Command, handler: Handler<C>) -> Self {
        Cmd {
            code: command as u8,
            handler: Some(handler),
        }
    }

    /// Creates the terminating entry
    pub const fn end() -> Self {
        Cmd {
            code: TERMINATOR,
            handler: None,
        }
    }

    fn is_terminator(&self) -> bool {
        self.code == TERMINATOR || self.handler.is_none()
    }
}

/// Ordered, terminator-ended table mapping command codes to handlers
///
/// Lookup is a linear scan in table order and stops at the terminator, so
/// entries placed after it are never reached.
pub struct CommandTable<C: 'static> {
    entries: &'static [Cmd<C>],
}

impl<C: 'static> CommandTable<C> {
    /// Wraps a static entry list
    pub const fn new(entries: &'static [Cmd<C>]) -> Self {
        CommandTable { entries }
    }

    /// Finds the handler registered for `code`
    pub fn lookup(&self, code: u8) -> Option<Handler<C>> {
        if code == TERMINATOR {
            return None;
        }

        for cmd in self.entries {
            if cmd.is_terminator() {
                break;
            }
            if cmd.code == code {
                return cmd.handler;
            }
        }
        None
    }

    /// Looks up the envelope's command and runs its handler
    ///
    /// Returns `Ok(None)` when no handler is registered for the code.
    pub fn dispatch(
        &self,
        ctx: &mut C,
        link: &mut Link<'_>,
        envelope: &mut Envelope,
    ) -> Result<Option<usize>> {
        match self.lookup(envelope.command) {
            Some(handler) => handler(ctx, link, envelope).map(Some),
            None => {
                debug!(
                    address = %envelope.address,
                    command = envelope.command,
                    "No handler for command"
                );
                Ok(None)
            }
        }
    }

    /// Command codes reachable through this table, in table order
    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries
            .iter()
            .take_while(|cmd| !cmd.is_terminator())
            .map(|cmd| cmd.code)
    }
}
