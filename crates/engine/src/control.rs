//! Control channel between the hosting application and the engine.
//!
//! One inbound command today: `Promote`, letting a host offer an
//! "update available, refresh now" action instead of waiting for the
//! next full reload.

use std::sync::Arc;

use tokio::sync::mpsc;

use overcast_core::Error;

use crate::engine::Engine;

/// Commands a host can send to its engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Skip the wait and activate a `Waiting` version now.
    Promote,
}

/// Sender half held by the hosting application.
#[derive(Debug, Clone)]
pub struct ControlChannel {
    tx: mpsc::UnboundedSender<Command>,
}

impl ControlChannel {
    /// Request immediate activation of a waiting version.
    pub fn promote(&self) -> Result<(), Error> {
        self.tx.send(Command::Promote).map_err(|_| Error::ControlClosed)
    }
}

/// Spawn the command loop for `engine` and hand back the sender half.
///
/// The loop drains commands until every [`ControlChannel`] clone is
/// dropped. A rejected transition is logged, never fatal; the engine
/// stays in its prior state.
pub fn spawn(engine: Arc<Engine>) -> ControlChannel {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Promote => {
                    if let Err(e) = engine.promote().await {
                        tracing::warn!(error = %e, "promote command rejected");
                    }
                }
            }
        }
    });

    ControlChannel { tx }
}
