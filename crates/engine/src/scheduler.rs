// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zone authority loop
//!
//! One task per zone. Each tick drains every zone-level request, then takes
//! at most one request from each entity lane so a busy entity cannot starve
//! the others. Sequence numbers follow the order requests were gathered.

use crate::command::Control;
use crate::zone::Zone;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Run until shut down, then hand the zone back
pub(crate) async fn run(mut zone: Zone, mut control: mpsc::UnboundedReceiver<Control>) -> Zone {
    let tick = zone.config().tick;
    info!(zone = %zone.id(), sequence = zone.sequence(), "zone authority loop started");

    loop {
        for pulled in zone.gather() {
            zone.dispatch(pulled);
        }

        tokio::select! {
            biased;
            message = control.recv() => {
                if !on_control(&zone, message, &mut control).await {
                    break;
                }
            }
            _ = tokio::time::sleep(tick) => {}
        }
    }

    info!(zone = %zone.id(), sequence = zone.sequence(), "zone authority loop stopped");
    zone
}

/// Returns false once the loop should exit
async fn on_control(
    zone: &Zone,
    mut message: Option<Control>,
    control: &mut mpsc::UnboundedReceiver<Control>,
) -> bool {
    loop {
        match message {
            Some(Control::Pause(ack)) => {
                let sequence = zone.sequence();
                debug!(zone = %zone.id(), sequence, "zone paused");
                let _ = ack.send(sequence);
                // Nothing is processed until the next control message
                message = control.recv().await;
            }
            Some(Control::Resume) => {
                debug!(zone = %zone.id(), "zone resumed");
                return true;
            }
            Some(Control::Shutdown) | None => return false,
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
