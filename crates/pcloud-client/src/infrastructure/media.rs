//! Headless media sink.
//!
//! The command-line client has no decoder or renderer, so inbound tracks are
//! drained and counted.  An undrained track fills its channel and the reader
//! starts dropping frames.

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::application::peer::{MediaSink, RemoteTrack};

/// Reads and discards every packet of every attached track.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainSink;

impl MediaSink for DrainSink {
    fn attach(&self, track: RemoteTrack) {
        let RemoteTrack { kind, id, mut packets } = track;
        info!("inbound {kind:?} track {id}");
        let Ok(runtime) = Handle::try_current() else {
            debug!("no runtime to drain track {id}; dropping it");
            return;
        };
        runtime.spawn(async move {
            let mut count = 0u64;
            while packets.recv().await.is_some() {
                count += 1;
            }
            debug!("{kind:?} track {id} ended after {count} packets");
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
