//! Peer connection adapter built on the `webrtc` crate.
//!
//! # What a session contains (for beginners)
//!
//! | Part                  | Direction | Purpose                                  |
//! |-----------------------|-----------|------------------------------------------|
//! | video transceiver     | recv-only | the host's desktop stream                |
//! | audio transceiver     | recv-only | optional, the host's sound (Opus)        |
//! | `input` data channel  | send      | pointer, keyboard, and gamepad JSON      |
//!
//! The client always creates the offer.  ICE gathering is allowed to finish
//! before the offer is returned, so the SDP sent to the host already lists
//! every local candidate and no trickle channel is needed.  No STUN or TURN
//! servers are configured: both ends are on the same LAN.
//!
//! Inbound RTP is forwarded to the [`MediaSink`](crate::application::peer::MediaSink)
//! packet by packet; the video track's headers also feed the reception
//! counters the telemetry sampler reads.

mod codecs;
mod connector;
mod session;
mod tracks;

pub use codecs::{video_capabilities, INPUT_CHANNEL_LABEL};
pub use connector::WebRtcConnector;
pub use session::{DataChannelInput, WebRtcSession};
