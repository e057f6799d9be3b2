//! Codec registration and conversion to the domain's capability type.

use pcloud_core::domain::codec::CodecCapability;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_H264, MIME_TYPE_OPUS, MIME_TYPE_VP8, MIME_TYPE_VP9};
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType};
use webrtc::rtp_transceiver::RTCPFeedback;

/// Label of the data channel carrying input messages.
pub const INPUT_CHANNEL_LABEL: &str = "input";

const VIDEO_CLOCK_RATE: u32 = 90_000;
const OPUS_CLOCK_RATE: u32 = 48_000;
const OPUS_PAYLOAD_TYPE: u8 = 111;

/// `(mime type, fmtp line, payload type)` in the order the platform offers
/// them.
const VIDEO_CODECS: &[(&str, &str, u8)] = &[
    (
        MIME_TYPE_H264,
        "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f",
        102,
    ),
    (
        MIME_TYPE_H264,
        "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=640032",
        112,
    ),
    (MIME_TYPE_VP8, "", 96),
    (MIME_TYPE_VP9, "profile-id=0", 98),
];

fn video_feedback() -> Vec<RTCPFeedback> {
    ["goog-remb", "ccm", "nack", "nack"]
        .iter()
        .zip(["", "fir", "", "pli"])
        .map(|(typ, parameter)| RTCPFeedback {
            typ: typ.to_string(),
            parameter: parameter.to_string(),
        })
        .collect()
}

/// Video codecs the client can receive, as `webrtc` parameters.
pub(crate) fn video_parameters() -> Vec<RTCRtpCodecParameters> {
    VIDEO_CODECS
        .iter()
        .map(|(mime, fmtp, pt)| RTCRtpCodecParameters {
            capability: RTCRtpCodecCapability {
                mime_type: mime.to_string(),
                clock_rate: VIDEO_CLOCK_RATE,
                channels: 0,
                sdp_fmtp_line: fmtp.to_string(),
                rtcp_feedback: video_feedback(),
            },
            payload_type: *pt,
            ..Default::default()
        })
        .collect()
}

fn opus_parameters() -> RTCRtpCodecParameters {
    RTCRtpCodecParameters {
        capability: RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_string(),
            clock_rate: OPUS_CLOCK_RATE,
            channels: 2,
            sdp_fmtp_line: "minptime=10;useinbandfec=1".to_string(),
            rtcp_feedback: Vec::new(),
        },
        payload_type: OPUS_PAYLOAD_TYPE,
        ..Default::default()
    }
}

/// Registers every supported codec with `engine`.
pub(crate) fn register_codecs(engine: &mut MediaEngine) -> Result<(), webrtc::Error> {
    for params in video_parameters() {
        engine.register_codec(params, RTPCodecType::Video)?;
    }
    engine.register_codec(opus_parameters(), RTPCodecType::Audio)
}

pub(crate) fn to_capability(params: &RTCRtpCodecParameters) -> CodecCapability {
    CodecCapability {
        mime_type: params.capability.mime_type.clone(),
        clock_rate: params.capability.clock_rate,
        sdp_fmtp_line: params.capability.sdp_fmtp_line.clone(),
        payload_type: params.payload_type,
    }
}

/// Maps a domain capability back to the registered parameters, by payload
/// type.
pub(crate) fn to_parameters(
    capability: &CodecCapability,
    registered: &[RTCRtpCodecParameters],
) -> Option<RTCRtpCodecParameters> {
    registered
        .iter()
        .find(|p| p.payload_type == capability.payload_type)
        .cloned()
}

/// The receivable video codecs in platform order.
pub fn video_capabilities() -> Vec<CodecCapability> {
    video_parameters().iter().map(to_capability).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
