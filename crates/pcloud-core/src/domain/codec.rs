//! Codec preference ordering.
//!
//! The peer connection offers whatever codecs the platform supports, in the
//! platform's order.  Before the offer is created the client moves the codecs
//! matching the configured token (`"h264"`, `"vp9"`, `"av1"`, …) to the front.
//! This is best-effort: if nothing matches, the platform order is kept and
//! negotiation carries on.

/// One entry of the platform's codec capability list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecCapability {
    /// MIME type such as `video/H264`.
    pub mime_type: String,
    pub clock_rate: u32,
    /// Format parameters, e.g. `profile-level-id=42e01f;packetization-mode=1`.
    pub sdp_fmtp_line: String,
    pub payload_type: u8,
}

/// Result of [`prefer_codec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOrder {
    /// Matching codecs first, then the rest, each group in platform order.
    pub ordered: Vec<CodecCapability>,
    /// How many entries at the front of `ordered` matched the token.
    pub matched: usize,
}

/// Returns `true` if `mime_type` contains `token`, ignoring ASCII case.
pub fn mime_matches(mime_type: &str, token: &str) -> bool {
    let token = token.trim();
    !token.is_empty()
        && mime_type
            .to_ascii_lowercase()
            .contains(&token.to_ascii_lowercase())
}

/// Stable-partitions `codecs` into those matching `token` and the remainder.
pub fn prefer_codec(codecs: &[CodecCapability], token: &str) -> CodecOrder {
    let (mut ordered, remaining): (Vec<_>, Vec<_>) = codecs
        .iter()
        .cloned()
        .partition(|c| mime_matches(&c.mime_type, token));
    let matched = ordered.len();
    ordered.extend(remaining);
    CodecOrder { ordered, matched }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(mime: &str, pt: u8) -> CodecCapability {
        CodecCapability {
            mime_type: mime.to_string(),
            clock_rate: 90_000,
            sdp_fmtp_line: String::new(),
            payload_type: pt,
        }
    }

    fn platform_list() -> Vec<CodecCapability> {
        vec![
            cap("video/VP8", 96),
            cap("video/H264", 102),
            cap("video/VP9", 98),
            cap("video/H264", 125),
            cap("video/AV1", 41),
        ]
    }

    #[test]
    fn test_matching_codecs_move_to_front_in_original_order() {
        // Arrange
        let codecs = platform_list();

        // Act
        let order = prefer_codec(&codecs, "H264");

        // Assert
        let pts: Vec<u8> = order.ordered.iter().map(|c| c.payload_type).collect();
        assert_eq!(pts, vec![102, 125, 96, 98, 41]);
        assert_eq!(order.matched, 2);
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let order = prefer_codec(&platform_list(), "av1");
        assert_eq!(order.ordered[0].mime_type, "video/AV1");
        assert_eq!(order.matched, 1);
    }

    #[test]
    fn test_no_match_keeps_platform_order() {
        let codecs = platform_list();
        let order = prefer_codec(&codecs, "hevc");
        assert_eq!(order.ordered, codecs);
        assert_eq!(order.matched, 0);
    }

    #[test]
    fn test_empty_token_matches_nothing() {
        let order = prefer_codec(&platform_list(), "  ");
        assert_eq!(order.matched, 0);
    }
}
