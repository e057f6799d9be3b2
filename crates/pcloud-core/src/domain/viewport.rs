//! Mapping pointer positions onto the displayed video.
//!
//! The video is drawn inside a display element whose aspect ratio rarely
//! matches the stream's.  Depending on the [`FitMode`] the picture is
//! letterboxed (`contain`), cropped (`cover`), stretched (`fill`), or shown
//! at native size when it fits (`scale-down`).  The host wants pointer
//! positions relative to the *picture*, normalised to `[0, 1] × [0, 1]`, so
//! the mapper first works out where the picture actually sits inside the
//! element.
//!
//! Positions over a letterbox bar (or outside the element) are clamped to the
//! nearest edge and reported with `inside == false`, so the host can tell a
//! clamped sample from one genuinely at the edge of the picture.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Intrinsic size assumed while the stream has not reported one.
pub const FALLBACK_VIDEO_SIZE: (u32, u32) = (1920, 1080);

/// How the video picture is fitted into its display element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    #[default]
    Contain,
    Cover,
    Fill,
    ScaleDown,
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FitMode::Contain => "contain",
            FitMode::Cover => "cover",
            FitMode::Fill => "fill",
            FitMode::ScaleDown => "scale-down",
        };
        f.write_str(s)
    }
}

/// Error for an unknown fit-mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fit mode {0:?}: expected contain, cover, fill or scale-down")]
pub struct ParseFitModeError(String);

impl FromStr for FitMode {
    type Err = ParseFitModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" => Ok(FitMode::Contain),
            "cover" => Ok(FitMode::Cover),
            "fill" => Ok(FitMode::Fill),
            "scale-down" | "scaledown" => Ok(FitMode::ScaleDown),
            _ => Err(ParseFitModeError(s.to_string())),
        }
    }
}

/// A pointer position relative to the picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    /// Horizontal position, clamped to `[0, 1]`.
    pub x: f64,
    /// Vertical position, clamped to `[0, 1]`.
    pub y: f64,
    /// `false` when the raw position fell outside the picture and was clamped.
    pub inside: bool,
}

/// Rectangle (relative to the display element) where the picture is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentBox {
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
}

/// The display element and the stream shown in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Display element width in layout pixels.
    pub element_width: f64,
    /// Display element height in layout pixels.
    pub element_height: f64,
    /// Intrinsic size of the decoded video, once known.
    pub video_size: Option<(u32, u32)>,
    pub fit: FitMode,
}

impl Viewport {
    pub fn new(element_width: f64, element_height: f64, fit: FitMode) -> Self {
        Self {
            element_width,
            element_height,
            video_size: None,
            fit,
        }
    }

    /// Returns the area the picture occupies inside the element.
    pub fn content_box(&self) -> ContentBox {
        let (vw, vh) = match self.video_size {
            Some((w, h)) if w > 0 && h > 0 => (f64::from(w), f64::from(h)),
            _ => (
                f64::from(FALLBACK_VIDEO_SIZE.0),
                f64::from(FALLBACK_VIDEO_SIZE.1),
            ),
        };
        let (rw, rh) = (self.element_width, self.element_height);
        let video_ar = vw / vh;
        let element_wider = rw / rh > video_ar;

        let (width, height) = match self.fit {
            FitMode::Fill => (rw, rh),
            FitMode::Contain => contain(rw, rh, video_ar, element_wider),
            FitMode::Cover => {
                if element_wider {
                    (rw, rw / video_ar)
                } else {
                    (rh * video_ar, rh)
                }
            }
            FitMode::ScaleDown => {
                if vw <= rw && vh <= rh {
                    (vw, vh)
                } else {
                    contain(rw, rh, video_ar, element_wider)
                }
            }
        };

        ContentBox {
            offset_x: (rw - width) / 2.0,
            offset_y: (rh - height) / 2.0,
            width,
            height,
        }
    }

    /// Maps a position relative to the element's top-left corner.
    ///
    /// A degenerate element (zero or negative size) maps every position to
    /// the picture's origin with `inside == false`.
    pub fn map(&self, rel_x: f64, rel_y: f64) -> PointerPosition {
        if !(self.element_width > 0.0 && self.element_height > 0.0) {
            return PointerPosition {
                x: 0.0,
                y: 0.0,
                inside: false,
            };
        }

        let content = self.content_box();
        let x = (rel_x - content.offset_x) / content.width;
        let y = (rel_y - content.offset_y) / content.height;
        let inside = (0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y);

        PointerPosition {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            inside,
        }
    }
}

fn contain(rw: f64, rh: f64, video_ar: f64, element_wider: bool) -> (f64, f64) {
    if element_wider {
        (rh * video_ar, rh)
    } else {
        (rw, rw / video_ar)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
