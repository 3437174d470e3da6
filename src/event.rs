use anyhow::{Context, Result};
use log::{debug, trace};
use regex::Regex;

use crate::touch::FingerId;

/// A touch event we care about from `libinput debug-events`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TouchEvent {
    /// A finger is touching at `(x, y)`.
    Motion { finger: FingerId, x: f64, y: f64 },
    /// A batch of simultaneous updates has ended.
    FrameEnd,
}

/// Decodes lines of `libinput debug-events` output into [`TouchEvent`]s.
///
/// ```text
///  event11  TOUCH_MOTION            +37.797s	1 (1) 26.98/42.53 (61.39/58.07mm)
///  event11  TOUCH_FRAME             +37.797s
/// ```
#[derive(Debug, Clone)]
pub struct LineDecoder {
    motion: Regex,
    frame: Regex,
}

impl LineDecoder {
    pub fn new() -> Result<Self> {
        let motion = Regex::new(
            r"^\s*\S+\s+TOUCH_MOTION\s+\+[\d.]+s\s+(\d+)(?:\s+\(\d+\))?(?:\s+([\d.]+)/([\d.]+))?",
        )
        .with_context(|| "failed to compile motion pattern")?;
        let frame = Regex::new(r"^\s*\S+\s+TOUCH_FRAME\s+\+[\d.]+s")
            .with_context(|| "failed to compile frame pattern")?;
        Ok(Self { motion, frame })
    }

    /// Decodes a single line, or returns `None` if it isn't a touch event we
    /// can use.
    pub fn decode(&self, line: &str) -> Option<TouchEvent> {
        if self.frame.is_match(line) {
            return Some(TouchEvent::FrameEnd);
        }

        let Some(captures) = self.motion.captures(line) else {
            trace!("Ignoring line {line:?}");
            return None;
        };

        let Ok(finger) = captures[1].parse::<FingerId>() else {
            debug!("Ignoring motion with invalid finger id {:?}", &captures[1]);
            return None;
        };

        let (Some(x), Some(y)) = (captures.get(2), captures.get(3)) else {
            debug!("Ignoring motion for finger {finger} without coordinates");
            return None;
        };
        let (Ok(x), Ok(y)) = (x.as_str().parse::<f64>(), y.as_str().parse::<f64>()) else {
            debug!(
                "Ignoring motion for finger {finger} with invalid coordinates {:?}/{:?}",
                x.as_str(),
                y.as_str()
            );
            return None;
        };

        Some(TouchEvent::Motion { finger, x, y })
    }
}
