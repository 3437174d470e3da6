use ahash::{AHashMap, AHashSet};
use log::debug;

/// Identifier assigned to a finger by the event source for the lifetime of a
/// single touch.
pub type FingerId = u32;

/// A single finger's contact with the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub finger: FingerId,
    pub start: (f64, f64),
    pub last: (f64, f64),
}

impl TouchPoint {
    fn new(finger: FingerId, x: f64, y: f64) -> Self {
        Self {
            finger,
            start: (x, y),
            last: (x, y),
        }
    }

    /// Movement from where the finger first touched down to where it was last
    /// seen.
    pub fn displacement(&self) -> (f64, f64) {
        (self.last.0 - self.start.0, self.last.1 - self.start.1)
    }
}

/// Tracks which fingers are on the surface and infers when they lift.
///
/// The event source never reports a finger lifting. Instead, a finger which
/// was active but received no update between two frame boundaries is assumed
/// to have been released. Once every finger has been released, all of them
/// are handed back together as one completed gesture.
///
/// A finger id is never in both `active` and `finished` at once.
#[derive(Debug, Default)]
pub struct Tracker {
    active: AHashMap<FingerId, TouchPoint>,
    finished: AHashMap<FingerId, TouchPoint>,
    updated: AHashSet<FingerId>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `finger` is touching at `(x, y)` in the current frame.
    ///
    /// The first update for a finger fixes its start position; later updates
    /// only move its last position.
    pub fn apply_update(&mut self, finger: FingerId, x: f64, y: f64) {
        self.updated.insert(finger);

        if let Some(point) = self.active.get_mut(&finger) {
            point.last = (x, y);
            debug!("Finger {finger} moved to ({x:.2}, {y:.2})");
        } else {
            // an id which lifted earlier in this gesture is touching again
            self.finished.remove(&finger);
            self.active.insert(finger, TouchPoint::new(finger, x, y));
            debug!("Finger {finger} touched down at ({x:.2}, {y:.2})");
        }
    }

    /// Closes the current frame.
    ///
    /// Returns the fingers of a completed gesture once the last active finger
    /// has lifted, and `None` while any finger is still touching or when
    /// nothing was touching at all.
    pub fn on_frame_boundary(&mut self) -> Option<Vec<TouchPoint>> {
        let updated = &self.updated;
        let lifted = self
            .active
            .keys()
            .filter(|finger| !updated.contains(finger))
            .copied()
            .collect::<Vec<_>>();
        for finger in lifted {
            if let Some(point) = self.active.remove(&finger) {
                debug!("Assuming finger {finger} lifted (no update in frame)");
                self.finished.insert(finger, point);
            }
        }
        self.updated.clear();

        if !self.active.is_empty() || self.finished.is_empty() {
            return None;
        }

        let mut touches = self.finished.drain().map(|(_, point)| point).collect::<Vec<_>>();
        touches.sort_by_key(|point| point.finger);
        Some(touches)
    }

    pub fn active(&self) -> impl Iterator<Item = &TouchPoint> {
        self.active.values()
    }

    #[cfg(test)]
    pub fn finished(&self) -> impl Iterator<Item = &TouchPoint> {
        self.finished.values()
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.finished.is_empty() && self.updated.is_empty()
    }
}
