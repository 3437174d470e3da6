use std::fmt;

use crate::touch::TouchPoint;

/// Dominant direction of a swipe, in screen coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Picks the dominant axis of `(dx, dy)`.
    ///
    /// The horizontal axis only wins when it is strictly larger, so equal
    /// magnitudes resolve vertically.
    pub fn of(dx: f64, dy: f64) -> Self {
        if dx.abs() > dy.abs() {
            if dx > 0.0 {
                Self::Right
            } else {
                Self::Left
            }
        } else if dy > 0.0 {
            Self::Down
        } else {
            Self::Up
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|direction| direction.name() == name)
    }
}

/// A classified swipe. Its [`fmt::Display`] output is the gesture key used to
/// look up an action, e.g. `3swipe_up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swipe {
    pub fingers: usize,
    pub direction: Direction,
}

impl Swipe {
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Parses a gesture key of the form `<fingers>swipe_<direction>`.
    pub fn parse_key(key: &str) -> Option<Self> {
        let (fingers, direction) = key.split_once("swipe_")?;
        if fingers.is_empty() || !fingers.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let fingers = fingers.parse::<usize>().ok().filter(|&n| n >= 1)?;
        let direction = Direction::from_name(direction)?;
        Some(Self { fingers, direction })
    }
}

impl fmt::Display for Swipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}swipe_{}", self.fingers, self.direction.name())
    }
}

/// Result of looking at the fingers of one completed gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// Average movement stayed under the threshold on both axes.
    Noise { dx: f64, dy: f64 },
    Swipe { swipe: Swipe, dx: f64, dy: f64 },
}

impl Classification {
    /// Average movement of the fingers.
    pub fn displacement(&self) -> (f64, f64) {
        match *self {
            Self::Noise { dx, dy } | Self::Swipe { dx, dy, .. } => (dx, dy),
        }
    }
}

/// Averages the displacement of every finger in `touches`.
///
/// Returns `None` for an empty set.
pub fn average_displacement(touches: &[TouchPoint]) -> Option<(f64, f64)> {
    if touches.is_empty() {
        return None;
    }

    let (total_dx, total_dy) = touches
        .iter()
        .map(TouchPoint::displacement)
        .fold((0.0, 0.0), |(ax, ay), (dx, dy)| (ax + dx, ay + dy));
    #[allow(clippy::cast_precision_loss)]
    let count = touches.len() as f64;
    Some((total_dx / count, total_dy / count))
}

/// Classifies the fingers of a completed gesture.
///
/// Returns `None` only when `touches` is empty.
pub fn classify(touches: &[TouchPoint], threshold: f64) -> Option<Classification> {
    let (dx, dy) = average_displacement(touches)?;

    if dx.abs() < threshold && dy.abs() < threshold {
        return Some(Classification::Noise { dx, dy });
    }

    let swipe = Swipe {
        fingers: touches.len(),
        direction: Direction::of(dx, dy),
    };
    Some(Classification::Swipe { swipe, dx, dy })
}
