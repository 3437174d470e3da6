use log::{debug, info, warn};

use crate::{
    action::{Actions, Dispatch},
    event::TouchEvent,
    gesture::{self, Classification},
    touch::{TouchPoint, Tracker},
};

/// What happened when a touch event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No gesture has completed yet.
    Pending,
    /// A gesture completed, but moved too little to be a swipe.
    Discarded,
    /// A swipe was recognized, but has no action configured.
    Unmapped(String),
    /// A swipe was recognized and its action started.
    Dispatched(String),
}

/// Turns touch events into swipes and runs the action configured for each.
///
/// Events must be fed in the order the event source produced them, from a
/// single task.
#[derive(Debug)]
pub struct Recognizer<D> {
    tracker: Tracker,
    threshold: f64,
    actions: Actions,
    dispatcher: D,
}

impl<D: Dispatch> Recognizer<D> {
    pub fn new(threshold: f64, actions: Actions, dispatcher: D) -> Self {
        Self {
            tracker: Tracker::new(),
            threshold,
            actions,
            dispatcher,
        }
    }

    pub fn handle(&mut self, event: TouchEvent) -> Outcome {
        match event {
            TouchEvent::Motion { finger, x, y } => {
                self.tracker.apply_update(finger, x, y);
                Outcome::Pending
            }
            TouchEvent::FrameEnd => match self.tracker.on_frame_boundary() {
                Some(touches) => self.on_gesture(&touches),
                None => Outcome::Pending,
            },
        }
    }

    fn on_gesture(&self, touches: &[TouchPoint]) -> Outcome {
        let Some(classification) = gesture::classify(touches, self.threshold) else {
            return Outcome::Pending;
        };
        let (dx, dy) = classification.displacement();
        info!(
            "Gesture completed with {} finger(s): avg dx={dx:.2}, avg dy={dy:.2}",
            touches.len()
        );

        let swipe = match classification {
            Classification::Noise { .. } => {
                debug!("Movement below threshold, gesture ignored");
                return Outcome::Discarded;
            }
            Classification::Swipe { swipe, .. } => swipe,
        };

        let key = swipe.key();
        info!("Detected gesture: {key}");
        match self.actions.resolve(&key) {
            Some(command) => {
                self.dispatcher.dispatch(command);
                Outcome::Dispatched(key)
            }
            None => {
                warn!("No action mapped for gesture: {key}");
                Outcome::Unmapped(key)
            }
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }
}
