//! Platform input events and the double-buffered queue that carries them
//!
//! Platform callbacks push events at any time during a frame. The loop
//! swaps the queue once per frame and drains the previous frame's events
//! into `Controls`, so input state only ever changes at that one point.

use std::collections::VecDeque;

use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Raw input from the platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Relative pointer movement in pixels
    MouseMotion(Vec2),
    /// Mouse button press or release
    MouseButton { button: MouseButton, pressed: bool },
    /// Key press or release; `repeat` marks auto-repeat presses
    Key {
        code: KeyCode,
        pressed: bool,
        repeat: bool,
    },
    /// The platform granted or revoked pointer capture
    PointerLockChanged(bool),
    /// Viewport size in pixels
    Resized { width: u32, height: u32 },
}

/// Double-buffered input event queue.
///
/// Events pushed during frame N are available for reading during frame N+1.
#[derive(Debug)]
pub struct InputQueue {
    /// Events being written this frame
    pending: VecDeque<InputEvent>,
    /// Events from previous frame, ready for processing
    processing: VecDeque<InputEvent>,
}

impl InputQueue {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
            processing: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }

    /// Push an event to be processed next frame.
    #[inline]
    pub fn push(&mut self, event: InputEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues.
    ///
    /// Call this once per frame, before draining.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Drain all events from the previous frame.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.processing.drain(..)
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_push_and_swap() {
        let mut queue = InputQueue::new();

        queue.push(InputEvent::MouseMotion(Vec2::new(3.0, 4.0)));
        assert_eq!(queue.drain().count(), 0, "Events should not be visible before swap");

        queue.swap();
        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events, vec![InputEvent::MouseMotion(Vec2::new(3.0, 4.0))]);
        assert_eq!(queue.drain().count(), 0);
    }

    #[test]
    fn test_queue_double_buffer_isolation() {
        let mut queue = InputQueue::new();

        queue.push(InputEvent::PointerLockChanged(true));
        queue.swap();
        queue.push(InputEvent::PointerLockChanged(false));

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events, vec![InputEvent::PointerLockChanged(true)]);

        queue.swap();
        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events, vec![InputEvent::PointerLockChanged(false)]);
    }

    #[test]
    fn test_undrained_events_dropped_on_swap() {
        let mut queue = InputQueue::new();
        queue.push(InputEvent::Resized {
            width: 800,
            height: 600,
        });
        queue.swap();
        queue.swap();
        assert_eq!(queue.drain().count(), 0);
    }
}
