// Turns left-button press/release events into a validated selection rectangle.
//
// State machine:
//   Idle/any --down--> Pressed --up--> Released --normalize--> Validated --first track--> Tracking
// A rejected (out-of-frame) selection falls back to Idle. A new button-down is
// accepted in every state and restarts from Pressed.
use std::fmt::Debug;

use log::{debug, trace, warn};

use crate::types::SelectionRect;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Idle,
    Pressed,
    Released,
    Validated,
    Tracking,
}

impl SelectionState {
    pub fn label(&self) -> &'static str {
        match self {
            SelectionState::Idle => "IDLE",
            SelectionState::Pressed => "PRESSED",
            SelectionState::Released => "RELEASED",
            SelectionState::Validated => "VALIDATED",
            SelectionState::Tracking => "TRACKING",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Up,
}

/// A button edge at a frame-coordinate position. `context` is opaque to the
/// selector; it only shows up in the debug log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointerEvent<C = ()> {
    pub kind: PointerKind,
    pub x: i32,
    pub y: i32,
    pub context: C,
}

impl PointerEvent<()> {
    pub fn down(x: i32, y: i32) -> Self {
        Self { kind: PointerKind::Down, x, y, context: () }
    }

    pub fn up(x: i32, y: i32) -> Self {
        Self { kind: PointerKind::Up, x, y, context: () }
    }
}

#[derive(Debug, Default)]
pub struct RegionSelector {
    state: SelectionState,
    anchor: Option<(i32, i32)>,
    rect: SelectionRect,
    frame_size: Option<(usize, usize)>,
}

impl RegionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the frame selections are validated against. Updated by the
    /// session on every frame; without it no selection can be validated.
    pub fn set_frame_size(&mut self, width: usize, height: usize) {
        self.frame_size = Some((width, height));
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// The selection, if one is currently valid.
    pub fn selection(&self) -> Option<SelectionRect> {
        match self.state {
            SelectionState::Validated | SelectionState::Tracking => Some(self.rect),
            _ => None,
        }
    }

    /// Rectangle between the press position and `cursor` while the button is held.
    pub fn drag_preview(&self, cursor: (i32, i32)) -> Option<SelectionRect> {
        match (self.state, self.anchor) {
            (SelectionState::Pressed, Some(a)) => Some(SelectionRect::from_corners(a, cursor)),
            _ => None,
        }
    }

    pub fn handle<C: Debug>(&mut self, event: &PointerEvent<C>) -> SelectionState {
        match event.kind {
            PointerKind::Down => {
                debug!("button down at ({}, {}) {:?}", event.x, event.y, event.context);
                self.rect = SelectionRect::default();
                self.anchor = Some((event.x, event.y));
                self.state = SelectionState::Pressed;
            }
            PointerKind::Up => {
                debug!("button up at ({}, {}) {:?}", event.x, event.y, event.context);
                let Some(anchor) = self.anchor.take() else {
                    // Release without a press we saw (e.g. press happened outside the window).
                    trace!("ignoring button up in state {:?}", self.state);
                    return self.state;
                };
                self.state = SelectionState::Released;
                self.rect = SelectionRect::from_corners(anchor, (event.x, event.y));
                self.state = SelectionState::Validated;
                self.validate();
            }
        }
        self.state
    }

    fn validate(&mut self) {
        let ok = match self.frame_size {
            Some((w, h)) => self.rect.fits_within(w, h),
            None => false,
        };
        if ok {
            debug!("selection validated: {:?}", self.rect);
        } else {
            warn!("selection {:?} outside frame {:?}; discarded", self.rect, self.frame_size);
            self.state = SelectionState::Idle;
        }
    }

    /// Validated -> Tracking, once the tracker produced its first result.
    pub fn begin_tracking(&mut self) {
        if self.state == SelectionState::Validated {
            self.state = SelectionState::Tracking;
        }
    }

    /// Drop the selection and wait for a new one.
    pub fn reject(&mut self) {
        self.anchor = None;
        self.state = SelectionState::Idle;
    }
}
