//! Input-state reducer
//!
//! Folds batches of raw hardware events into a fixed-domain table of axis
//! positions and button states. The reducer is the only writer of that table;
//! everybody else works on [`Snapshot`] copies.
//!
//! ```text
//! EventSource ──[Vec<RawEvent>]──► StateReducer::apply ──► Snapshot
//! ```

use tracing::{debug, trace};

/// Raw event as delivered by an [`EventSource`](super::event_source::EventSource)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    AxisMotion { axis_index: usize, value: i16 },
    ButtonChange { button_index: usize, pressed: bool },
    QuitRequested,
}

/// Outcome of one [`StateReducer::apply`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyResult {
    /// `false` if and only if the batch contained a quit request
    pub continue_running: bool,
}

/// Axis positions indexed by raw axis number, every index in the domain present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisState {
    values: Vec<i16>,
}

impl AxisState {
    fn with_domain(num_axes: usize) -> Self {
        Self {
            values: vec![0; num_axes],
        }
    }

    pub fn get(&self, index: usize) -> Option<i16> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, i16)> + '_ {
        self.values.iter().copied().enumerate()
    }

    /// Overwrites an in-domain value on a caller-owned copy
    pub fn overwrite(&mut self, index: usize, value: i16) {
        self.set(index, value);
    }

    // Returns false when the index lies outside the domain
    fn set(&mut self, index: usize, value: i16) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Button states (0 = released, 1 = pressed) indexed by raw button number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    values: Vec<u8>,
}

impl ButtonState {
    fn with_domain(num_buttons: usize) -> Self {
        Self {
            values: vec![0; num_buttons],
        }
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.values.get(index).copied()
    }

    pub fn is_pressed(&self, index: usize) -> bool {
        self.get(index).is_some_and(|value| value != 0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.values.iter().copied().enumerate()
    }

    pub fn overwrite(&mut self, index: usize, pressed: bool) {
        self.set(index, pressed);
    }

    fn set(&mut self, index: usize, pressed: bool) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = u8::from(pressed);
                true
            }
            None => false,
        }
    }
}

/// Point-in-time copy of the whole controller state
///
/// Owns its data, so holding one across a frame boundary can never observe
/// a later [`StateReducer::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    axes: AxisState,
    buttons: ButtonState,
}

impl Snapshot {
    pub fn axes(&self) -> &AxisState {
        &self.axes
    }

    pub fn buttons(&self) -> &ButtonState {
        &self.buttons
    }

    /// Axis value, or 0 when the index is outside the configured domain
    pub fn axis(&self, index: usize) -> i16 {
        self.axes.get(index).unwrap_or(0)
    }

    /// Button value, or 0 when the index is outside the configured domain
    pub fn button(&self, index: usize) -> u8 {
        self.buttons.get(index).unwrap_or(0)
    }

    /// Mutable access for callers working on their own copy
    pub fn axes_mut(&mut self) -> &mut AxisState {
        &mut self.axes
    }

    pub fn buttons_mut(&mut self) -> &mut ButtonState {
        &mut self.buttons
    }
}

/// Owner of the live controller state
#[derive(Debug)]
pub struct StateReducer {
    axes: AxisState,
    buttons: ButtonState,
}

impl StateReducer {
    /// Creates a reducer with every axis and button in the domain set to 0
    pub fn new(num_axes: usize, num_buttons: usize) -> Self {
        debug!(
            "Creating state reducer with {} axes and {} buttons",
            num_axes, num_buttons
        );
        Self {
            axes: AxisState::with_domain(num_axes),
            buttons: ButtonState::with_domain(num_buttons),
        }
    }

    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    pub fn num_buttons(&self) -> usize {
        self.buttons.len()
    }

    /// Applies a batch in order; the last write to an index wins.
    ///
    /// Indices outside the domain are dropped without error, a controller
    /// reporting more inputs than tracked is expected and must not stop the
    /// dashboard. A quit request ends the fold: later events in the batch are
    /// left unapplied.
    pub fn apply(&mut self, events: &[RawEvent]) -> ApplyResult {
        for event in events {
            match *event {
                RawEvent::AxisMotion { axis_index, value } => {
                    if !self.axes.set(axis_index, value) {
                        trace!("Ignoring out-of-domain axis {}", axis_index);
                    }
                }
                RawEvent::ButtonChange {
                    button_index,
                    pressed,
                } => {
                    if !self.buttons.set(button_index, pressed) {
                        trace!("Ignoring out-of-domain button {}", button_index);
                    }
                }
                RawEvent::QuitRequested => {
                    debug!("Quit requested in event batch");
                    return ApplyResult {
                        continue_running: false,
                    };
                }
            }
        }

        ApplyResult {
            continue_running: true,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            axes: self.axes.clone(),
            buttons: self.buttons.clone(),
        }
    }
}
