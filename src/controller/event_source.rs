use crate::controller::reducer::RawEvent;
use chrono::{DateTime, Local};
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Producer of raw event batches, polled once per frame
///
/// `poll` must not block; an empty batch is a normal answer.
pub trait EventSource {
    fn poll(&mut self) -> Vec<RawEvent>;

    /// Human-readable device name for the dashboard title
    fn name(&self) -> &str;
}

// Source settings
#[derive(Clone, Debug, Default)]
pub struct SourceSettings {
    pub joystick_index: usize,
    pub quit_on_disconnect: bool,
    /// Native event code -> raw button index, for buttons gilrs cannot name
    pub native_buttons: HashMap<u32, usize>,
}

// Source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to initialize gamepad backend: {0}")]
    InitializationError(String),

    #[error("No gamepad found, please connect a controller")]
    NoGamepad,

    #[error("Failed to open gamepad {index}: only {available} connected")]
    InvalidIndex { index: usize, available: usize },
}

/// Hardware event source backed by gilrs
///
/// Holds the backend and the selected gamepad for its whole lifetime; dropping
/// it releases the device.
pub struct GilrsEventSource {
    gilrs: Gilrs,
    active_gamepad: GamepadId,
    name: String,
    settings: SourceSettings,
}

impl GilrsEventSource {
    pub fn open(settings: &SourceSettings) -> Result<Self, SourceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(SourceError::InitializationError(e.to_string()));
            }
        };

        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = gilrs.gamepads().collect();
        if gamepads.is_empty() {
            return Err(SourceError::NoGamepad);
        }

        info!("Found {} gamepads:", gamepads.len());
        for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
            info!(
                "  [{}] ID: {}, Name: {}, UUID: {:?}",
                idx,
                id,
                gamepad.name(),
                gamepad.uuid()
            );
        }

        let (id, gamepad) = gamepads.get(settings.joystick_index).ok_or(
            SourceError::InvalidIndex {
                index: settings.joystick_index,
                available: gamepads.len(),
            },
        )?;
        let active_gamepad = *id;
        let name = gamepad.name().to_string();
        info!("Successfully opened gamepad: {} ({})", name, active_gamepad);

        Ok(Self {
            gilrs,
            active_gamepad,
            name,
            settings: settings.clone(),
        })
    }

    fn convert_gilrs_event(&self, id: GamepadId, event: EventType) -> Option<RawEvent> {
        match event {
            EventType::AxisChanged(axis, value, _) => axis_event(axis, value),
            // Analog triggers arrive as button values on most backends
            EventType::ButtonChanged(button, value, _) => trigger_event(button, value),
            EventType::ButtonPressed(button, code) => {
                button_event(button, code.into_u32(), true, &self.settings)
            }
            EventType::ButtonReleased(button, code) => {
                button_event(button, code.into_u32(), false, &self.settings)
            }
            EventType::Connected => {
                info!("Gamepad {} connected", id);
                None
            }
            EventType::Disconnected if id == self.active_gamepad => {
                disconnect_event(&self.settings)
            }
            _ => {
                debug!("Unhandled event type: {:?}", event);
                None
            }
        }
    }
}

impl EventSource for GilrsEventSource {
    fn poll(&mut self) -> Vec<RawEvent> {
        let mut batch = Vec::new();

        while let Some(Event { id, event, time, .. }) = self.gilrs.next_event() {
            // Connect/disconnect of other pads is still worth a log line
            if !is_relevant(id == self.active_gamepad, &event) {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                continue;
            }

            let timestamp: DateTime<Local> = time.into();
            debug!(
                "Processing gilrs event: {:?} at {}",
                event,
                timestamp.format("%H:%M:%S.%3f")
            );

            if let Some(raw_event) = self.convert_gilrs_event(id, event) {
                batch.push(raw_event);
            }
        }
        self.gilrs.inc();

        batch
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for GilrsEventSource {
    fn drop(&mut self) {
        info!("Gamepad {} closed and backend resources released", self.name);
    }
}

/// Raw button numbering of the Steam Deck SDL joystick
pub fn map_button(button: Button) -> Option<usize> {
    match button {
        Button::South => Some(0),
        Button::East => Some(1),
        Button::West => Some(2),
        Button::North => Some(3),
        Button::Select => Some(4),
        Button::Mode => Some(5),
        Button::Start => Some(6),
        Button::LeftThumb => Some(7),
        Button::RightThumb => Some(8),
        Button::LeftTrigger => Some(9),
        Button::RightTrigger => Some(10),
        Button::DPadUp => Some(11),
        Button::DPadDown => Some(12),
        Button::DPadLeft => Some(13),
        Button::DPadRight => Some(14),
        _ => None,
    }
}

pub fn map_axis(axis: Axis) -> Option<usize> {
    match axis {
        Axis::LeftStickX => Some(0),
        Axis::LeftStickY => Some(1),
        Axis::RightStickX => Some(2),
        Axis::RightStickY => Some(3),
        Axis::LeftZ => Some(4),
        Axis::RightZ => Some(5),
        _ => None,
    }
}

/// Events of other pads are dropped, except hotplug notifications
fn is_relevant(from_active: bool, event: &EventType) -> bool {
    from_active || matches!(event, EventType::Connected | EventType::Disconnected)
}

/// Stick Y is negated so that down reads positive, as on the SDL joystick
fn axis_event(axis: Axis, value: f32) -> Option<RawEvent> {
    let axis_index = map_axis(axis).or_else(|| {
        debug!("Ignoring unsupported axis: {:?}", axis);
        None
    })?;
    let value = match axis {
        Axis::LeftZ | Axis::RightZ => scale_trigger(value),
        Axis::LeftStickY | Axis::RightStickY => scale_stick(-value),
        _ => scale_stick(value),
    };
    Some(RawEvent::AxisMotion { axis_index, value })
}

fn trigger_event(button: Button, value: f32) -> Option<RawEvent> {
    let axis_index = match button {
        Button::LeftTrigger2 => 4,
        Button::RightTrigger2 => 5,
        _ => return None,
    };
    Some(RawEvent::AxisMotion {
        axis_index,
        value: scale_trigger(value),
    })
}

/// Named buttons first, then the native code table
fn resolve_button(button: Button, native_code: u32, settings: &SourceSettings) -> Option<usize> {
    map_button(button).or_else(|| settings.native_buttons.get(&native_code).copied())
}

fn button_event(
    button: Button,
    native_code: u32,
    pressed: bool,
    settings: &SourceSettings,
) -> Option<RawEvent> {
    match resolve_button(button, native_code, settings) {
        Some(button_index) => Some(RawEvent::ButtonChange {
            button_index,
            pressed,
        }),
        None => {
            debug!("Unmapped button {:?} (code {})", button, native_code);
            None
        }
    }
}

fn disconnect_event(settings: &SourceSettings) -> Option<RawEvent> {
    if settings.quit_on_disconnect {
        warn!("Active gamepad disconnected, requesting quit");
        Some(RawEvent::QuitRequested)
    } else {
        warn!("Active gamepad disconnected");
        None
    }
}

// -1.0..=1.0 to the signed 16 bit hardware range, -1.0 reads -32768
fn scale_stick(value: f32) -> i16 {
    let value = value.clamp(-1.0, 1.0);
    let scaled = if value < 0.0 {
        value * 32768.0
    } else {
        value * 32767.0
    };
    scaled.round() as i16
}

// 0.0..=1.0 to -32768..=32767, resting trigger reads fully negative
fn scale_trigger(value: f32) -> i16 {
    let scaled = (value.clamp(0.0, 1.0) * 65535.0).round() - 32768.0;
    scaled as i16
}
