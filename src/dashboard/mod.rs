//! Terminal rendering of controller state
//!
//! Two layouts are available:
//!
//! - [`Layout::Raw`] lists every tracked button and axis by raw index
//! - [`Layout::Grouped`] prints one panel per profile group with labelled values
//!
//! Rendering is a pure side effect on the writer; nothing flows back to the loop.

use crate::controller::reducer::Snapshot;
use crate::controller::semantic::GroupState;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::io::{self, Write};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

// Axis values inside this band are shown uncoloured
const AXIS_COLOR_THRESHOLD: i32 = 1000;

/// Everything one frame needs, borrowed from the loop
#[derive(Debug)]
pub struct Frame<'a> {
    pub device_name: &'a str,
    pub snapshot: &'a Snapshot,
    pub groups: &'a [GroupState<'a>],
}

pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Raw,
    #[default]
    Grouped,
}

/// Plain text renderer that redraws the whole screen each frame
pub struct TextRenderer<W: Write> {
    out: W,
    layout: Layout,
    color: bool,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, layout: Layout, color: bool) -> Self {
        Self { out, layout, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: ColoredString) -> String {
        if self.color {
            text.to_string()
        } else {
            text.clear().to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        self.paint(text.cyan().bold())
    }

    fn button_text(&self, pressed: bool, released_label: &str) -> String {
        if pressed {
            self.paint("Pressed".bold().green())
        } else {
            self.paint(released_label.red())
        }
    }

    fn axis_text(&self, value: i32) -> String {
        let text = format!("{:+6}", value);
        if value > AXIS_COLOR_THRESHOLD {
            self.paint(text.as_str().green())
        } else if value < -AXIS_COLOR_THRESHOLD {
            self.paint(text.as_str().red())
        } else {
            text
        }
    }

    fn compose_raw(&self, frame: &Frame<'_>) -> Result<String, fmt::Error> {
        let mut screen = String::new();

        writeln!(screen, "{}", self.header("--- BUTTONS ---"))?;
        for (index, value) in frame.snapshot.buttons().iter() {
            writeln!(
                screen,
                "Button {:2}: {}",
                index,
                self.button_text(value != 0, "Released")
            )?;
        }

        writeln!(screen)?;
        writeln!(screen, "{}", self.header("--- AXES ---"))?;
        for (index, value) in frame.snapshot.axes().iter() {
            writeln!(
                screen,
                "Axis   {:2}: {}",
                index,
                self.axis_text(i32::from(value))
            )?;
        }

        Ok(screen)
    }

    fn compose_grouped(&self, frame: &Frame<'_>) -> Result<String, fmt::Error> {
        let mut screen = String::new();

        for group in frame.groups {
            let width = group
                .readings
                .iter()
                .map(|reading| reading.label.len())
                .max()
                .unwrap_or(0);

            writeln!(screen, "{}", self.header(&format!("[ {} ]", group.name)))?;
            for reading in &group.readings {
                let value = if reading.source.is_button() {
                    self.button_text(reading.value != 0, "Off")
                } else {
                    self.axis_text(reading.value)
                };
                writeln!(screen, "  {:<width$}  {}", reading.label, value, width = width)?;
            }
            writeln!(screen)?;
        }

        Ok(screen)
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, frame: &Frame<'_>) -> io::Result<()> {
        let body = match self.layout {
            Layout::Raw => self.compose_raw(frame),
            Layout::Grouped => self.compose_grouped(frame),
        }
        .map_err(io::Error::other)?;

        write!(self.out, "{}", CLEAR_SCREEN)?;
        writeln!(
            self.out,
            "--- {} --- (Press Ctrl+C to quit)",
            frame.device_name
        )?;
        writeln!(self.out)?;
        write!(self.out, "{}", body)?;
        self.out.flush()
    }
}
