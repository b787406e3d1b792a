//! Dashboard loop driver
//!
//! Runs the poll → apply → snapshot → render cycle at a fixed cadence on the
//! current task. The lifecycle is a statum machine:
//!
//! ```text
//! Starting ──► Running ──► Stopping(ShutdownReason)
//! ```
//!
//! The event source lives inside the machine, so the device is released when
//! the machine is dropped, whichever way the loop ended.

use crate::controller::event_source::EventSource;
use crate::controller::reducer::StateReducer;
use crate::controller::semantic::SemanticView;
use crate::dashboard::{Frame, Renderer};
use chrono::Local;
use statum::{machine, state};
use std::io;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The event source delivered a quit request
    QuitEvent,
    /// Ctrl+C
    Interrupted,
    RenderFailed(String),
}

#[derive(Clone, Debug)]
pub struct DriverSettings {
    pub frame_period: Duration,
    pub num_axes: usize,
    pub num_buttons: usize,
}

#[state]
#[derive(Debug, Clone)]
pub enum DashboardState {
    Starting,
    Running,
    Stopping(ShutdownReason),
}

#[machine]
pub struct Dashboard<S: DashboardState> {
    source: Box<dyn EventSource>,
    renderer: Box<dyn Renderer>,
    view: SemanticView,
    reducer: StateReducer,
    settings: DriverSettings,
}

impl Dashboard<Starting> {
    pub fn create(
        source: Box<dyn EventSource>,
        renderer: Box<dyn Renderer>,
        view: SemanticView,
        settings: DriverSettings,
    ) -> Self {
        let reducer = StateReducer::new(settings.num_axes, settings.num_buttons);
        Self::new(source, renderer, view, reducer, settings)
    }

    pub fn start(self) -> Dashboard<Running> {
        info!(
            "Starting dashboard for {} with profile {} ({} axes, {} buttons, {}ms frames)",
            self.source.name(),
            self.view.profile().name,
            self.reducer.num_axes(),
            self.reducer.num_buttons(),
            self.settings.frame_period.as_millis()
        );
        self.transition()
    }
}

impl Dashboard<Running> {
    /// One loop iteration; returns `Ok(false)` once the source asked to quit
    fn run_frame(&mut self) -> io::Result<(bool, usize)> {
        let events = self.source.poll();
        let result = self.reducer.apply(&events);
        if !result.continue_running {
            return Ok((false, events.len()));
        }

        let snapshot = self.reducer.snapshot();
        let groups = self.view.project_all(&snapshot);
        self.renderer.render(&Frame {
            device_name: self.source.name(),
            snapshot: &snapshot,
            groups: &groups,
        })?;

        Ok((true, events.len()))
    }

    /// Main loop, ends on a quit event, Ctrl+C or a failed render
    pub async fn run_until_shutdown(mut self) -> Dashboard<Stopping> {
        info!("Entering dashboard loop");

        let mut ticker = tokio::time::interval(self.settings.frame_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);
        let mut interrupt_armed = true;

        // Stats for performance monitoring
        let mut frames: u64 = 0;
        let mut total_events: usize = 0;
        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);

        let reason = loop {
            tokio::select! {
                signal = &mut interrupt, if interrupt_armed => {
                    match signal {
                        Ok(()) => {
                            info!("Interrupt received, leaving dashboard loop");
                            break ShutdownReason::Interrupted;
                        }
                        Err(e) => {
                            warn!("Unable to listen for Ctrl+C: {}", e);
                            interrupt_armed = false;
                        }
                    }
                }

                _ = ticker.tick() => {
                    match self.run_frame() {
                        Ok((true, event_count)) => {
                            frames += 1;
                            total_events += event_count;
                        }
                        Ok((false, _)) => {
                            info!("Quit event received, leaving dashboard loop");
                            break ShutdownReason::QuitEvent;
                        }
                        Err(e) => {
                            error!("Failed to render dashboard: {}", e);
                            break ShutdownReason::RenderFailed(e.to_string());
                        }
                    }

                    let now = Local::now();
                    if now - last_stats_time > stats_interval {
                        let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
                        debug!(
                            "Dashboard stats: {} frames, {} events in {} seconds ({:.2} events/sec)",
                            frames,
                            total_events,
                            elapsed_seconds,
                            total_events as f64 / elapsed_seconds as f64
                        );
                        frames = 0;
                        total_events = 0;
                        last_stats_time = now;
                    }
                }
            }
        };

        info!("Transitioning to Stopping state: {:?}", reason);
        self.transition_with(reason)
    }
}

impl Dashboard<Stopping> {
    /// Drops the event source and renderer, returning why the loop stopped
    pub fn finish(self) -> ShutdownReason {
        let reason = match self.get_state_data() {
            Some(reason) => reason.clone(),
            None => {
                warn!("No shutdown reason recorded, assuming interrupt");
                ShutdownReason::Interrupted
            }
        };
        drop(self);
        debug!("Dashboard resources released");
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reducer::{RawEvent, Snapshot};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct ScriptedSource {
        batches: VecDeque<Vec<RawEvent>>,
        released: Rc<Cell<bool>>,
    }

    impl EventSource for ScriptedSource {
        fn poll(&mut self) -> Vec<RawEvent> {
            self.batches.pop_front().unwrap_or_default()
        }

        fn name(&self) -> &str {
            "Scripted Pad"
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.released.set(true);
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        frames: Rc<RefCell<Vec<(Snapshot, Option<i32>)>>>,
        fail: bool,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, frame: &Frame<'_>) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal gone"));
            }
            let up = frame
                .groups
                .iter()
                .find(|group| group.name == "D-Pad")
                .and_then(|group| group.get("Up"));
            self.frames.borrow_mut().push((frame.snapshot.clone(), up));
            Ok(())
        }
    }

    fn settings() -> DriverSettings {
        DriverSettings {
            frame_period: Duration::from_millis(1),
            num_axes: 6,
            num_buttons: 20,
        }
    }

    fn scripted(batches: Vec<Vec<RawEvent>>) -> (Box<ScriptedSource>, Rc<Cell<bool>>) {
        let released = Rc::new(Cell::new(false));
        let source = Box::new(ScriptedSource {
            batches: batches.into(),
            released: released.clone(),
        });
        (source, released)
    }

    #[tokio::test]
    async fn quit_event_stops_loop_and_releases_source() {
        let (source, released) = scripted(vec![
            vec![
                RawEvent::AxisMotion {
                    axis_index: 0,
                    value: 12040,
                },
                RawEvent::ButtonChange {
                    button_index: 11,
                    pressed: true,
                },
            ],
            vec![],
            vec![RawEvent::QuitRequested],
        ]);
        let renderer = RecordingRenderer::default();
        let frames = renderer.frames.clone();

        let reason = Dashboard::create(source, Box::new(renderer), SemanticView::default(), settings())
            .start()
            .run_until_shutdown()
            .await
            .finish();

        assert_eq!(reason, ShutdownReason::QuitEvent);
        assert!(released.get());

        let frames = frames.borrow();
        assert_eq!(frames.len(), 2);
        let (snapshot, up) = &frames[0];
        assert_eq!(snapshot.axis(0), 12040);
        assert_eq!(snapshot.button(11), 1);
        assert_eq!(*up, Some(1));
        assert_eq!(frames[1].0, frames[0].0);
    }

    #[tokio::test]
    async fn state_carries_across_frames() {
        let (source, _) = scripted(vec![
            vec![RawEvent::ButtonChange {
                button_index: 3,
                pressed: true,
            }],
            vec![RawEvent::AxisMotion {
                axis_index: 5,
                value: -200,
            }],
            vec![RawEvent::QuitRequested],
        ]);
        let renderer = RecordingRenderer::default();
        let frames = renderer.frames.clone();

        Dashboard::create(source, Box::new(renderer), SemanticView::default(), settings())
            .start()
            .run_until_shutdown()
            .await
            .finish();

        let frames = frames.borrow();
        let last = &frames.last().unwrap().0;
        assert_eq!(last.button(3), 1);
        assert_eq!(last.axis(5), -200);
    }

    #[tokio::test]
    async fn render_failure_ends_loop() {
        let (source, released) = scripted(vec![]);
        let renderer = RecordingRenderer {
            fail: true,
            ..Default::default()
        };

        let reason = Dashboard::create(source, Box::new(renderer), SemanticView::default(), settings())
            .start()
            .run_until_shutdown()
            .await
            .finish();

        assert!(matches!(reason, ShutdownReason::RenderFailed(message) if message.contains("terminal gone")));
        assert!(released.get());
    }
}
