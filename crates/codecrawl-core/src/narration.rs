//! Player-facing narration.
//!
//! Narration is what the player reads in the battle log. It is separate
//! from diagnostics, but every narrated line is also emitted as a `debug`
//! event under the `codecrawl::narration` target.
//!
//! Lines reach a sink as they are spoken, pacing delays included, so a UI
//! can hand an [`UnboundedSender`] to
//! [`RunState::run_turn_with`](crate::RunState::run_turn_with) and render
//! the turn live.

use tokio::sync::mpsc::UnboundedSender;

/// Receives narration lines in the order they happen.
pub trait NarrationSink {
    /// Record one line.
    fn narrate(&mut self, line: String);
}

impl NarrationSink for Vec<String> {
    fn narrate(&mut self, line: String) {
        self.push(line);
    }
}

impl NarrationSink for UnboundedSender<String> {
    fn narrate(&mut self, line: String) {
        if self.send(line).is_err() {
            tracing::trace!("narration receiver dropped");
        }
    }
}

/// A sink that drops every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quiet;

impl NarrationSink for Quiet {
    fn narrate(&mut self, _line: String) {}
}

/// Keeps every line for the turn report while forwarding it to a live sink.
pub(crate) struct Transcript<'a, S: ?Sized> {
    pub(crate) lines: Vec<String>,
    live: &'a mut S,
}

impl<'a, S: NarrationSink + ?Sized> Transcript<'a, S> {
    pub(crate) const fn new(live: &'a mut S) -> Self {
        Self {
            lines: Vec::new(),
            live,
        }
    }
}

impl<S: NarrationSink + ?Sized> NarrationSink for Transcript<'_, S> {
    fn narrate(&mut self, line: String) {
        self.lines.push(line.clone());
        self.live.narrate(line);
    }
}

/// Mirror a line to tracing, then hand it to the sink.
pub fn say<S: NarrationSink + ?Sized>(sink: &mut S, line: impl Into<String>) {
    let line = line.into();
    tracing::debug!(target: "codecrawl::narration", %line);
    sink.narrate(line);
}
