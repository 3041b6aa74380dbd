//! One blink clock shared by every cursor so they blink in phase

use crossbeam::channel::{self, Receiver};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct CursorTimer {
    interval: Duration,
    ticker: Option<Receiver<Instant>>,
    visible: bool,
    focused: bool,
    editable: bool,
}

impl CursorTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ticker: None,
            visible: false,
            focused: false,
            editable: true,
        }
    }

    fn enabled(&self) -> bool {
        self.focused && self.editable && !self.interval.is_zero()
    }

    /// Show cursors and restart the blink phase
    pub fn reset_timer(&mut self) {
        if !self.enabled() {
            self.stop_timer();
            return;
        }
        self.visible = true;
        self.ticker = Some(channel::tick(self.interval));
    }

    /// Hide cursors and stop blinking
    pub fn stop_timer(&mut self) {
        self.ticker = None;
        self.visible = false;
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        self.reset_timer();
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        self.reset_timer();
    }

    /// Drain elapsed ticks, toggling visibility once per tick; returns the tick count
    pub fn poll(&mut self) -> usize {
        let Some(ticker) = &self.ticker else {
            return 0;
        };
        let ticks = ticker.try_iter().count();
        if ticks % 2 == 1 {
            self.visible = !self.visible;
        }
        ticks
    }

    /// Whether cursors are drawn right now
    pub fn cursors_visible(&self) -> bool {
        self.visible
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfocused_timer_never_shows_cursors() {
        let mut timer = CursorTimer::new(Duration::from_millis(5));
        timer.reset_timer();
        assert!(!timer.is_running());
        assert!(!timer.cursors_visible());
        assert_eq!(timer.poll(), 0);
    }

    #[test]
    fn test_focus_starts_blinking() {
        let mut timer = CursorTimer::new(Duration::from_millis(5));
        timer.set_focused(true);
        assert!(timer.is_running());
        assert!(timer.cursors_visible());

        std::thread::sleep(Duration::from_millis(30));
        assert!(timer.poll() >= 1);
    }

    #[test]
    fn test_read_only_suppresses_cursors() {
        let mut timer = CursorTimer::new(Duration::from_millis(5));
        timer.set_focused(true);
        timer.set_editable(false);
        assert!(!timer.is_running());
        assert!(!timer.cursors_visible());
    }
}
