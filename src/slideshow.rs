//! Rotating image references for the now playing panel.

use std::time::Duration;

/// Cycles through image references on a fixed period.
///
/// Runs only while it holds at least two images; a single image is shown
/// statically.
#[derive(Debug, Clone)]
pub struct Slideshow {
    images: Vec<String>,
    index: usize,
    interval: Duration,
    elapsed: Duration,
    running: bool,
}

impl Slideshow {
    pub fn new(interval: Duration) -> Self {
        Self {
            images: Vec::new(),
            index: 0,
            interval,
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    /// Replace the image list and restart from the first image.
    pub fn load(&mut self, images: Vec<String>) {
        self.images = images;
        self.index = 0;
        self.elapsed = Duration::ZERO;
        self.running = self.images.len() > 1;
    }

    /// Stop rotating and go back to the first image.
    pub fn stop(&mut self) {
        self.running = false;
        self.index = 0;
        self.elapsed = Duration::ZERO;
    }

    /// Drop all images.
    pub fn clear(&mut self) {
        self.load(Vec::new());
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Image currently on display.
    pub fn current(&self) -> Option<&str> {
        self.images.get(self.index).map(String::as_str)
    }

    /// Move to the next image, wrapping after the last one.
    ///
    /// Returns the new image, or `None` when the slideshow is not running.
    pub fn tick(&mut self) -> Option<&str> {
        if !self.running || self.images.len() < 2 {
            return None;
        }
        self.index = (self.index + 1) % self.images.len();
        self.current()
    }

    /// Feed elapsed time; ticks once per full interval.
    ///
    /// Returns the image now on display if it changed.
    pub fn advance(&mut self, dt: Duration) -> Option<&str> {
        if !self.running || self.interval.is_zero() {
            return None;
        }
        self.elapsed += dt;

        let mut changed = false;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            if self.tick().is_some() {
                changed = true;
            }
        }

        if changed {
            self.current()
        } else {
            None
        }
    }
}
