//! Additive-increase / multiplicative-decrease page sizing.
//!
//! The page size grows by a slow-start increment (1, 2, 4, 8, ...) after every
//! successful page and is cut by a constant factor whenever the server times
//! out, at which point the increment starts over from 1.

/// Bounds of the page-size controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimdLimits {
    /// Largest page the API accepts.
    pub max_page_size: u32,
    /// Largest increment the slow start reaches.
    pub max_increment: u32,
    /// Factor applied on timeout, in `(0, 1)`.
    pub decrease_factor: f64,
}

impl Default for AimdLimits {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            max_increment: 8,
            decrease_factor: 0.5,
        }
    }
}

/// Page size and increment of one bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSizeController {
    page_size: u32,
    increment: u32,
    limits: AimdLimits,
}

impl PageSizeController {
    /// Start at `page_size` with `increment`, both clamped to the limits.
    #[must_use]
    pub fn new(page_size: u32, increment: u32, limits: AimdLimits) -> Self {
        Self {
            page_size: page_size.clamp(1, limits.max_page_size.max(1)),
            increment: increment.clamp(1, limits.max_increment.max(1)),
            limits,
        }
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn increment(&self) -> u32 {
        self.increment
    }

    /// A page came back: grow the page size, then double the increment.
    pub fn grow(&mut self) {
        self.page_size = self
            .page_size
            .saturating_add(self.increment)
            .min(self.limits.max_page_size);
        self.increment = self
            .increment
            .saturating_mul(2)
            .min(self.limits.max_increment);
    }

    /// The server timed out: cut the page size and restart the slow start.
    pub fn shrink(&mut self) {
        let cut = (f64::from(self.page_size) * self.limits.decrease_factor).floor();
        self.page_size = (cut as u32).max(1);
        self.increment = 1;
    }
}
