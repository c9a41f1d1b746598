/// Default number of consecutive empty cycles tolerated before giving up.
pub const DEFAULT_STALL_THRESHOLD: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Frames arrived this cycle; the idle count is back to zero.
    Active,
    /// No frames, but still under the threshold.
    Idle { cycles: u32 },
    /// The threshold was just reached. Reported exactly once.
    Stalled { cycles: u32 },
}

/// Counts consecutive aggregation cycles without frames.
///
/// Healthy until the idle count reaches `threshold`, then Stalled for good.
/// Any cycle with frames clears the count, so idle cycles never add up across
/// a healthy one.
#[derive(Debug)]
pub struct StallWatchdog {
    threshold: u32,
    idle_cycles: u32,
    stalled: bool,
}

impl StallWatchdog {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            idle_cycles: 0,
            stalled: false,
        }
    }

    pub fn idle_cycles(&self) -> u32 {
        self.idle_cycles
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Feed the frame count of one cycle's snapshot.
    ///
    /// Once stalled, further observations change nothing and return `None`.
    pub fn observe(&mut self, frames: u64) -> Option<Verdict> {
        if self.stalled {
            return None;
        }
        if frames > 0 {
            self.idle_cycles = 0;
            return Some(Verdict::Active);
        }

        self.idle_cycles += 1;
        if self.idle_cycles >= self.threshold {
            self.stalled = true;
            Some(Verdict::Stalled {
                cycles: self.idle_cycles,
            })
        } else {
            Some(Verdict::Idle {
                cycles: self.idle_cycles,
            })
        }
    }
}
