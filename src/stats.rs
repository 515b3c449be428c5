use std::time::{Duration, Instant};

/// Executed-operation counter and elapsed-time accumulator.
///
/// Time spent blocked in byte-level I/O is excluded: callers bracket such
/// calls with [`RunStatistics::time_io`], which stops the clock for the
/// duration of the closure.
#[derive(Debug)]
pub struct RunStatistics {
    op_count: u64,
    elapsed: Duration,
    last_start: Instant,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self {
            op_count: 0,
            elapsed: Duration::ZERO,
            last_start: Instant::now(),
        }
    }

    pub fn count(&mut self) {
        self.op_count += 1;
    }

    pub fn start_timer(&mut self) {
        self.last_start = Instant::now();
    }

    pub fn stop_timer(&mut self) {
        self.elapsed += self.last_start.elapsed();
    }

    /// Runs `f` with the clock stopped, so a blocking read/write doesn't
    /// count toward the reported elapsed time.
    pub fn time_io<T>(&mut self, f: impl FnOnce() -> T) -> T {
        self.stop_timer();
        let result = f();
        self.start_timer();
        result
    }

    pub fn op_count(&self) -> u64 {
        self.op_count
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// The one-line statistics report, e.g.
    /// `Finished after 0.0023s (128 FJ ops executed).`
    pub fn report(&self) -> String {
        format!(
            "Finished after {}s ({} FJ ops executed).",
            format_four_sig_figs(self.elapsed_secs()),
            self.op_count
        )
    }
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

/// Formats `v` to four significant figures, approximating the default
/// `std::cout` precision the original interpreter relies on.
fn format_four_sig_figs(v: f64) -> String {
    if v == 0.0 {
        return "0.000".to_string();
    }
    let magnitude = v.abs().log10().floor() as i32;
    let decimals = (3 - magnitude).clamp(0, 12) as usize;
    format!("{v:.decimals$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_count_increments() {
        let mut stats = RunStatistics::new();
        stats.count();
        stats.count();
        assert_eq!(stats.op_count(), 2);
    }

    #[test]
    fn time_io_excludes_blocked_duration() {
        let mut stats = RunStatistics::new();
        stats.stop_timer();
        let before = stats.elapsed_secs();
        let value = stats.time_io(|| {
            std::thread::sleep(std::time::Duration::from_millis(20));
            42
        });
        assert_eq!(value, 42);
        stats.stop_timer();
        // The sleep happened while the timer was stopped, so elapsed barely moved.
        assert!(stats.elapsed_secs() - before < 0.01);
    }

    #[test]
    fn four_sig_figs_formatting() {
        assert_eq!(format_four_sig_figs(0.0), "0.000");
        assert_eq!(format_four_sig_figs(1.0), "1.000");
        assert_eq!(format_four_sig_figs(123.456), "123.5");
    }
}
