//! Wall-clock timing of the run's steps.
//!
//! Timers are plain guards keyed by name, so they stay correct when a task
//! moves between runtime threads across an `.await`.

use once_cell::sync::Lazy;
use std::{
    borrow::Cow,
    sync::Mutex,
    time::{Duration, Instant},
};

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accum {
    pub total: Duration,
    pub max: Duration,
    pub count: u64,
}

impl Accum {
    fn record(&mut self, elapsed: Duration) {
        self.total += elapsed;
        self.max = self.max.max(elapsed);
        self.count += 1;
    }

    fn avg(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total.div_f64(self.count as f64)
        }
    }
}

// Insertion order is kept so the summary follows the run.
static STEPS: Lazy<Mutex<Vec<(Cow<'static, str>, Accum)>>> = Lazy::new(|| Mutex::new(Vec::new()));

// Set by run_start, frozen by run_end.
static RUN: Lazy<Mutex<Option<Instant>>> = Lazy::new(|| Mutex::new(None));
static RUN_TOTAL: Lazy<Mutex<Duration>> = Lazy::new(|| Mutex::new(Duration::ZERO));

pub fn run_start() {
    *RUN.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
}

pub fn run_end() {
    if let Some(start) = RUN.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take() {
        *RUN_TOTAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = start.elapsed();
    }
}

pub fn run_total() -> Duration {
    *RUN_TOTAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record(name: Cow<'static, str>, elapsed: Duration) {
    let mut steps = STEPS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match steps.iter_mut().find(|(key, _)| *key == name) {
        Some((_, accum)) => accum.record(elapsed),
        None => {
            let mut accum = Accum::default();
            accum.record(elapsed);
            steps.push((name, accum));
        }
    }
}

/// Accumulated timing for `name`, if it has been recorded.
#[cfg(test)]
pub fn step(name: &str) -> Option<Accum> {
    STEPS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, accum)| *accum)
}

/// Records the time between creation and drop under its name.
pub struct StepTimer {
    name: Cow<'static, str>,
    start: Instant,
}

impl StepTimer {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for StepTimer {
    fn drop(&mut self) {
        record(std::mem::take(&mut self.name), self.start.elapsed());
    }
}

/// Use: `let _t = time_step!("deploy token");`
#[macro_export]
macro_rules! time_step {
    ($name:literal) => {
        $crate::metrics::StepTimer::new($name)
    };
    ($fmt:literal, $($arg:tt)+) => {
        $crate::metrics::StepTimer::new(format!($fmt, $($arg)+))
    };
}

pub fn print_step_summary() {
    let total = run_total();
    let steps = STEPS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let name_w = steps
        .iter()
        .map(|(name, _)| name.len())
        .fold("Step".len(), usize::max);

    println!();
    println!("{:-<1$}", "", name_w + 56);
    println!(
        "{:<name_w$}  {:>10}  {:>14}  {:>14}  {:>14}",
        "Step",
        "Count",
        "Total (ms)",
        "Avg (ms)",
        "Max (ms)",
        name_w = name_w
    );
    println!("{:-<1$}", "", name_w + 56);

    for (name, acc) in steps.iter() {
        println!(
            "{:<name_w$}  {:>10}  {:>14.3}  {:>14.3}  {:>14.3}",
            name,
            acc.count,
            acc.total.as_secs_f64() * 1000.0,
            acc.avg().as_secs_f64() * 1000.0,
            acc.max.as_secs_f64() * 1000.0,
            name_w = name_w
        );
    }
    println!("{:-<1$}", "", name_w + 56);

    if total > Duration::ZERO {
        println!("TOTAL (wall ms) {:>14.3}", total.as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_under_the_same_name() {
        for _ in 0..3 {
            let _t = time_step!("metrics test step");
        }
        let _t = time_step!("metrics test step {}", 2);
        drop(_t);

        let accum = step("metrics test step").unwrap();
        assert_eq!(accum.count, 3);
        assert!(accum.max <= accum.total);
        assert_eq!(step("metrics test step 2").unwrap().count, 1);
        assert!(step("never recorded").is_none());
    }

    #[test]
    fn average_of_empty_accum_is_zero() {
        assert_eq!(Accum::default().avg(), Duration::ZERO);
    }

    #[test]
    fn average_survives_counts_past_u32() {
        let accum = Accum {
            total: Duration::from_secs(1 << 33),
            max: Duration::from_secs(1),
            count: 1 << 33,
        };
        assert_eq!(accum.avg(), Duration::from_secs(1));
    }
}
