/// Timer-reset debouncing with a distinct-until-changed gate
///
/// Each `push` replaces the pending value and restarts the quiet period.
/// When the deadline passes, `settle` hands the pending value over only if it
/// differs from the last settled one. Superseded values are dropped without
/// ever being evaluated.
///
/// The debouncer owns no task or timer; the caller sleeps until
/// [`Debouncer::deadline`] (typically inside a `tokio::select!`) and then calls
/// [`Debouncer::settle`].

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
    settled: Option<T>,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Debouncer {
            quiet,
            pending: None,
            settled: None,
        }
    }

    /// Starts with `initial` already settled, so pushing it again is a no-op
    pub fn with_initial(quiet: Duration, initial: T) -> Self {
        Debouncer {
            quiet,
            pending: None,
            settled: Some(initial),
        }
    }

    /// Replaces the pending value and restarts the quiet period
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.quiet));
    }

    /// When the pending value becomes due, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Takes the pending value if its deadline has passed
    ///
    /// Returns `None` when nothing is due yet, or when the due value equals
    /// the last settled value.
    pub fn settle(&mut self) -> Option<T> {
        match &self.pending {
            Some((_, at)) if *at <= Instant::now() => {}
            _ => return None,
        }

        let (value, _) = self.pending.take()?;
        if self.settled.as_ref() == Some(&value) {
            return None;
        }
        self.settled = Some(value.clone());
        Some(value)
    }

    /// The last settled value
    pub fn settled(&self) -> Option<&T> {
        self.settled.as_ref()
    }
}
