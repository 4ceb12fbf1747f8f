//! Visibility observation seam between the host environment and the reveal
//! engine.
//!
//! A host reports how much of each rendered target is inside the viewport;
//! observers turn that into per-target streams of [`VisibilityEntry`] values.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;
use tokio::{sync::mpsc, time::Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    /// Fraction of the target's area inside the viewport, in `0.0..=1.0`.
    pub visible_fraction: f32,
    pub observed_at: Instant,
}

pub type VisibilityStream = mpsc::UnboundedReceiver<VisibilityEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserveError {
    #[error("visibility observation is not supported by this host")]
    Unsupported,
    #[error("no rendered element for anchor '{0}'")]
    TargetMissing(String),
}

pub trait VisibilityObserver: Send + Sync {
    /// Starts observing `target`. Entries are delivered whenever the visible
    /// fraction crosses one of `thresholds`, plus once for the first report.
    /// Dropping the returned stream ends the observation.
    fn observe(&self, target: &str, thresholds: &[f32]) -> Result<VisibilityStream, ObserveError>;
}

/// Observer for hosts without any visibility primitive.
pub struct UnsupportedObserver;

impl VisibilityObserver for UnsupportedObserver {
    fn observe(&self, _target: &str, _thresholds: &[f32]) -> Result<VisibilityStream, ObserveError> {
        Err(ObserveError::Unsupported)
    }
}

struct Watch {
    thresholds: Vec<f32>,
    last_fraction: Option<f32>,
    tx: mpsc::UnboundedSender<VisibilityEntry>,
}

#[derive(Default)]
struct ManualObserverState {
    mounted: HashMap<String, Vec<Watch>>,
}

/// Observer fed by the host: the host mounts targets as it renders them and
/// reports the visible fraction it computed for each one.
#[derive(Default)]
pub struct ManualObserver {
    inner: Mutex<ManualObserverState>,
}

impl ManualObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let observer = Self::new();
        for target in targets {
            observer.mount(target);
        }
        observer
    }

    fn state(&self) -> MutexGuard<'_, ManualObserverState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mount(&self, target: impl Into<String>) {
        self.state().mounted.entry(target.into()).or_default();
    }

    /// Removes the target from the render tree. Every stream observing it
    /// ends.
    pub fn unmount(&self, target: &str) -> bool {
        let removed = self.state().mounted.remove(target);
        if let Some(watches) = &removed {
            debug!(target, observers = watches.len(), "target unmounted");
        }
        removed.is_some()
    }

    pub fn is_mounted(&self, target: &str) -> bool {
        self.state().mounted.contains_key(target)
    }

    pub fn observer_count(&self, target: &str) -> usize {
        self.state()
            .mounted
            .get(target)
            .map(|watches| watches.iter().filter(|w| !w.tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Reports a new visible fraction for `target` and returns how many
    /// observers were notified.
    pub fn report(&self, target: &str, visible_fraction: f32, observed_at: Instant) -> usize {
        let fraction = if visible_fraction.is_nan() {
            0.0
        } else {
            visible_fraction.clamp(0.0, 1.0)
        };
        let mut state = self.state();
        let Some(watches) = state.mounted.get_mut(target) else {
            debug!(target, "visibility report for unmounted target ignored");
            return 0;
        };

        watches.retain(|watch| !watch.tx.is_closed());
        let mut notified = 0;
        for watch in watches.iter_mut() {
            let crossed = match watch.last_fraction {
                None => true,
                Some(previous) => crosses_any(&watch.thresholds, previous, fraction),
            };
            watch.last_fraction = Some(fraction);
            if crossed
                && watch
                    .tx
                    .send(VisibilityEntry {
                        visible_fraction: fraction,
                        observed_at,
                    })
                    .is_ok()
            {
                notified += 1;
            }
        }
        notified
    }
}

impl VisibilityObserver for ManualObserver {
    fn observe(&self, target: &str, thresholds: &[f32]) -> Result<VisibilityStream, ObserveError> {
        let mut state = self.state();
        let Some(watches) = state.mounted.get_mut(target) else {
            return Err(ObserveError::TargetMissing(target.to_string()));
        };
        let (tx, rx) = mpsc::unbounded_channel();
        watches.push(Watch {
            thresholds: thresholds.to_vec(),
            last_fraction: None,
            tx,
        });
        Ok(rx)
    }
}

/// A threshold is crossed when the fraction moves from one side of it to the
/// other. Threshold `0.0` tracks the intersecting / not-intersecting edge.
fn crosses_any(thresholds: &[f32], previous: f32, current: f32) -> bool {
    thresholds
        .iter()
        .any(|&threshold| meets(previous, threshold) != meets(current, threshold))
}

/// Whether `fraction` satisfies `threshold`. Any visible pixel satisfies a
/// zero threshold; nothing visible never does.
pub fn meets(fraction: f32, threshold: f32) -> bool {
    fraction > 0.0 && fraction >= threshold
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
