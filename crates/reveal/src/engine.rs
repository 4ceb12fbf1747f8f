use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::FutureExt;
use shared::domain::{RevealPolicy, RevealState, SubscriptionId};
use tokio::{sync::broadcast, time::Instant};
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt, StreamMap, StreamNotifyClose};
use tracing::{debug, info};
use viewport::{meets, ObserveError, VisibilityEntry, VisibilityObserver};

use crate::motion::{MotionSpec, MotionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealTrigger {
    /// Reveal when the section scrolls into view.
    #[default]
    InView,
    /// Reveal as soon as the section mounts, without observing.
    OnMount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaggerSpec {
    pub interval: Duration,
    /// Wait before the first item starts.
    pub initial_delay: Duration,
}

impl StaggerSpec {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn delay_for(&self, index: usize) -> Duration {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        self.initial_delay + self.interval.saturating_mul(index)
    }
}

/// Registration request for one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpec {
    pub anchor: String,
    pub threshold: f32,
    pub policy: RevealPolicy,
    pub trigger: RevealTrigger,
    pub motion: MotionSpec,
    pub stagger: StaggerSpec,
    pub items: Vec<MotionSpec>,
}

impl SectionSpec {
    pub fn new(anchor: impl Into<String>, threshold: f32, policy: RevealPolicy) -> Self {
        Self {
            anchor: anchor.into(),
            threshold,
            policy,
            trigger: RevealTrigger::InView,
            motion: MotionSpec::fade(),
            stagger: StaggerSpec::default(),
            items: Vec::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: RevealTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_motion(mut self, motion: MotionSpec) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_stagger(mut self, stagger: StaggerSpec) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn with_items(mut self, items: Vec<MotionSpec>) -> Self {
        self.items = items;
        self
    }

    /// `count` children sharing one motion.
    pub fn with_uniform_items(self, count: usize, motion: MotionSpec) -> Self {
        self.with_items(vec![motion; count])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationItem {
    pub index: usize,
    /// Offset from the section's reveal moment.
    pub delay: Duration,
    pub motion: MotionSpec,
}

impl AnimationItem {
    fn effective_motion(&self) -> MotionSpec {
        self.motion.with_delay(self.delay + self.motion.delay)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionFrame {
    pub state: RevealState,
    pub section: MotionState,
    pub items: Vec<MotionState>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RevealEvent {
    Revealed {
        subscription: SubscriptionId,
        anchor: String,
        at: Instant,
    },
    Hidden {
        subscription: SubscriptionId,
        anchor: String,
        at: Instant,
    },
    Unobserved {
        subscription: SubscriptionId,
        anchor: String,
    },
}

struct RegisteredSection {
    anchor: String,
    threshold: f32,
    policy: RevealPolicy,
    motion: MotionSpec,
    items: Vec<AnimationItem>,
    state: RevealState,
    revealed_at: Option<Instant>,
    reveal_count: u32,
    observing: bool,
}

/// Drives the Hidden/Revealed state machine of every registered section from
/// the visibility entries its observer produces.
pub struct RevealEngine {
    observer: Arc<dyn VisibilityObserver>,
    sections: HashMap<SubscriptionId, RegisteredSection>,
    streams: StreamMap<SubscriptionId, StreamNotifyClose<UnboundedReceiverStream<VisibilityEntry>>>,
    next_subscription: u64,
    events: broadcast::Sender<RevealEvent>,
}

impl RevealEngine {
    pub fn new(observer: Arc<dyn VisibilityObserver>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            observer,
            sections: HashMap::new(),
            streams: StreamMap::new(),
            next_subscription: 0,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RevealEvent> {
        self.events.subscribe()
    }

    /// Starts tracking a mounted section. A section the host cannot observe
    /// at all is revealed immediately; one whose target is not rendered stays
    /// hidden and inert.
    pub fn register(&mut self, spec: SectionSpec, now: Instant) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        // A non-finite threshold could never be met; fall back to any visible pixel.
        let threshold = if spec.threshold.is_finite() {
            spec.threshold.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let items = spec
            .items
            .iter()
            .enumerate()
            .map(|(index, motion)| AnimationItem {
                index,
                delay: spec.stagger.delay_for(index),
                motion: *motion,
            })
            .collect();

        let mut section = RegisteredSection {
            anchor: spec.anchor,
            threshold,
            policy: spec.policy,
            motion: spec.motion,
            items,
            state: RevealState::Hidden,
            revealed_at: None,
            reveal_count: 0,
            observing: false,
        };

        let reveal_now = match spec.trigger {
            RevealTrigger::OnMount => true,
            RevealTrigger::InView => match self.observer.observe(&section.anchor, &[threshold]) {
                Ok(stream) => {
                    self.streams.insert(
                        id,
                        StreamNotifyClose::new(UnboundedReceiverStream::new(stream)),
                    );
                    section.observing = true;
                    false
                }
                Err(ObserveError::Unsupported) => {
                    info!(
                        anchor = %section.anchor,
                        "reveal: visibility observation unsupported, revealing on mount"
                    );
                    true
                }
                Err(ObserveError::TargetMissing(_)) => {
                    debug!(anchor = %section.anchor, "reveal: target not rendered, skipping");
                    false
                }
            },
        };

        debug!(
            subscription = id.0,
            anchor = %section.anchor,
            threshold,
            items = section.items.len(),
            "reveal: section registered"
        );
        self.sections.insert(id, section);
        if reveal_now {
            self.reveal(id, now);
        }
        id
    }

    /// Applies one visibility observation. Returns the new state when the
    /// section transitioned.
    pub fn on_visibility_change(
        &mut self,
        id: SubscriptionId,
        entry: VisibilityEntry,
    ) -> Option<RevealState> {
        let section = self.sections.get(&id)?;
        if !section.observing {
            return None;
        }

        let visible = meets(entry.visible_fraction, section.threshold);
        match (section.state, visible, section.policy) {
            (RevealState::Hidden, true, _) => {
                self.reveal(id, entry.observed_at);
                Some(RevealState::Revealed)
            }
            (RevealState::Revealed, false, RevealPolicy::Repeatable) => {
                self.hide(id, entry.observed_at);
                Some(RevealState::Hidden)
            }
            _ => None,
        }
    }

    /// Applies every observation that is already queued, without waiting.
    /// Streams that ended because their target went away are retired.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Some(Some((id, entry))) = self.streams.next().now_or_never() {
            match entry {
                Some(entry) => {
                    self.on_visibility_change(id, entry);
                    processed += 1;
                }
                None => self.target_gone(id),
            }
        }
        processed
    }

    /// Waits for the next observation from any section and applies it.
    /// Returns `None` once nothing is being observed.
    pub async fn process_next(&mut self) -> Option<(SubscriptionId, Option<RevealState>)> {
        loop {
            let (id, entry) = self.streams.next().await?;
            match entry {
                Some(entry) => return Some((id, self.on_visibility_change(id, entry))),
                None => self.target_gone(id),
            }
        }
    }

    fn target_gone(&mut self, id: SubscriptionId) {
        if let Some(section) = self.sections.get(&id) {
            debug!(subscription = id.0, anchor = %section.anchor, "reveal: target removed, observation ended");
        }
        self.stop_observing(id);
    }

    /// Stops tracking a section. Safe to call repeatedly and at any point,
    /// including while its items are still staggering in.
    pub fn unregister(&mut self, id: SubscriptionId) -> bool {
        self.streams.remove(&id);
        match self.sections.remove(&id) {
            Some(section) => {
                debug!(subscription = id.0, anchor = %section.anchor, "reveal: section unregistered");
                true
            }
            None => false,
        }
    }

    fn reveal(&mut self, id: SubscriptionId, at: Instant) {
        let Some(section) = self.sections.get_mut(&id) else {
            return;
        };
        section.state = RevealState::Revealed;
        section.revealed_at = Some(at);
        section.reveal_count += 1;
        let anchor = section.anchor.clone();
        let once = section.policy == RevealPolicy::Once;
        debug!(subscription = id.0, %anchor, "reveal: section revealed");
        let _ = self.events.send(RevealEvent::Revealed {
            subscription: id,
            anchor,
            at,
        });
        if once {
            self.stop_observing(id);
        }
    }

    fn hide(&mut self, id: SubscriptionId, at: Instant) {
        let Some(section) = self.sections.get_mut(&id) else {
            return;
        };
        section.state = RevealState::Hidden;
        section.revealed_at = None;
        let _ = self.events.send(RevealEvent::Hidden {
            subscription: id,
            anchor: section.anchor.clone(),
            at,
        });
    }

    fn stop_observing(&mut self, id: SubscriptionId) {
        self.streams.remove(&id);
        let Some(section) = self.sections.get_mut(&id) else {
            return;
        };
        if !section.observing {
            return;
        }
        section.observing = false;
        let _ = self.events.send(RevealEvent::Unobserved {
            subscription: id,
            anchor: section.anchor.clone(),
        });
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn state(&self, id: SubscriptionId) -> Option<RevealState> {
        self.sections.get(&id).map(|section| section.state)
    }

    /// Oldest live subscription registered for `anchor`.
    pub fn subscription_for(&self, anchor: &str) -> Option<SubscriptionId> {
        self.sections
            .iter()
            .filter(|(_, section)| section.anchor == anchor)
            .map(|(id, _)| *id)
            .min()
    }

    pub fn state_of(&self, anchor: &str) -> Option<RevealState> {
        self.subscription_for(anchor).and_then(|id| self.state(id))
    }

    pub fn reveal_count(&self, id: SubscriptionId) -> u32 {
        self.sections
            .get(&id)
            .map(|section| section.reveal_count)
            .unwrap_or(0)
    }

    pub fn is_observing(&self, id: SubscriptionId) -> bool {
        self.sections
            .get(&id)
            .is_some_and(|section| section.observing)
    }

    pub fn items(&self, id: SubscriptionId) -> &[AnimationItem] {
        self.sections
            .get(&id)
            .map(|section| section.items.as_slice())
            .unwrap_or_default()
    }

    /// Instant at which each item starts revealing, in index order. Empty
    /// while the section is hidden.
    pub fn item_schedule(&self, id: SubscriptionId) -> Vec<Instant> {
        let Some(section) = self.sections.get(&id) else {
            return Vec::new();
        };
        let Some(revealed_at) = section.revealed_at else {
            return Vec::new();
        };
        section
            .items
            .iter()
            .map(|item| revealed_at + item.delay)
            .collect()
    }

    pub fn visible_items(&self, id: SubscriptionId, now: Instant) -> usize {
        self.item_schedule(id)
            .into_iter()
            .filter(|start| *start <= now)
            .count()
    }

    /// Visual state of the section and its items at `now`.
    pub fn frame(&self, id: SubscriptionId, now: Instant) -> Option<SectionFrame> {
        let section = self.sections.get(&id)?;
        let frame = match section.revealed_at {
            None => SectionFrame {
                state: section.state,
                section: section.motion.initial,
                items: section.items.iter().map(|item| item.motion.initial).collect(),
            },
            Some(revealed_at) => {
                let since = now.saturating_duration_since(revealed_at);
                SectionFrame {
                    state: section.state,
                    section: section.motion.sample(since),
                    items: section
                        .items
                        .iter()
                        .map(|item| item.effective_motion().sample(since))
                        .collect(),
                }
            }
        };
        Some(frame)
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
