//! Root context that owns every page-level controller for one session.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use reveal::{presets, RevealEngine};
use serde::Serialize;
use shared::{
    domain::{
        default_nav_links, RevealState, SectionId, SubmissionStatus, SubscriptionId, ThemeMode,
        ToastId, ToastLevel,
    },
    error::PageError,
};
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, info};
use viewport::VisibilityObserver;

use crate::{
    config::Settings,
    contact::ContactPipeline,
    delivery::DeliveryStrategy,
    nav::{NavigationController, ScrollHost},
    theme::ThemeController,
    toast::ToastQueue,
};

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Number of staggered children each section renders on the page.
pub fn default_item_count(section: SectionId) -> usize {
    match section {
        SectionId::Hero => 4,
        SectionId::About | SectionId::Experience | SectionId::Projects => 3,
        SectionId::Education => 2,
        SectionId::Skills => 6,
        SectionId::Services => 4,
        SectionId::Testimonials => 3,
        SectionId::Contact => 3,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSnapshot {
    pub section: SectionId,
    pub anchor: &'static str,
    pub state: RevealState,
    pub visible_items: usize,
    pub total_items: usize,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToastSnapshot {
    pub id: ToastId,
    pub level: ToastLevel,
    pub title: String,
    pub description: String,
    pub action_label: Option<String>,
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactSnapshot {
    pub status: SubmissionStatus,
    pub delivery: &'static str,
    pub last_error: Option<PageError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSnapshot {
    pub theme: ThemeMode,
    pub root_class: Option<&'static str>,
    pub menu_open: bool,
    pub sections: Vec<SectionSnapshot>,
    pub toasts: Vec<ToastSnapshot>,
    /// `None` while the contact section is not mounted.
    pub contact: Option<ContactSnapshot>,
}

/// One page session. Must be created inside a Tokio runtime: the toast
/// expiry task starts with it and stops when the shell is dropped.
pub struct PageShell {
    theme: ThemeController,
    nav: NavigationController,
    toasts: ToastQueue,
    reveal: RevealEngine,
    delivery: Arc<dyn DeliveryStrategy>,
    contact: Option<ContactPipeline>,
    mounted: BTreeMap<SectionId, SubscriptionId>,
    stagger_interval: Option<Duration>,
    expiry: JoinHandle<()>,
}

impl PageShell {
    pub fn new(
        settings: &Settings,
        observer: Arc<dyn VisibilityObserver>,
        host: Arc<dyn ScrollHost>,
        delivery: Arc<dyn DeliveryStrategy>,
    ) -> Self {
        let toasts = ToastQueue::new(settings.toast_ttl);
        let expiry = toasts.spawn_expiry();
        info!(strategy = delivery.name(), "shell: page session started");
        Self {
            theme: ThemeController::new(),
            nav: NavigationController::new(default_nav_links(), host),
            toasts,
            reveal: RevealEngine::new(observer),
            delivery,
            contact: None,
            mounted: BTreeMap::new(),
            stagger_interval: settings.stagger_interval,
            expiry,
        }
    }

    pub fn theme(&self) -> &ThemeController {
        &self.theme
    }

    pub fn theme_mut(&mut self) -> &mut ThemeController {
        &mut self.theme
    }

    pub fn nav(&self) -> &NavigationController {
        &self.nav
    }

    pub fn nav_mut(&mut self) -> &mut NavigationController {
        &mut self.nav
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn reveal(&self) -> &RevealEngine {
        &self.reveal
    }

    pub fn reveal_mut(&mut self) -> &mut RevealEngine {
        &mut self.reveal
    }

    /// The contact form, present only while its section is mounted.
    pub fn contact(&self) -> Option<&ContactPipeline> {
        self.contact.as_ref()
    }

    pub fn is_mounted(&self, section: SectionId) -> bool {
        self.mounted.contains_key(&section)
    }

    pub fn subscription(&self, section: SectionId) -> Option<SubscriptionId> {
        self.mounted.get(&section).copied()
    }

    /// Registers the section with the reveal engine. Mounting an already
    /// mounted section returns its existing subscription.
    pub fn mount_section(
        &mut self,
        section: SectionId,
        item_count: usize,
        now: Instant,
    ) -> SubscriptionId {
        if let Some(id) = self.mounted.get(&section) {
            return *id;
        }
        let mut spec = presets::section_spec(section, item_count);
        if let Some(interval) = self.stagger_interval {
            spec.stagger.interval = interval;
        }
        let id = self.reveal.register(spec, now);
        self.mounted.insert(section, id);
        if section == SectionId::Contact {
            self.contact = Some(ContactPipeline::new(
                self.delivery.clone(),
                self.toasts.clone(),
            ));
        }
        debug!(anchor = section.anchor(), subscription = id.0, "shell: section mounted");
        id
    }

    /// Mounts every section in page order with its default item count.
    pub fn mount_all(&mut self, now: Instant) -> Vec<SubscriptionId> {
        SectionId::ALL
            .into_iter()
            .map(|section| self.mount_section(section, default_item_count(section), now))
            .collect()
    }

    /// Unregisters the section. Unmounting the contact section tears its
    /// form down, discarding any delivery still in flight.
    pub fn unmount_section(&mut self, section: SectionId) -> bool {
        let Some(id) = self.mounted.remove(&section) else {
            return false;
        };
        self.reveal.unregister(id);
        if section == SectionId::Contact {
            if let Some(contact) = self.contact.take() {
                contact.unmount();
            }
        }
        debug!(anchor = section.anchor(), "shell: section unmounted");
        true
    }

    pub fn pump_visibility(&mut self) -> usize {
        self.reveal.pump()
    }

    pub async fn snapshot(&self, now: Instant) -> PageSnapshot {
        let sections = self
            .mounted
            .iter()
            .filter_map(|(section, id)| {
                let frame = self.reveal.frame(*id, now)?;
                Some(SectionSnapshot {
                    section: *section,
                    anchor: section.anchor(),
                    state: frame.state,
                    visible_items: self.reveal.visible_items(*id, now),
                    total_items: frame.items.len(),
                    opacity: frame.section.opacity,
                })
            })
            .collect();

        let toasts = self
            .toasts
            .visible()
            .await
            .into_iter()
            .map(|toast| ToastSnapshot {
                id: toast.id,
                level: toast.level,
                remaining_ms: millis(toast.expires_at().saturating_duration_since(now)),
                title: toast.title,
                description: toast.description,
                action_label: toast.action_label,
            })
            .collect();

        let contact = match &self.contact {
            Some(contact) => Some(ContactSnapshot {
                status: contact.status().await,
                delivery: contact.delivery_name(),
                last_error: contact.last_error().await.map(PageError::from),
            }),
            None => None,
        };

        PageSnapshot {
            theme: self.theme.mode(),
            root_class: self.theme.root_class(),
            menu_open: self.nav.is_menu_open(),
            sections,
            toasts,
            contact,
        }
    }
}

impl Drop for PageShell {
    fn drop(&mut self) {
        self.expiry.abort();
    }
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
