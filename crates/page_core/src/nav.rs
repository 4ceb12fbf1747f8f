use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::domain::{NavLink, SectionId};
use tracing::debug;

/// The rendered page as navigation sees it.
pub trait ScrollHost: Send + Sync {
    fn has_anchor(&self, anchor: &str) -> bool;
    fn smooth_scroll_to(&self, anchor: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    Scrolled { anchor: String, closed_menu: bool },
    /// Nothing rendered under that anchor; no state changed.
    TargetMissing,
}

/// Owns the mobile drawer flag and scrolls to link targets.
pub struct NavigationController {
    links: Vec<NavLink>,
    menu_open: bool,
    host: Arc<dyn ScrollHost>,
}

impl NavigationController {
    pub fn new(links: Vec<NavLink>, host: Arc<dyn ScrollHost>) -> Self {
        Self {
            links,
            menu_open: false,
            host,
        }
    }

    pub fn links(&self) -> &[NavLink] {
        &self.links
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn toggle_menu(&mut self) -> bool {
        self.menu_open = !self.menu_open;
        self.menu_open
    }

    /// Closes the drawer and scrolls to the link's target. A link whose
    /// target is not rendered leaves both the drawer and the scroll position
    /// alone.
    pub fn activate(&mut self, link: &NavLink) -> NavOutcome {
        let anchor = link.anchor_key();
        if !self.host.has_anchor(anchor) {
            debug!(href = %link.href, "nav: link target not rendered");
            return NavOutcome::TargetMissing;
        }
        let closed_menu = std::mem::replace(&mut self.menu_open, false);
        self.host.smooth_scroll_to(anchor);
        debug!(anchor, closed_menu, "nav: scrolled to link target");
        NavOutcome::Scrolled {
            anchor: anchor.to_string(),
            closed_menu,
        }
    }

    /// Scrolls without touching the drawer, for in-page calls to action.
    pub fn scroll_to(&self, anchor: &str) -> NavOutcome {
        let anchor = anchor.strip_prefix('#').unwrap_or(anchor);
        if !self.host.has_anchor(anchor) {
            debug!(anchor, "nav: scroll target not rendered");
            return NavOutcome::TargetMissing;
        }
        self.host.smooth_scroll_to(anchor);
        NavOutcome::Scrolled {
            anchor: anchor.to_string(),
            closed_menu: false,
        }
    }
}

#[derive(Default)]
struct RenderedPageState {
    anchors: HashSet<String>,
    scroll_target: Option<String>,
}

/// In-memory scroll host: the set of rendered anchors plus the anchor the
/// viewport last scrolled to.
#[derive(Default)]
pub struct RenderedPage {
    inner: Mutex<RenderedPageState>,
}

impl RenderedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sections(sections: impl IntoIterator<Item = SectionId>) -> Self {
        let page = Self::new();
        for section in sections {
            page.render(section.anchor());
        }
        page
    }

    fn state(&self) -> MutexGuard<'_, RenderedPageState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render(&self, anchor: impl Into<String>) {
        self.state().anchors.insert(anchor.into());
    }

    pub fn remove(&self, anchor: &str) -> bool {
        self.state().anchors.remove(anchor)
    }

    pub fn scroll_target(&self) -> Option<String> {
        self.state().scroll_target.clone()
    }
}

impl ScrollHost for RenderedPage {
    fn has_anchor(&self, anchor: &str) -> bool {
        self.state().anchors.contains(anchor)
    }

    fn smooth_scroll_to(&self, anchor: &str) {
        self.state().scroll_target = Some(anchor.to_string());
    }
}

#[cfg(test)]
#[path = "tests/nav_tests.rs"]
mod tests;
