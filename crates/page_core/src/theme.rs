use shared::domain::ThemeMode;
use tracing::debug;

/// Class the renderer applies to the page root while dark mode is active.
pub const DARK_CLASS: &str = "dark";

/// Sole writer of the page's display mode. In-memory only; every page load
/// starts in light mode.
#[derive(Debug, Default)]
pub struct ThemeController {
    mode: ThemeMode,
}

impl ThemeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn is_dark(&self) -> bool {
        self.mode == ThemeMode::Dark
    }

    pub fn toggle(&mut self) -> ThemeMode {
        self.mode = self.mode.toggled();
        debug!(mode = ?self.mode, "theme: toggled");
        self.mode
    }

    pub fn root_class(&self) -> Option<&'static str> {
        self.is_dark().then_some(DARK_CLASS)
    }
}

#[cfg(test)]
#[path = "tests/theme_tests.rs"]
mod tests;
