//! Page-level state for the portfolio session: theme, navigation, toasts,
//! the contact form pipeline, and the shell that ties them to the reveal
//! engine.

pub mod config;
pub mod contact;
pub mod delivery;
pub mod nav;
pub mod shell;
pub mod theme;
pub mod toast;

pub use config::{build_delivery, load_settings, load_settings_from, DeliveryKind, Settings};
pub use contact::{ContactEvent, ContactPipeline, SubmitRejected};
pub use delivery::{DeliveryStrategy, RelayDelivery, SimulatedDelivery};
pub use nav::{NavOutcome, NavigationController, RenderedPage, ScrollHost};
pub use shell::{PageShell, PageSnapshot};
pub use theme::ThemeController;
pub use toast::{ToastDraft, ToastEvent, ToastNotification, ToastQueue};
