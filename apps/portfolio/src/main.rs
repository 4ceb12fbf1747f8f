use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use page_core::{
    build_delivery, load_settings, load_settings_from, ContactEvent, DeliveryKind, NavOutcome,
    PageShell, PageSnapshot, RenderedPage,
};
use shared::{
    domain::{ContactField, SectionId, SubmissionStatus},
    protocol::ContactFields,
};
use tokio::time::{timeout, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use viewport::ManualObserver;

const SCROLL_STEP: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeliveryArg {
    Simulated,
    Relay,
}

impl From<DeliveryArg> for DeliveryKind {
    fn from(value: DeliveryArg) -> Self {
        match value {
            DeliveryArg::Simulated => DeliveryKind::Simulated,
            DeliveryArg::Relay => DeliveryKind::Relay,
        }
    }
}

/// Plays one scripted visit of the portfolio page and prints where it ends up.
#[derive(Parser, Debug)]
struct Args {
    /// Settings file; defaults to ./portfolio.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    delivery: Option<DeliveryArg>,
    #[arg(long, default_value = "Jane Doe")]
    name: String,
    #[arg(long, default_value = "jane@example.com")]
    email: String,
    #[arg(long, default_value = "Hello! I'd like to talk about a project.")]
    message: String,
    /// Print the final snapshot as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from(Some(path))?,
        None => load_settings()?,
    };
    if let Some(delivery) = args.delivery {
        settings.delivery = delivery.into();
    }
    let delivery = build_delivery(&settings).context("failed to set up contact delivery")?;

    let observer = Arc::new(ManualObserver::with_targets(
        SectionId::ALL.map(SectionId::anchor),
    ));
    let page = Arc::new(RenderedPage::with_sections(SectionId::ALL));
    let mut shell = PageShell::new(&settings, observer.clone(), page.clone(), delivery);
    shell.mount_all(Instant::now());

    for section in SectionId::ALL.into_iter().skip(1) {
        tokio::time::sleep(SCROLL_STEP).await;
        observer.report(section.anchor(), 0.6, Instant::now());
        shell.pump_visibility();
        info!(anchor = section.anchor(), "portfolio: scrolled past section");
    }

    shell.theme_mut().toggle();
    shell.nav_mut().toggle_menu();
    let contact_link = shell
        .nav()
        .links()
        .iter()
        .find(|link| link.anchor_key() == SectionId::Contact.anchor())
        .cloned()
        .context("navbar has no contact link")?;
    if let NavOutcome::TargetMissing = shell.nav_mut().activate(&contact_link) {
        warn!("portfolio: contact section is not rendered");
    }

    let fields = ContactFields::new(args.name, args.email, args.message);
    if let Err(err) = fields.validate() {
        bail!("contact form is not ready to send: {err}");
    }

    let Some(contact) = shell.contact() else {
        bail!("contact section is not mounted");
    };
    for field in ContactField::ALL {
        contact.update_field(field, fields.get(field)).await;
    }
    let mut events = contact.subscribe_events();
    let submission = contact.submit().await?;
    info!(%submission, "portfolio: message submitted");

    let wait = settings.simulated_latency + Duration::from_secs(30);
    let settled = timeout(wait, async {
        while let Ok(ContactEvent::StatusChanged { to, .. }) = events.recv().await {
            if matches!(to, SubmissionStatus::Success | SubmissionStatus::Error) {
                return Some(to);
            }
        }
        None
    })
    .await
    .context("timed out waiting for the contact delivery")?;
    info!(status = ?settled, "portfolio: delivery settled");

    let snapshot = shell.snapshot(Instant::now()).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

fn print_snapshot(snapshot: &PageSnapshot) {
    println!(
        "theme: {:?} (root class: {})",
        snapshot.theme,
        snapshot.root_class.unwrap_or("none")
    );
    println!("menu open: {}", snapshot.menu_open);
    println!("sections:");
    for section in &snapshot.sections {
        println!(
            "  #{:<13} {:?} {}/{} items, opacity {:.2}",
            section.anchor,
            section.state,
            section.visible_items,
            section.total_items,
            section.opacity
        );
    }
    println!("toasts:");
    if snapshot.toasts.is_empty() {
        println!("  (none)");
    }
    for toast in &snapshot.toasts {
        println!(
            "  [{:?}] {}: {} ({} ms left)",
            toast.level, toast.title, toast.description, toast.remaining_ms
        );
    }
    match &snapshot.contact {
        Some(contact) => {
            println!("contact: {:?} via {}", contact.status, contact.delivery);
            if let Some(err) = &contact.last_error {
                println!("  last error: {}", err.message);
            }
        }
        None => println!("contact: not mounted"),
    }
}
