//! Reveal behaviour of each page section.

use std::time::Duration;

use shared::domain::{RevealPolicy, SectionId};

use crate::{
    engine::{RevealTrigger, SectionSpec, StaggerSpec},
    motion::{Easing, MotionSpec},
};

const fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Fraction of the section that must be visible before it reveals.
pub fn threshold(section: SectionId) -> f32 {
    match section {
        SectionId::About | SectionId::Experience | SectionId::Services => 0.2,
        SectionId::Education | SectionId::Testimonials | SectionId::Contact => 0.3,
        SectionId::Hero | SectionId::Skills | SectionId::Projects => 0.0,
    }
}

pub fn stagger(section: SectionId) -> StaggerSpec {
    match section {
        SectionId::Hero => StaggerSpec::new(millis(200)).with_initial_delay(millis(400)),
        SectionId::About | SectionId::Experience | SectionId::Contact => {
            StaggerSpec::new(millis(200))
        }
        SectionId::Services => StaggerSpec::new(millis(150)),
        SectionId::Skills => StaggerSpec::new(millis(100)),
        SectionId::Education | SectionId::Projects | SectionId::Testimonials => {
            StaggerSpec::default()
        }
    }
}

fn section_motion(section: SectionId) -> MotionSpec {
    match section {
        SectionId::Hero => MotionSpec::fade_up(30.0).with_duration(millis(800)),
        SectionId::Education | SectionId::Testimonials => MotionSpec::fade_up(50.0),
        SectionId::About | SectionId::Skills | SectionId::Projects => MotionSpec::fade_up(20.0),
        SectionId::Experience | SectionId::Services | SectionId::Contact => MotionSpec::fade(),
    }
}

fn item_motion(section: SectionId) -> MotionSpec {
    match section {
        SectionId::About => MotionSpec::slide_in_x(-50.0),
        SectionId::Experience => MotionSpec::slide_in_x(-30.0).with_duration(millis(500)),
        SectionId::Services => MotionSpec::fade_up(30.0).with_duration(millis(500)),
        SectionId::Projects => MotionSpec::fade_up(30.0),
        SectionId::Contact => MotionSpec::fade_up(20.0).with_duration(millis(500)),
        SectionId::Hero | SectionId::Education | SectionId::Skills | SectionId::Testimonials => {
            MotionSpec::fade_up(20.0)
        }
    }
    .with_easing(Easing::EaseOut)
}

/// Registration spec for `section` with `item_count` staggered children.
/// The hero plays on mount; every other section reveals once when scrolled
/// into view.
pub fn section_spec(section: SectionId, item_count: usize) -> SectionSpec {
    let trigger = match section {
        SectionId::Hero => RevealTrigger::OnMount,
        _ => RevealTrigger::InView,
    };
    SectionSpec::new(section.anchor(), threshold(section), RevealPolicy::Once)
        .with_trigger(trigger)
        .with_motion(section_motion(section))
        .with_stagger(stagger(section))
        .with_uniform_items(item_count, item_motion(section))
}

#[cfg(test)]
#[path = "tests/presets_tests.rs"]
mod tests;
