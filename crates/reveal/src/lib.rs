//! Scroll-triggered reveal orchestration: section visibility state machines,
//! staggered child reveals, and the motion runner that turns elapsed time into
//! visual state.

pub mod engine;
pub mod motion;
pub mod presets;

pub use engine::{AnimationItem, RevealEngine, RevealEvent, RevealTrigger, SectionFrame, SectionSpec, StaggerSpec};
pub use motion::{Easing, MotionSpec, MotionState};
