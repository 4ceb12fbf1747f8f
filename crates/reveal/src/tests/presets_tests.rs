use super::*;

#[test]
fn every_section_reveals_once() {
    for section in SectionId::ALL {
        let spec = section_spec(section, 3);
        assert_eq!(spec.anchor, section.anchor());
        assert_eq!(spec.policy, RevealPolicy::Once);
        assert_eq!(spec.items.len(), 3);
        assert!((0.0..=1.0).contains(&spec.threshold));
    }
}

#[test]
fn hero_plays_on_mount_after_child_delay() {
    let spec = section_spec(SectionId::Hero, 2);
    assert_eq!(spec.trigger, RevealTrigger::OnMount);
    assert_eq!(spec.stagger.delay_for(0), Duration::from_millis(400));
    assert_eq!(spec.stagger.delay_for(1), Duration::from_millis(600));
}

#[test]
fn contact_waits_for_thirty_percent_and_staggers_children() {
    let spec = section_spec(SectionId::Contact, 3);
    assert_eq!(spec.trigger, RevealTrigger::InView);
    assert_eq!(spec.threshold, 0.3);
    assert_eq!(spec.stagger.delay_for(2), Duration::from_millis(400));
}
