//! End-to-end skirmish tests.
//!
//! Full engines on a simulated clock, checked only through the public
//! engine surface.

use exo_core::components::ColonyLevel;
use exo_core::events::EventCategory;
use exo_core::protocol::ServerMessage;
use exo_test_utils::fixtures::{self, ColonyBuilder, SKIRMISH_STEP, SKIRMISH_TICKS};
use glam::Vec3;

#[test]
fn aggressive_starport_conquers_defensive_colony() {
    let (mut engine, a, b) = fixtures::skirmish();

    let mut conquered = false;
    let mut conquest_events = Vec::new();
    for _ in 0..SKIRMISH_TICKS {
        engine.tick(SKIRMISH_STEP);
        conquest_events.extend(
            engine
                .get_action_events(b)
                .unwrap()
                .into_iter()
                .filter(|e| e.category == EventCategory::Conquest),
        );
        if engine.colony(b).unwrap().owner == a {
            conquered = true;
            break;
        }
    }

    assert!(conquered, "colony B still independent after {SKIRMISH_TICKS} ticks");
    let victim = engine.colony(b).unwrap();
    let victor = engine.colony(a).unwrap();
    assert_eq!(victim.owner, victor.owner);
    assert_eq!(victim.color, victor.color);
    assert!(victim.hp > 0.0);
    assert_eq!(victim.colony_level, ColonyLevel::Colony);
    assert_eq!(conquest_events.len(), 1);
    assert_eq!(engine.winner(), Some(a));
}

#[test]
fn skirmish_messages_carry_updates_and_actions() {
    let (mut engine, _, _) = fixtures::skirmish();
    let mut updates = 0;
    let mut actions = 0;
    for _ in 0..200 {
        engine.tick(SKIRMISH_STEP);
        for message in engine.messages() {
            match message {
                ServerMessage::Update { changes, .. } => {
                    assert!(!changes.is_empty());
                    updates += 1;
                }
                ServerMessage::Action { event } => {
                    assert!(!event.message.is_empty());
                    actions += 1;
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
    }
    assert!(updates > 0);
    assert!(actions > 0);
}

#[test]
fn event_ids_increase_across_ticks() {
    let (mut engine, a, _) = fixtures::skirmish();
    let mut ids = Vec::new();
    for _ in 0..400 {
        engine.tick(SKIRMISH_STEP);
        ids.extend(engine.get_action_events(a).unwrap().into_iter().map(|e| e.id));
    }
    assert!(!ids.is_empty());
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn pacifists_never_fight() {
    let mut engine = fixtures::engine();
    for (i, x) in [-80.0, 0.0, 80.0].into_iter().enumerate() {
        let spec = ColonyBuilder::new(&format!("Calm {i}"), Vec3::new(x, 0.0, 0.0))
            .with_trait(exo_core::components::ColonyTrait::Pacifist)
            .with_storage(5_000.0)
            .build();
        engine.create_colony(spec).unwrap();
    }
    fixtures::run_ticks(&mut engine, 600, 0.5);
    for colony in engine.colonies() {
        assert_eq!(colony.owner, colony.id);
        assert!(colony.colony_fleet.is_empty());
    }
    assert_eq!(engine.winner(), None);
}
