//! Whole-town integration tests driven by the offline cognition

use std::sync::Arc;

use chrono::NaiveDate;

use hamlet::agent::schedule::{total, MINUTES_PER_DAY};
use hamlet::agent::Action;
use hamlet::cognition::{Cognition, ScriptedCognition};
use hamlet::core::config::SimulationConfig;
use hamlet::core::event::Event;
use hamlet::core::types::TileCoord;
use hamlet::demo::{demo_residents, demo_town};
use hamlet::memory::MemoryKind;
use hamlet::simulation::{step, AgentSpawn, World};

fn config_at(hour: u32) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.start_time = NaiveDate::from_ymd_opt(2023, 2, 13)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap();
    config.seconds_per_step = 60;
    config
}

fn cafe_day() -> Vec<String> {
    (0..24)
        .map(|h| match h {
            0..=7 | 23 => "sleeping".to_string(),
            _ => "drinking coffee at the cafe".to_string(),
        })
        .collect()
}

fn world_with(config: SimulationConfig, cognition: Arc<ScriptedCognition>) -> World {
    let cognition: Arc<dyn Cognition> = cognition;
    World::new(config, demo_town().unwrap(), cognition)
}

fn spawn_at(world: &mut World, index: usize, tile: TileCoord) -> String {
    let mut spawn: AgentSpawn = demo_residents().remove(index);
    spawn.tile = Some(tile);
    let name = spawn.identity.name.clone();
    world.spawn(spawn).unwrap();
    name
}

#[tokio::test]
async fn test_schedules_cover_the_day_while_running() {
    let cognition = Arc::new(ScriptedCognition::new());
    let mut world = world_with(config_at(6), cognition);
    for spawn in demo_residents() {
        world.spawn(spawn).unwrap();
    }

    for _ in 0..180 {
        let snapshot = step(&mut world).await.unwrap();
        assert_eq!(snapshot.agents.len(), 3);
        for agent in &world.agents {
            assert_eq!(total(&agent.scratch.schedule.daily), MINUTES_PER_DAY);
            assert!(world.maze.is_walkable(agent.scratch.curr_tile));
        }
        for agent in &snapshot.agents {
            assert!(!agent.activity.is_empty());
            assert!(!agent.location.is_empty());
        }
    }
    assert_eq!(world.clock.step(), 180);
    for agent in &world.agents {
        assert!(agent.scratch.action.is_some());
        let plans = world.memory(agent.name()).unwrap().retrieve_by_type(MemoryKind::Plan);
        assert_eq!(plans.len(), 1);
    }
}

#[tokio::test]
async fn test_idle_surroundings_are_never_rated() {
    let cognition = Arc::new(ScriptedCognition::new());
    let mut world = world_with(config_at(3), cognition.clone());
    let home = world.maze.spawn_tile("isabella-home").unwrap();
    let name = spawn_at(&mut world, 0, home);

    step(&mut world).await.unwrap();

    let memory = world.memory(&name).unwrap();
    assert!(!memory.is_empty());
    assert!(memory.iter().filter(|m| m.event.is_idle()).all(|m| m.poignancy == 0.1));
    assert_eq!(cognition.calls("rate_poignancy"), 0);
}

#[tokio::test]
async fn test_same_event_on_two_tiles_is_stored_once() {
    let cognition = Arc::new(ScriptedCognition::new());
    let mut config = config_at(10);
    config.attention_bandwidth = 10;
    let mut world = world_with(config, cognition);
    let name = spawn_at(&mut world, 0, TileCoord::new(15, 3));

    let spilled = Event::new("the Ville:Hobbs Cafe:cafe:coffee", "is", "spilled", "coffee is spilled");
    world.maze.add_event(TileCoord::new(16, 3), spilled.clone()).unwrap();
    world.maze.add_event(TileCoord::new(15, 4), spilled.clone()).unwrap();
    step(&mut world).await.unwrap();

    let stored = world
        .memory(&name)
        .unwrap()
        .iter()
        .filter(|m| m.event.spo_summary() == spilled.spo_summary())
        .count();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn test_exhausted_importance_triggers_reflection() {
    let cognition = Arc::new(ScriptedCognition::new().with_poignancy(10));
    let mut config = config_at(10);
    config.reflection_trigger_max = 255;
    config.attention_bandwidth = 40;
    let mut world = world_with(config, cognition.clone());
    let here = TileCoord::new(15, 3);
    let name = spawn_at(&mut world, 0, here);

    // 30 events at full importance: 30 * 1.0 * 10 >= 255
    for i in 0..30 {
        let subject = format!("the Ville:Hobbs Cafe:cafe:cup {}", i);
        let event = Event::new(&subject, "is", "steaming", format!("cup {} is steaming", i));
        world.maze.add_event(here, event).unwrap();
    }
    step(&mut world).await.unwrap();

    let agent = world.agent(&name).unwrap();
    assert_eq!(agent.scratch.reflection.trigger, 255);
    assert_eq!(cognition.calls("reflection_points"), 1);
    let thoughts = world.memory(&name).unwrap().retrieve_by_type(MemoryKind::Thought);
    assert!(!thoughts.is_empty());
}

#[tokio::test]
async fn test_unknown_address_still_moves_to_a_valid_tile() {
    let cognition = Arc::new(ScriptedCognition::new());
    let mut world = world_with(config_at(10), cognition);
    let start = TileCoord::new(15, 3);
    let name = spawn_at(&mut world, 0, start);
    let now = world.clock.now();

    let description = "looking for the library".to_string();
    world.agents[0].scratch.set_action(Action {
        address: "the Ville:Oak Hill College:library:bookshelf".into(),
        start_time: now,
        duration: 60,
        emoji: "📚".into(),
        event: Event::new(&name, "is", "looking for the library", &description),
        description,
        object: None,
        conversation: None,
    });

    let snapshot = step(&mut world).await.unwrap();
    let me = snapshot.agent(&name).unwrap();
    let tile = TileCoord::new(me.col, me.row);
    assert!(world.maze.is_walkable(tile));
    assert!(tile.chebyshev(&start) <= 1);
    assert!(me.activity.starts_with("looking for the library @"));
}

#[tokio::test]
async fn test_neighbours_talk_then_cool_down() {
    let cognition = Arc::new(
        ScriptedCognition::new()
            .with_talk_decision(true)
            .with_chat_length(4)
            .with_hourly_schedule(cafe_day()),
    );
    let mut world = world_with(config_at(10), cognition.clone());
    let isabella = spawn_at(&mut world, 0, TileCoord::new(15, 3));
    let klaus = spawn_at(&mut world, 1, TileCoord::new(17, 3));

    let mut chatted = false;
    for _ in 0..60 {
        let snapshot = step(&mut world).await.unwrap();
        chatted |= snapshot.agents.iter().any(|a| a.activity.contains("conversing with"));
        if world.memory(&isabella).unwrap().last_conversation_with(&klaus).is_some()
            && world.conversations.is_empty()
        {
            break;
        }
    }
    assert!(chatted);

    let chat = world.memory(&isabella).unwrap().last_conversation_with(&klaus).unwrap();
    assert!(chat.conversation_ended());
    assert!(chat.filling.turns().len() <= 4);
    assert!(world.memory(&klaus).unwrap().last_conversation_with(&isabella).is_some());

    let a = &world.agent(&isabella).unwrap().scratch;
    let b = &world.agent(&klaus).unwrap().scratch;
    assert!(a.chat.in_buffer(&klaus));
    assert!(b.chat.in_buffer(&isabella));
    assert_eq!(total(&a.schedule.daily), MINUTES_PER_DAY);
    assert_eq!(total(&b.schedule.daily), MINUTES_PER_DAY);

    // The cooldown keeps them from starting again right away
    let started = cognition.calls("run_conversation_turn");
    for _ in 0..5 {
        step(&mut world).await.unwrap();
    }
    assert_eq!(cognition.calls("run_conversation_turn"), started);
}
