//! A small built-in town so the binary runs without asset files
//!
//! 40 x 24 tiles, walled at the edges. A street runs across the middle:
//! north of it an apartment and Hobbs Cafe, south of it the college dorm
//! and Johnson Park.

use crate::agent::Identity;
use crate::core::error::Result;
use crate::maze::{Layer, Maze, MazeDefinition, Rect};
use crate::simulation::AgentSpawn;

pub const WORLD: &str = "the Ville";
pub const WIDTH: usize = 40;
pub const HEIGHT: usize = 24;

const APARTMENT: &str = "Isabella Rodriguez's apartment";
const CAFE: &str = "Hobbs Cafe";
const DORM: &str = "Dorm for Oak Hill College";
const PARK: &str = "Johnson Park";

pub fn demo_definition() -> MazeDefinition {
    let mut def = MazeDefinition::blank(WORLD, WIDTH, HEIGHT);
    def.paint(Layer::World, Rect::new(0, 0, WIDTH, HEIGHT), WORLD);

    // Outer walls
    def.block(Rect::new(0, 0, WIDTH, 1))
        .block(Rect::new(0, HEIGHT - 1, WIDTH, 1))
        .block(Rect::new(0, 0, 1, HEIGHT))
        .block(Rect::new(WIDTH - 1, 0, 1, HEIGHT));

    def.paint(Layer::Sector, Rect::new(1, 1, 10, 7), APARTMENT)
        .paint(Layer::Arena, Rect::new(1, 1, 10, 7), "main room")
        .paint(Layer::GameObject, Rect::new(2, 2, 2, 1), "bed")
        .paint(Layer::GameObject, Rect::new(7, 2, 2, 1), "desk")
        .paint(Layer::GameObject, Rect::new(9, 6, 1, 1), "refrigerator")
        .paint(Layer::Spawn, Rect::new(3, 4, 1, 1), "isabella-home")
        .block(Rect::new(11, 0, 1, 9))
        .block(Rect::new(0, 8, 12, 1))
        .open(Rect::new(5, 8, 1, 1));

    def.paint(Layer::Sector, Rect::new(13, 1, 18, 7), CAFE)
        .paint(Layer::Arena, Rect::new(13, 1, 12, 7), "cafe")
        .paint(Layer::Arena, Rect::new(26, 1, 5, 7), "kitchen")
        .paint(Layer::GameObject, Rect::new(14, 2, 6, 1), "cafe counter")
        .paint(Layer::GameObject, Rect::new(14, 5, 4, 2), "cafe customer seating")
        .paint(Layer::GameObject, Rect::new(22, 6, 2, 1), "piano")
        .paint(Layer::GameObject, Rect::new(27, 2, 3, 1), "cooking area")
        .paint(Layer::GameObject, Rect::new(29, 6, 1, 1), "kitchen sink")
        .block(Rect::new(12, 0, 1, 9))
        .block(Rect::new(25, 0, 1, 9))
        .block(Rect::new(31, 0, 1, 9))
        .block(Rect::new(12, 8, 20, 1))
        .open(Rect::new(25, 4, 1, 1))
        .open(Rect::new(18, 8, 1, 1));

    def.paint(Layer::Sector, Rect::new(1, 12, 20, 10), DORM)
        .paint(Layer::Arena, Rect::new(1, 12, 6, 4), "Klaus Mueller's room")
        .paint(Layer::Arena, Rect::new(8, 12, 6, 4), "Maria Lopez's room")
        .paint(Layer::Arena, Rect::new(15, 12, 6, 4), "common room")
        .paint(Layer::Arena, Rect::new(1, 17, 20, 5), "common room")
        .paint(Layer::GameObject, Rect::new(2, 12, 2, 1), "bed")
        .paint(Layer::GameObject, Rect::new(5, 14, 1, 1), "desk")
        .paint(Layer::GameObject, Rect::new(9, 12, 2, 1), "bed")
        .paint(Layer::GameObject, Rect::new(12, 14, 1, 1), "desk")
        .paint(Layer::GameObject, Rect::new(3, 18, 3, 1), "common room sofa")
        .paint(Layer::GameObject, Rect::new(10, 19, 3, 1), "common room table")
        .paint(Layer::Spawn, Rect::new(3, 14, 1, 1), "klaus-home")
        .paint(Layer::Spawn, Rect::new(10, 14, 1, 1), "maria-home")
        .block(Rect::new(0, 11, 22, 1))
        .block(Rect::new(21, 11, 1, 13))
        .block(Rect::new(7, 12, 1, 4))
        .block(Rect::new(14, 12, 1, 4))
        .block(Rect::new(1, 16, 14, 1))
        .open(Rect::new(17, 11, 1, 1))
        .open(Rect::new(3, 16, 1, 1))
        .open(Rect::new(10, 16, 1, 1));

    def.paint(Layer::Sector, Rect::new(22, 11, 17, 12), PARK)
        .paint(Layer::Arena, Rect::new(22, 11, 17, 12), "park")
        .paint(Layer::GameObject, Rect::new(25, 13, 4, 3), "park garden")
        .paint(Layer::GameObject, Rect::new(32, 18, 3, 1), "park bench");

    def
}

pub fn demo_town() -> Result<Maze> {
    Maze::from_definition(&demo_definition())
}

fn living_area(sector: &str, arena: &str) -> String {
    format!("{}:{}:{}", WORLD, sector, arena)
}

pub fn demo_residents() -> Vec<AgentSpawn> {
    vec![
        AgentSpawn::at_location(
            Identity {
                name: "Isabella Rodriguez".into(),
                age: 34,
                innate: "friendly, outgoing, hospitable".into(),
                learned: "Isabella Rodriguez is a cafe owner of Hobbs Cafe who loves to make people feel welcome."
                    .into(),
                currently: "Isabella Rodriguez is planning on having a Valentine's Day party at Hobbs Cafe with her customers on February 14th, 2023 at 5pm."
                    .into(),
                lifestyle: "Isabella Rodriguez goes to bed around 11pm, awakes up around 6am.".into(),
                living_area: living_area(APARTMENT, "main room"),
            },
            "isabella-home",
        ),
        AgentSpawn::at_location(
            Identity {
                name: "Klaus Mueller".into(),
                age: 20,
                innate: "kind, inquisitive, passionate".into(),
                learned: "Klaus Mueller is a student at Oak Hill College studying sociology.".into(),
                currently: "Klaus Mueller is writing a research paper on the effects of gentrification in low-income communities."
                    .into(),
                lifestyle: "Klaus Mueller goes to bed around 11pm, awakes up around 7am, eats dinner around 5pm."
                    .into(),
                living_area: living_area(DORM, "Klaus Mueller's room"),
            },
            "klaus-home",
        ),
        AgentSpawn::at_location(
            Identity {
                name: "Maria Lopez".into(),
                age: 21,
                innate: "energetic, enthusiastic, inquisitive".into(),
                learned: "Maria Lopez is a student at Oak Hill College studying physics and a part time Twitch streamer."
                    .into(),
                currently: "Maria Lopez is working on her physics degree and streaming games on Twitch.".into(),
                lifestyle: "Maria Lopez goes to bed around 2am, awakes up around 9am, eats dinner around 6pm."
                    .into(),
                living_area: living_area(DORM, "Maria Lopez's room"),
            },
            "maria-home",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_resident_has_a_spawn_tile() {
        let maze = demo_town().unwrap();
        for spawn in demo_residents() {
            let location = spawn.location.as_deref().unwrap();
            let tile = maze.spawn_tile(location).unwrap();
            assert!(maze.is_walkable(tile));
            assert!(maze.has_address(&spawn.identity.living_area));
        }
    }

    #[test]
    fn test_buildings_are_connected() {
        let maze = demo_town().unwrap();
        let home = maze.spawn_tile("isabella-home").unwrap();
        for target in [
            "the Ville:Hobbs Cafe:kitchen:cooking area",
            "the Ville:Johnson Park:park:park bench",
            "the Ville:Dorm for Oak Hill College:Maria Lopez's room:desk",
        ] {
            let goal = maze.address_tiles(target).unwrap()[0];
            assert!(!maze.find_path(home, goal).is_empty(), "no path to {}", target);
        }
    }
}
