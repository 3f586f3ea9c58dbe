//! Level definitions: platforms, hazards and the built-in map catalogue

use serde::{Deserialize, Serialize};

use super::geometry::Rect;

/// Axis a moving platform oscillates along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

/// How a platform's rectangle changes over match time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Kinetics {
    Static,
    /// Sinusoidal oscillation along one axis
    Moving {
        axis: Axis,
        amplitude: f32,
        /// Radians per second
        angular_speed: f32,
        phase: f32,
    },
    /// Solid for `duty_cycle` of every `period` seconds
    Toggle {
        period: f32,
        duty_cycle: f32,
        offset: f32,
    },
    /// Circular orbit around the platform's rest position
    Rotate {
        angular_speed: f32,
        radius: f32,
        phase: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub rect: Rect,
    pub kinetics: Kinetics,
}

impl Platform {
    pub const fn fixed(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            rect: Rect::new(x, y, width, height),
            kinetics: Kinetics::Static,
        }
    }

    pub const fn kinetic(rect: Rect, kinetics: Kinetics) -> Self {
        Self { rect, kinetics }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    Lava,
    Laser,
    Spike,
}

/// Decorative danger zone. Rendered only; never collided against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub rect: Rect,
    pub kind: HazardKind,
}

/// A selectable level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    pub id: u32,
    pub name: String,
    pub platforms: Vec<Platform>,
    pub hazards: Vec<Hazard>,
    /// When false the arena has no floor and falling out eliminates
    pub solid_floor: bool,
}

/// Every built-in map starts with this ledge under the spawn point
const START_LEDGE: Platform = Platform::fixed(0.0, 572.0, 160.0, 20.0);
/// And ends with this one inside the goal region
const GOAL_LEDGE: Platform = Platform::fixed(1180.0, 420.0, 100.0, 20.0);

/// The maps offered during map selection, in `!1`..`!N` order
pub fn catalogue() -> Vec<Map> {
    vec![warmup_steps(), sky_gaps(), clockwork()]
}

fn warmup_steps() -> Map {
    Map {
        id: 1,
        name: "Warmup Steps".to_string(),
        platforms: vec![
            START_LEDGE,
            Platform::fixed(200.0, 640.0, 160.0, 20.0),
            Platform::fixed(400.0, 570.0, 160.0, 20.0),
            Platform::fixed(600.0, 500.0, 160.0, 20.0),
            Platform::fixed(800.0, 440.0, 160.0, 20.0),
            Platform::fixed(1000.0, 430.0, 140.0, 20.0),
            GOAL_LEDGE,
        ],
        hazards: vec![Hazard {
            rect: Rect::new(400.0, 700.0, 300.0, 20.0),
            kind: HazardKind::Lava,
        }],
        solid_floor: true,
    }
}

fn sky_gaps() -> Map {
    Map {
        id: 2,
        name: "Sky Gaps".to_string(),
        platforms: vec![
            START_LEDGE,
            Platform::fixed(230.0, 560.0, 120.0, 20.0),
            Platform::fixed(420.0, 520.0, 110.0, 20.0),
            Platform::fixed(600.0, 480.0, 110.0, 20.0),
            Platform::fixed(790.0, 450.0, 100.0, 20.0),
            Platform::fixed(980.0, 430.0, 110.0, 20.0),
            GOAL_LEDGE,
        ],
        hazards: vec![Hazard {
            rect: Rect::new(0.0, 700.0, 1280.0, 20.0),
            kind: HazardKind::Spike,
        }],
        solid_floor: false,
    }
}

fn clockwork() -> Map {
    Map {
        id: 3,
        name: "Clockwork".to_string(),
        platforms: vec![
            START_LEDGE,
            Platform::kinetic(
                Rect::new(250.0, 600.0, 120.0, 20.0),
                Kinetics::Moving {
                    axis: Axis::X,
                    amplitude: 60.0,
                    angular_speed: 1.2,
                    phase: 0.0,
                },
            ),
            Platform::kinetic(
                Rect::new(450.0, 540.0, 120.0, 20.0),
                Kinetics::Toggle {
                    period: 3.0,
                    duty_cycle: 0.6,
                    offset: 0.0,
                },
            ),
            Platform::kinetic(
                Rect::new(680.0, 480.0, 100.0, 20.0),
                Kinetics::Rotate {
                    angular_speed: 0.8,
                    radius: 40.0,
                    phase: 0.0,
                },
            ),
            Platform::kinetic(
                Rect::new(900.0, 450.0, 110.0, 20.0),
                Kinetics::Moving {
                    axis: Axis::Y,
                    amplitude: 30.0,
                    angular_speed: 1.5,
                    phase: std::f32::consts::FRAC_PI_2,
                },
            ),
            GOAL_LEDGE,
        ],
        hazards: vec![Hazard {
            rect: Rect::new(600.0, 300.0, 10.0, 120.0),
            kind: HazardKind::Laser,
        }],
        solid_floor: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_ids_match_selection_tokens() {
        let maps = catalogue();
        for (idx, map) in maps.iter().enumerate() {
            assert_eq!(map.id as usize, idx + 1, "map {} out of order", map.name);
        }
    }

    #[test]
    fn every_map_has_start_and_goal_ledges() {
        for map in catalogue() {
            assert_eq!(map.platforms.first(), Some(&START_LEDGE));
            assert_eq!(map.platforms.last(), Some(&GOAL_LEDGE));
        }
    }

    #[test]
    fn only_clockwork_uses_kinetic_platforms() {
        for map in catalogue() {
            let kinetic = map
                .platforms
                .iter()
                .any(|p| !matches!(p.kinetics, Kinetics::Static));
            assert_eq!(kinetic, map.id == 3);
        }
    }

    #[test]
    fn kinetics_serialize_with_kind_tag() {
        let json = serde_json::to_value(Kinetics::Toggle {
            period: 2.0,
            duty_cycle: 0.5,
            offset: 0.0,
        })
        .unwrap();
        assert_eq!(json["kind"], "toggle");
    }
}
