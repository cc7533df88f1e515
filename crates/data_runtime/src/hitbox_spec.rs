//! Serde-friendly hitbox descriptions compiled into `geom_core` shapes.

use geom_core::Hitbox;
use glam::Vec2;
use serde::Deserialize;

/// Shape description as written in definition TOML. Coordinates are local to
/// the object origin, before spawn transform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum HitboxSpec {
    Circle {
        #[serde(default)]
        center: [f32; 2],
        radius: f32,
    },
    Rect {
        min: [f32; 2],
        max: [f32; 2],
    },
    Polygon {
        points: Vec<[f32; 2]>,
    },
    Group {
        children: Vec<HitboxSpec>,
    },
}

impl HitboxSpec {
    #[must_use]
    pub fn compile(&self) -> Hitbox {
        match self {
            Self::Circle { center, radius } => Hitbox::circle(*radius, Vec2::from_array(*center)),
            Self::Rect { min, max } => Hitbox::Rect {
                min: Vec2::from_array(*min),
                max: Vec2::from_array(*max),
            },
            Self::Polygon { points } => Hitbox::Polygon {
                points: points.iter().copied().map(Vec2::from_array).collect(),
            },
            Self::Group { children } => Hitbox::Group {
                children: children.iter().map(Self::compile).collect(),
            },
        }
    }

    #[must_use]
    pub fn circle(radius: f32) -> Self {
        Self::Circle {
            center: [0.0, 0.0],
            radius,
        }
    }

    #[must_use]
    pub fn rect(min: [f32; 2], max: [f32; 2]) -> Self {
        Self::Rect { min, max }
    }
}
