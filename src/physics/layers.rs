//! Physics domain: named collision layers and the per-body masks built from them.

use avian2d::prelude::*;
use serde::{Deserialize, Serialize};

/// Physics layers for collision filtering.
#[derive(PhysicsLayer, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameLayer {
    #[default]
    Default,
    /// Solid terrain, blocks in every direction
    Terrain,
    /// One-way platforms, only solid from above
    PassThroughBottom,
    /// Level containment, only tested by players
    Boundaries,
    /// Climbable regions, never physically blocking
    Ladder,
    /// Player characters
    Player,
    /// Enemy characters
    Enemy,
}

pub fn layer_bits(layer: GameLayer) -> u32 {
    layer.to_bits()
}

pub fn mask_contains(mask: LayerMask, layer: GameLayer) -> bool {
    mask.0 & layer.to_bits() != 0
}

pub fn mask_of(layers: &[GameLayer]) -> LayerMask {
    LayerMask(layers.iter().fold(0, |bits, layer| bits | layer.to_bits()))
}

/// The two masks a body casts with: `solid` for sideways and upward rays,
/// `down` for rays toward the floor, which additionally sees one-way platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionMasks {
    pub solid: LayerMask,
    pub down: LayerMask,
}

impl Default for CollisionMasks {
    fn default() -> Self {
        Self {
            solid: mask_of(&[GameLayer::Terrain]),
            down: mask_of(&[GameLayer::Terrain, GameLayer::PassThroughBottom]),
        }
    }
}

impl CollisionMasks {
    /// Terrain also toggles one-way platforms in the downward mask.
    pub fn add(&mut self, layer: GameLayer) {
        self.solid.0 |= layer.to_bits();
        self.down.0 |= layer.to_bits();
        if layer == GameLayer::Terrain {
            self.down.0 |= GameLayer::PassThroughBottom.to_bits();
        }
    }

    pub fn remove(&mut self, layer: GameLayer) {
        self.solid.0 &= !layer.to_bits();
        self.down.0 &= !layer.to_bits();
        if layer == GameLayer::Terrain {
            self.down.0 &= !GameLayer::PassThroughBottom.to_bits();
        }
    }

    pub fn enable_one_way_platforms(&mut self) {
        self.down.0 |= GameLayer::PassThroughBottom.to_bits();
    }

    pub fn disable_one_way_platforms(&mut self) {
        self.down.0 &= !GameLayer::PassThroughBottom.to_bits();
    }

    pub fn one_way_platforms_enabled(&self) -> bool {
        mask_contains(self.down, GameLayer::PassThroughBottom)
    }
}
