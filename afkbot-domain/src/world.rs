//! World-query vocabulary used by idle actions.
//!
//! These are deliberately thin: the agent never interprets game rules, it
//! only matches on names and positions the client reports.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Vec3 / BlockPos
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec3 {
    // ---
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// ---

impl Vec3 {
    // ---
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn distance_to(self, other: Vec3) -> f64 {
        // ---
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn floored(self) -> BlockPos {
        BlockPos::new(self.x.floor() as i32, self.y.floor() as i32, self.z.floor() as i32)
    }

    /// Round each axis to two decimals, as reported on the status endpoint.
    pub fn rounded(self) -> Self {
        // ---
        let r = |v: f64| (v * 100.0).round() / 100.0;
        Self::new(r(self.x), r(self.y), r(self.z))
    }
}

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockPos {
    // ---
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

// ---

impl BlockPos {
    // ---
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// Centre of the block, for distance checks against entity positions.
    pub fn center(self) -> Vec3 {
        Vec3::new(self.x as f64 + 0.5, self.y as f64 + 0.5, self.z as f64 + 0.5)
    }
}

// ---------------------------------------------------------------------------
// Block / Item / Entity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    // ---
    pub name: String,
    pub pos: BlockPos,
}

// ---

impl Block {
    // ---
    pub fn new(name: impl Into<String>, pos: BlockPos) -> Self {
        Self {
            name: name.into(),
            pos,
        }
    }

    pub fn is_air(&self) -> bool {
        self.name.contains("air")
    }
}

// ---

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    // ---
    pub name: String,
    pub count: u32,

    /// Inventory slot the item occupies.
    pub slot: u16,
}

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    // ---
    Player,
    Mob,
    Object,
    Other,
}

// ---

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    // ---
    pub name: Option<String>,
    pub kind: EntityKind,
    pub position: Vec3,
    pub height: f64,
}

// ---------------------------------------------------------------------------
// ControlKey
// ---------------------------------------------------------------------------

/// Movement control states the client can hold down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlKey {
    // ---
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    Sneak,
}
