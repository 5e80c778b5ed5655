use std::collections::BTreeMap;

// ---

use afkbot_domain::{Block, BlockPos, Entity, EntityKind, Item, Vec3};

// ---------------------------------------------------------------------------
// SimWorld
// ---------------------------------------------------------------------------

/// The slice of world a simulated session can see.
///
/// Blocks not present in `blocks` read back as `"air"`.
#[derive(Debug, Clone)]
pub struct SimWorld {
    // ---
    pub blocks: BTreeMap<BlockPos, String>,
    pub inventory: Vec<Item>,
    pub entities: Vec<Entity>,
    pub position: Vec3,
    pub health: f32,
    pub food: u32,
    pub players: usize,
}

// ---

impl SimWorld {
    // ---
    /// Nothing but the bot standing in the void.
    pub fn empty() -> Self {
        // ---
        Self {
            blocks: BTreeMap::new(),
            inventory: Vec::new(),
            entities: Vec::new(),
            position: Vec3::new(0.5, 64.0, 0.5),
            health: 20.0,
            food: 20,
            players: 1,
        }
    }

    // ---

    /// A 9x9 grass platform at y = 63 with a chest, a cow, and a starter
    /// inventory: every idle action finds a target here.
    pub fn flat() -> Self {
        // ---
        let mut world = Self::empty();
        for x in -4..=4 {
            for z in -4..=4 {
                world.set_block(BlockPos::new(x, 63, z), "grass_block");
            }
        }
        world.set_block(BlockPos::new(2, 64, 2), "chest");
        world.inventory = vec![
            item("dirt", 16, 36),
            item("bread", 5, 37),
            item("diamond_pickaxe", 1, 38),
        ];
        world.entities.push(Entity {
            name: Some("cow".into()),
            kind: EntityKind::Mob,
            position: Vec3::new(3.5, 64.0, 0.5),
            height: 1.4,
        });
        world.players = 3;
        world
    }

    // ---

    pub fn set_block(&mut self, pos: BlockPos, name: &str) {
        // ---
        if name == "air" {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, name.to_string());
        }
    }

    pub fn block_at(&self, pos: BlockPos) -> Block {
        // ---
        let name = self.blocks.get(&pos).map(String::as_str).unwrap_or("air");
        Block::new(name, pos)
    }

    /// Nearest non-air block within `max_distance` of the bot that satisfies
    /// `matching`.
    pub fn find_block(&self, max_distance: f64, matching: &dyn Fn(&Block) -> bool) -> Option<Block> {
        // ---
        self.blocks
            .iter()
            .map(|(pos, name)| Block::new(name.clone(), *pos))
            .map(|b| (self.position.distance_to(b.pos.center()), b))
            .filter(|(d, b)| *d <= max_distance && matching(b))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, b)| b)
    }

    pub fn nearest_entity(&self) -> Option<Entity> {
        // ---
        self.entities
            .iter()
            .min_by(|a, b| {
                let da = self.position.distance_to(a.position);
                let db = self.position.distance_to(b.position);
                da.total_cmp(&db)
            })
            .cloned()
    }
}

// ---

fn item(name: &str, count: u32, slot: u16) -> Item {
    Item {
        name: name.into(),
        count,
        slot,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
