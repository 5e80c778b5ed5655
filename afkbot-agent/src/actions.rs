//! Idle action catalog: one function per [`IdleAction`], dispatched by
//! [`perform`].
//!
//! Actions only use the [`GameSession`] capability. A missing target (no
//! block to dig, nothing to drop) is [`ActionOutcome::Skipped`], not an
//! error; errors are reserved for capability calls that fail.

use std::f64::consts::{FRAC_PI_2, PI};

// ---

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

// ---

use afkbot_domain::{
    // ---
    ActionOutcome,
    Block,
    BlockPos,
    ControlKey,
    EntityKind,
    GameSession,
    IdleAction,
    Item,
    Result,
};

// ---

const MINE_RADIUS: f64 = 6.0;
const PLACE_RADIUS: f64 = 5.0;
const CONTAINER_RADIUS: f64 = 4.0;
const ENTITY_RADIUS: f64 = 8.0;

/// Ticks a container stays open.
const CONTAINER_HOLD_TICKS: u32 = 40;
const JUMP_TICKS: u32 = 5;
const HOTBAR_SLOTS: u8 = 9;

const PLACEABLE: &[&str] = &["dirt", "cobblestone", "planks"];
const CONTAINERS: &[&str] = &["chest", "furnace", "crafting_table"];
/// Substring match, so `axe` also covers `pickaxe`.
const KEEP_ON_DROP: &[&str] = &["sword", "axe", "shovel", "hoe", "armor", "helmet", "chestplate", "leggings", "boots"];
const CONSUMABLE: &[&str] = &[
    "food", "potion", "bread", "apple", "carrot", "potato", "beef", "porkchop", "chicken", "mutton",
    "cod", "salmon", "stew", "cookie", "melon_slice", "pie",
];

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn perform(action: IdleAction, session: &dyn GameSession, rng: &mut StdRng) -> Result<ActionOutcome> {
    // ---
    match action {
        IdleAction::Jump => hold(session, &[ControlKey::Jump], JUMP_TICKS).await,
        IdleAction::Sneak => toggle_sneak(session),
        IdleAction::LookAround => look_around(session, rng).await,
        IdleAction::SwingArm => {
            session.swing_arm();
            Ok(ActionOutcome::Performed)
        }
        IdleAction::WalkRandomly => {
            let key = *[ControlKey::Forward, ControlKey::Back, ControlKey::Left, ControlKey::Right]
                .choose(rng)
                .unwrap_or(&ControlKey::Forward);
            hold(session, &[key], rng.gen_range(10..30)).await
        }
        IdleAction::SprintForward => hold(session, &[ControlKey::Forward, ControlKey::Sprint], rng.gen_range(20..60)).await,
        IdleAction::ToggleWalk => {
            let key = if rng.gen_bool(0.5) { ControlKey::Forward } else { ControlKey::Back };
            hold(session, &[key], rng.gen_range(10..50)).await
        }
        IdleAction::MineBlockRandomly => mine_nearby_block(session).await,
        IdleAction::PlaceBlockRandomly => place_block_from_inventory(session).await,
        IdleAction::UseItem => consume_item(session).await,
        IdleAction::SwitchHotbar => switch_active_slot(session, rng),
        IdleAction::DropItem => drop_surplus_item(session, rng).await,
        IdleAction::InteractWithEntity => look_at_nearest_entity(session).await,
        IdleAction::OpenContainer => open_and_close_container(session).await,
    }
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Press `keys`, wait `ticks`, release. Keys are released even when the wait
/// fails so an ended session never leaves a control latched.
async fn hold(session: &dyn GameSession, keys: &[ControlKey], ticks: u32) -> Result<ActionOutcome> {
    // ---
    for key in keys {
        session.set_control(*key, true);
    }
    let waited = session.wait_ticks(ticks).await;
    for key in keys {
        session.set_control(*key, false);
    }
    waited?;

    tracing::debug!(?keys, ticks, "held controls");
    Ok(ActionOutcome::Performed)
}

fn toggle_sneak(session: &dyn GameSession) -> Result<ActionOutcome> {
    // ---
    let on = !session.control_state(ControlKey::Sneak);
    session.set_control(ControlKey::Sneak, on);
    Ok(ActionOutcome::Performed)
}

async fn look_around(session: &dyn GameSession, rng: &mut StdRng) -> Result<ActionOutcome> {
    // ---
    let yaw = rng.gen_range(0.0..2.0 * PI);
    let pitch = rng.gen_range(-FRAC_PI_2..FRAC_PI_2);
    session.look(yaw, pitch).await?;
    Ok(ActionOutcome::Performed)
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

async fn mine_nearby_block(session: &dyn GameSession) -> Result<ActionOutcome> {
    // ---
    let Some(origin) = session.position() else {
        return Ok(skipped("position unknown"));
    };
    let target = session.find_block(MINE_RADIUS, &|b: &Block| {
        !b.is_air() && session.can_dig(b) && origin.distance_to(b.pos.center()) < MINE_RADIUS
    });
    let Some(block) = target else {
        return Ok(skipped("no diggable block nearby"));
    };

    tracing::info!(block = %block.name, x = block.pos.x, y = block.pos.y, z = block.pos.z, "digging block");
    session.dig(&block).await?;
    tracing::info!(block = %block.name, "dug block");
    Ok(ActionOutcome::Performed)
}

// ---

async fn place_block_from_inventory(session: &dyn GameSession) -> Result<ActionOutcome> {
    // ---
    let Some(item) = session
        .inventory()
        .into_iter()
        .find(|i| PLACEABLE.iter().any(|p| i.name.contains(p)))
    else {
        return Ok(skipped("no dirt, cobblestone or planks in inventory"));
    };
    let Some(origin) = session.position() else {
        return Ok(skipped("position unknown"));
    };

    // Below, front, right, back, left.
    let candidates = [
        origin.offset(0.0, -1.0, 0.0),
        origin.offset(0.0, 0.0, 1.0),
        origin.offset(1.0, 0.0, 0.0),
        origin.offset(0.0, 0.0, -1.0),
        origin.offset(-1.0, 0.0, 0.0),
    ];

    let spot = candidates.iter().map(|v| v.floored()).find_map(|pos| {
        let here = session.block_at(pos)?;
        let below = session.block_at(pos.below())?;
        let open = here.is_air() && !below.is_air() && origin.distance_to(pos.center()) < PLACE_RADIUS;
        open.then_some((pos, below))
    });
    let Some((pos, reference)) = spot else {
        return Ok(skipped("no free cell with support to place on"));
    };

    tracing::info!(block = %item.name, x = pos.x, y = pos.y, z = pos.z, "placing block");
    session.equip(&item).await?;
    session.place_block(&reference, BlockPos::new(0, 1, 0)).await?;
    tracing::info!(block = %item.name, "placed block");
    Ok(ActionOutcome::Performed)
}

// ---

async fn open_and_close_container(session: &dyn GameSession) -> Result<ActionOutcome> {
    // ---
    let found = session.find_block(CONTAINER_RADIUS, &|b: &Block| CONTAINERS.iter().any(|c| b.name.contains(c)));
    let Some(block) = found else {
        return Ok(skipped("no chest, furnace or crafting table nearby"));
    };

    tracing::info!(container = %block.name, x = block.pos.x, y = block.pos.y, z = block.pos.z, "opening container");
    session.open_container(&block).await?;
    let waited = session.wait_ticks(CONTAINER_HOLD_TICKS).await;
    let closed = session.close_container().await;
    waited?;
    closed?;
    tracing::info!(container = %block.name, "closed container");
    Ok(ActionOutcome::Performed)
}

// ---

async fn look_at_nearest_entity(session: &dyn GameSession) -> Result<ActionOutcome> {
    // ---
    let Some(origin) = session.position() else {
        return Ok(skipped("position unknown"));
    };
    let entity = session.nearest_entity().filter(|e| {
        matches!(e.kind, EntityKind::Player | EntityKind::Mob) && origin.distance_to(e.position) <= ENTITY_RADIUS
    });
    let Some(entity) = entity else {
        return Ok(skipped("no player or mob nearby"));
    };

    let label = entity.name.clone().unwrap_or_else(|| format!("{:?}", entity.kind).to_lowercase());
    tracing::info!(entity = %label, "looking at entity");
    session.look_at(entity.position.offset(0.0, entity.height, 0.0)).await?;
    Ok(ActionOutcome::Performed)
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

async fn consume_item(session: &dyn GameSession) -> Result<ActionOutcome> {
    // ---
    let Some(item) = session
        .inventory()
        .into_iter()
        .find(|i| CONSUMABLE.iter().any(|c| i.name.contains(c)))
    else {
        return Ok(skipped("no food or potion in inventory"));
    };

    tracing::info!(item = %item.name, "using item");
    session.equip(&item).await?;
    session.consume().await?;
    Ok(ActionOutcome::Performed)
}

// ---

fn switch_active_slot(session: &dyn GameSession, rng: &mut StdRng) -> Result<ActionOutcome> {
    // ---
    let current = session.selected_slot();
    let mut slot = rng.gen_range(0..HOTBAR_SLOTS);
    if slot == current {
        slot = (slot + 1) % HOTBAR_SLOTS;
    }
    tracing::info!(from = current + 1, to = slot + 1, "switching hotbar slot");
    session.set_selected_slot(slot);
    Ok(ActionOutcome::Performed)
}

// ---

async fn drop_surplus_item(session: &dyn GameSession, rng: &mut StdRng) -> Result<ActionOutcome> {
    // ---
    let surplus: Vec<Item> = session
        .inventory()
        .into_iter()
        .filter(|i| i.count > 1 && !KEEP_ON_DROP.iter().any(|k| i.name.contains(k)))
        .collect();
    let Some(item) = surplus.choose(rng) else {
        return Ok(skipped("no surplus stack to drop"));
    };

    tracing::info!(item = %item.name, count = item.count, "dropping stack");
    session.drop_item(item, item.count).await?;
    Ok(ActionOutcome::Performed)
}

// ---

fn skipped(why: &str) -> ActionOutcome {
    ActionOutcome::Skipped(why.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use std::sync::Arc;

    use rand::SeedableRng;

    use afkbot_domain::{AuthMode, ConnectOptions, Entity, GameClient, Vec3};
    use afkbot_sim::{SimCall, SimClient, SimConfig, SimSession, SimWorld};

    use super::*;

    fn online(world: SimWorld) -> (SimClient, Arc<SimSession>) {
        // ---
        let client = SimClient::new(SimConfig {
            world,
            ..SimConfig::manual()
        });
        client
            .connect(ConnectOptions {
                host: "sim".into(),
                port: 25565,
                username: "Bot".into(),
                password: None,
                auth: AuthMode::Offline,
                version: None,
            })
            .unwrap();
        let sim = client.last_session().unwrap();
        sim.spawn();
        (client, sim)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[tokio::test(start_paused = true)]
    async fn jump_releases_key_after_wait() {
        // ---
        let (_c, sim) = online(SimWorld::flat());
        let out = perform(IdleAction::Jump, sim.as_ref(), &mut rng()).await.unwrap();

        assert_eq!(out, ActionOutcome::Performed);
        assert_eq!(
            sim.calls(),
            vec![
                SimCall::SetControl(ControlKey::Jump, true),
                SimCall::WaitTicks(JUMP_TICKS),
                SimCall::SetControl(ControlKey::Jump, false),
            ]
        );
        assert!(!sim.control_state(ControlKey::Jump));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn hold_releases_keys_when_session_ends_mid_wait() {
        // ---
        let (_c, sim) = online(SimWorld::flat());
        let s = Arc::clone(&sim);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            s.end("socketClosed");
        });

        let res = perform(IdleAction::SprintForward, sim.as_ref(), &mut rng()).await;
        assert!(res.is_err());
        assert!(!sim.control_state(ControlKey::Forward));
        assert!(!sim.control_state(ControlKey::Sprint));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn world_actions_succeed_in_flat_world() {
        // ---
        let (_c, sim) = online(SimWorld::flat());
        let mut rng = rng();

        for action in [
            IdleAction::MineBlockRandomly,
            IdleAction::PlaceBlockRandomly,
            IdleAction::UseItem,
            IdleAction::DropItem,
            IdleAction::InteractWithEntity,
            IdleAction::OpenContainer,
            IdleAction::LookAround,
        ] {
            let out = perform(action, sim.as_ref(), &mut rng).await.unwrap();
            assert_eq!(out, ActionOutcome::Performed, "{action} did not run");
        }

        let calls = sim.calls();
        assert!(calls.iter().any(|c| matches!(c, SimCall::Dig(_))));
        assert!(calls.iter().any(|c| matches!(c, SimCall::Place(_))));
        assert!(calls.contains(&SimCall::Consume("bread".into())));
        assert!(calls.contains(&SimCall::CloseContainer));
        assert!(!calls.iter().any(|c| matches!(c, SimCall::Drop { name, .. } if name.contains("pickaxe"))));
    }

    // ---

    #[tokio::test(start_paused = true)]
    async fn missing_targets_are_skipped_not_errors() {
        // ---
        let (_c, sim) = online(SimWorld::empty());
        let mut rng = rng();

        for action in [
            IdleAction::MineBlockRandomly,
            IdleAction::PlaceBlockRandomly,
            IdleAction::UseItem,
            IdleAction::DropItem,
            IdleAction::InteractWithEntity,
            IdleAction::OpenContainer,
        ] {
            let out = perform(action, sim.as_ref(), &mut rng).await.unwrap();
            assert!(matches!(out, ActionOutcome::Skipped(_)), "{action} should skip");
        }
        assert!(sim.calls().is_empty());
    }

    // ---

    #[tokio::test]
    async fn distant_entities_are_not_looked_at() {
        // ---
        let mut world = SimWorld::empty();
        world.entities.push(Entity {
            name: Some("zombie".into()),
            kind: EntityKind::Mob,
            position: Vec3::new(500.0, 64.0, 500.0),
            height: 1.9,
        });
        let (_c, sim) = online(world);

        let out = perform(IdleAction::InteractWithEntity, sim.as_ref(), &mut rng()).await.unwrap();
        assert_eq!(out, ActionOutcome::Skipped("no player or mob nearby".into()));
        assert!(sim.calls().is_empty());
    }

    // ---

    #[test]
    fn pickaxes_are_never_dropped() {
        // ---
        for name in ["diamond_pickaxe", "iron_axe", "stone_sword", "iron_chestplate"] {
            assert!(KEEP_ON_DROP.iter().any(|k| name.contains(k)), "{name}");
        }
        assert!(!KEEP_ON_DROP.iter().any(|k| "cobblestone".contains(k)));
    }

    // ---

    #[tokio::test]
    async fn hotbar_switch_always_changes_slot() {
        // ---
        let (_c, sim) = online(SimWorld::flat());
        let mut rng = rng();

        for _ in 0..50 {
            let before = sim.selected_slot();
            perform(IdleAction::SwitchHotbar, sim.as_ref(), &mut rng).await.unwrap();
            let after = sim.selected_slot();
            assert_ne!(before, after);
            assert!(after < HOTBAR_SLOTS);
        }
    }
}
