use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

// ---

use async_trait::async_trait;
use tokio::sync::mpsc;

// ---

use afkbot_domain::{
    // ---
    Block,
    BlockPos,
    BotError,
    ClientError,
    ControlKey,
    DisconnectReason,
    Entity,
    GameEvent,
    GameSession,
    Item,
    Result,
    Vec3,
};

// ---

use super::SimWorld;

// ---------------------------------------------------------------------------
// SimCall
// ---------------------------------------------------------------------------

/// One capability call, recorded in [`SimSession::calls`] so tests can
/// assert on what the agent actually did.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    // ---
    Chat(String),
    SetControl(ControlKey, bool),
    SwingArm,
    Look { yaw: f64, pitch: f64 },
    LookAt(Vec3),
    WaitTicks(u32),
    Dig(BlockPos),
    Place(BlockPos),
    Equip(String),
    Consume(String),
    Drop { name: String, count: u32 },
    SelectSlot(u8),
    OpenContainer(BlockPos),
    CloseContainer,
    ForceEnd(String),
    Quit(String),
}

// ---------------------------------------------------------------------------
// SimState
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SimState {
    // ---
    online: bool,
    ended: bool,
    world: SimWorld,
    controls: BTreeSet<ControlKey>,
    selected_slot: u8,
    held: Option<Item>,
    open_container: Option<BlockPos>,
    calls: Vec<SimCall>,
}

// ---------------------------------------------------------------------------
// SimSession
// ---------------------------------------------------------------------------

/// In-process mock session.
///
/// Lifecycle is driven either by [`crate::SimClient`]'s scripted task or
/// directly by tests through [`spawn`](Self::spawn), [`kick`](Self::kick),
/// [`end`](Self::end) and [`fail`](Self::fail).
pub struct SimSession {
    // ---
    username: String,
    version: String,
    tick: Duration,
    events_tx: mpsc::UnboundedSender<GameEvent>,
    state: Mutex<SimState>,
}

// ---

impl SimSession {
    // ---
    pub(crate) fn new(
        username: String,
        version: String,
        tick: Duration,
        world: SimWorld,
        events_tx: mpsc::UnboundedSender<GameEvent>,
    ) -> Self {
        // ---
        Self {
            username,
            version,
            tick,
            events_tx,
            state: Mutex::new(SimState {
                online: false,
                ended: false,
                world,
                controls: BTreeSet::new(),
                selected_slot: 0,
                held: None,
                open_container: None,
                calls: Vec::new(),
            }),
        }
    }

    // ---

    fn state(&self) -> MutexGuard<'_, SimState> {
        // A panic while holding the lock only happens in a failing test;
        // keep serving the data rather than cascading.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: GameEvent) {
        // Receiver gone means the agent discarded this session.
        let _ = self.events_tx.send(event);
    }

    fn record(&self, call: SimCall) {
        self.state().calls.push(call);
    }

    fn ensure_open(&self) -> Result<()> {
        // ---
        if self.state().ended {
            Err(BotError::SessionClosed)
        } else {
            Ok(())
        }
    }

    // --- scripted lifecycle ------------------------------------------------

    /// Complete the handshake: emits `Login` then `Spawned`.
    pub fn spawn(&self) {
        // ---
        {
            let mut st = self.state();
            if st.ended || st.online {
                return;
            }
            st.online = true;
        }
        self.emit(GameEvent::Login);
        self.emit(GameEvent::Spawned);
    }

    /// Server kick: emits `Kicked` then `Ended`.
    pub fn kick(&self, reason: impl Into<DisconnectReason>) {
        // ---
        let logged_in = {
            let st = self.state();
            if st.ended {
                return;
            }
            st.online
        };
        self.emit(GameEvent::Kicked {
            reason: reason.into(),
            logged_in,
        });
        self.end("kicked");
    }

    /// Transport failure: emits `Error` then `Ended`.
    pub fn fail(&self, message: &str) {
        // ---
        if self.state().ended {
            return;
        }
        self.emit(GameEvent::Error(ClientError::new(message)));
        self.end("socketClosed");
    }

    /// Connection closed: emits `Ended`. Idempotent.
    pub fn end(&self, reason: &str) {
        // ---
        {
            let mut st = self.state();
            if st.ended {
                return;
            }
            st.ended = true;
            st.online = false;
            st.controls.clear();
        }
        self.emit(GameEvent::Ended {
            reason: reason.to_string(),
        });
    }

    /// Deliver a chat line from another player.
    pub fn receive_chat(&self, sender: &str, text: &str) {
        self.emit(GameEvent::Chat {
            sender: sender.into(),
            text: text.into(),
        });
    }

    // --- inspection --------------------------------------------------------

    pub fn calls(&self) -> Vec<SimCall> {
        self.state().calls.clone()
    }

    pub fn is_ended(&self) -> bool {
        self.state().ended
    }

    pub fn world(&self) -> SimWorld {
        self.state().world.clone()
    }

    /// Replace the world, e.g. to strip out every target.
    pub fn set_world(&self, world: SimWorld) {
        self.state().world = world;
    }
}

// ---

impl SimCall {
    // ---
    /// `true` for calls an idle action makes (everything except chat and
    /// lifecycle control).
    pub fn is_world_action(&self) -> bool {
        !matches!(self, SimCall::Chat(_) | SimCall::ForceEnd(_) | SimCall::Quit(_))
    }
}

// ---

#[async_trait]
impl GameSession for SimSession {
    // ---
    fn username(&self) -> String {
        self.username.clone()
    }

    fn version(&self) -> Option<String> {
        Some(self.version.clone())
    }

    fn is_online(&self) -> bool {
        self.state().online
    }

    fn health(&self) -> f32 {
        self.state().world.health
    }

    fn food(&self) -> u32 {
        self.state().world.food
    }

    fn position(&self) -> Option<Vec3> {
        // ---
        let st = self.state();
        st.online.then_some(st.world.position)
    }

    fn player_count(&self) -> usize {
        self.state().world.players
    }

    // ---

    fn chat(&self, text: &str) -> Result<()> {
        // ---
        if !self.is_online() {
            return Err(BotError::NotOnline);
        }
        self.record(SimCall::Chat(text.to_string()));
        Ok(())
    }

    fn force_end(&self, reason: &str) {
        self.record(SimCall::ForceEnd(reason.to_string()));
        self.end(reason);
    }

    fn quit(&self, reason: &str) {
        self.record(SimCall::Quit(reason.to_string()));
        self.end(reason);
    }

    // ---

    fn set_control(&self, key: ControlKey, on: bool) {
        // ---
        let mut st = self.state();
        if on {
            st.controls.insert(key);
        } else {
            st.controls.remove(&key);
        }
        st.calls.push(SimCall::SetControl(key, on));
    }

    fn control_state(&self, key: ControlKey) -> bool {
        self.state().controls.contains(&key)
    }

    fn swing_arm(&self) {
        self.record(SimCall::SwingArm);
    }

    async fn look(&self, yaw: f64, pitch: f64) -> Result<()> {
        self.ensure_open()?;
        self.record(SimCall::Look { yaw, pitch });
        Ok(())
    }

    async fn look_at(&self, target: Vec3) -> Result<()> {
        self.ensure_open()?;
        self.record(SimCall::LookAt(target));
        Ok(())
    }

    async fn wait_ticks(&self, ticks: u32) -> Result<()> {
        // ---
        self.record(SimCall::WaitTicks(ticks));
        tokio::time::sleep(self.tick * ticks).await;
        self.ensure_open()
    }

    // ---

    fn find_block(&self, max_distance: f64, matching: &dyn Fn(&Block) -> bool) -> Option<Block> {
        self.state().world.find_block(max_distance, matching)
    }

    fn block_at(&self, pos: BlockPos) -> Option<Block> {
        Some(self.state().world.block_at(pos))
    }

    fn can_dig(&self, block: &Block) -> bool {
        !block.is_air() && block.name != "bedrock"
    }

    async fn dig(&self, block: &Block) -> Result<()> {
        // ---
        self.ensure_open()?;
        if !self.can_dig(block) {
            return Err(BotError::Capability(format!("cannot dig {}", block.name)));
        }
        let mut st = self.state();
        st.world.set_block(block.pos, "air");
        st.calls.push(SimCall::Dig(block.pos));
        Ok(())
    }

    async fn place_block(&self, reference: &Block, face: BlockPos) -> Result<()> {
        // ---
        self.ensure_open()?;
        let target = reference.pos.offset(face.x, face.y, face.z);
        let mut st = self.state();
        if !st.world.block_at(target).is_air() {
            return Err(BotError::Capability("placement cell is occupied".into()));
        }
        let name = match st.held.as_mut() {
            Some(held) if held.count > 0 => {
                held.count -= 1;
                held.name.clone()
            }
            _ => return Err(BotError::Capability("nothing in hand to place".into())),
        };
        st.world.set_block(target, &name);
        st.calls.push(SimCall::Place(target));
        Ok(())
    }

    fn nearest_entity(&self) -> Option<Entity> {
        self.state().world.nearest_entity()
    }

    async fn open_container(&self, block: &Block) -> Result<()> {
        // ---
        self.ensure_open()?;
        let mut st = self.state();
        st.open_container = Some(block.pos);
        st.calls.push(SimCall::OpenContainer(block.pos));
        Ok(())
    }

    async fn close_container(&self) -> Result<()> {
        // ---
        let mut st = self.state();
        if st.open_container.take().is_none() {
            return Err(BotError::Capability("no container open".into()));
        }
        st.calls.push(SimCall::CloseContainer);
        Ok(())
    }

    // ---

    fn inventory(&self) -> Vec<Item> {
        self.state().world.inventory.clone()
    }

    async fn equip(&self, item: &Item) -> Result<()> {
        // ---
        self.ensure_open()?;
        let mut st = self.state();
        if !st.world.inventory.iter().any(|i| i.slot == item.slot) {
            return Err(BotError::NoTarget(format!("{} not in inventory", item.name)));
        }
        st.held = Some(item.clone());
        st.calls.push(SimCall::Equip(item.name.clone()));
        Ok(())
    }

    async fn consume(&self) -> Result<()> {
        // ---
        self.ensure_open()?;
        let mut st = self.state();
        let held = st
            .held
            .take()
            .ok_or_else(|| BotError::Capability("nothing in hand to consume".into()))?;
        if let Some(stack) = st.world.inventory.iter_mut().find(|i| i.slot == held.slot) {
            stack.count = stack.count.saturating_sub(1);
        }
        st.world.inventory.retain(|i| i.count > 0);
        st.world.food = (st.world.food + 4).min(20);
        st.calls.push(SimCall::Consume(held.name));
        Ok(())
    }

    async fn drop_item(&self, item: &Item, count: u32) -> Result<()> {
        // ---
        self.ensure_open()?;
        let mut st = self.state();
        let stack = st
            .world
            .inventory
            .iter_mut()
            .find(|i| i.slot == item.slot)
            .ok_or_else(|| BotError::NoTarget(format!("{} not in inventory", item.name)))?;
        stack.count = stack.count.saturating_sub(count);
        st.world.inventory.retain(|i| i.count > 0);
        st.calls.push(SimCall::Drop {
            name: item.name.clone(),
            count,
        });
        Ok(())
    }

    fn selected_slot(&self) -> u8 {
        self.state().selected_slot
    }

    fn set_selected_slot(&self, slot: u8) {
        // ---
        let mut st = self.state();
        st.selected_slot = slot;
        st.calls.push(SimCall::SelectSlot(slot));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn session() -> (SimSession, mpsc::UnboundedReceiver<GameEvent>) {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        let s = SimSession::new(
            "Bot".into(),
            "1.20.4".into(),
            Duration::from_millis(50),
            SimWorld::flat(),
            tx,
        );
        (s, rx)
    }

    #[test]
    fn kick_emits_kicked_then_ended_once() {
        // ---
        let (s, mut rx) = session();
        s.spawn();
        s.kick("banned");
        s.end("again");

        assert_eq!(rx.try_recv().unwrap(), GameEvent::Login);
        assert_eq!(rx.try_recv().unwrap(), GameEvent::Spawned);
        assert_eq!(
            rx.try_recv().unwrap(),
            GameEvent::Kicked {
                reason: DisconnectReason::Text("banned".into()),
                logged_in: true
            }
        );
        assert!(matches!(rx.try_recv().unwrap(), GameEvent::Ended { .. }));
        assert!(rx.try_recv().is_err(), "end must be idempotent");
        assert!(!s.is_online());
    }

    #[tokio::test]
    async fn world_calls_fail_after_end() {
        // ---
        let (s, _rx) = session();
        s.spawn();
        s.quit("bye");

        let err = s.look(0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, BotError::SessionClosed));
        assert!(matches!(s.chat("hi"), Err(BotError::NotOnline)));
    }

    #[tokio::test]
    async fn place_consumes_held_block() {
        // ---
        let (s, _rx) = session();
        s.spawn();
        let dirt = s.inventory().into_iter().find(|i| i.name == "dirt").unwrap();
        s.equip(&dirt).await.unwrap();

        let ground = s.block_at(BlockPos::new(1, 63, 0)).unwrap();
        s.place_block(&ground, BlockPos::new(0, 1, 0)).await.unwrap();

        assert_eq!(s.world().block_at(BlockPos::new(1, 64, 0)).name, "dirt");
        assert!(s.calls().contains(&SimCall::Place(BlockPos::new(1, 64, 0))));
    }
}
