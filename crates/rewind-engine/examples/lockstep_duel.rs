//! Two rollback peers playing a scripted duel over a laggy in-memory link.
//!
//! Each peer simulates its own copy of the world. Local input is applied
//! immediately; the remote player's input arrives `LINK_DELAY` frames late,
//! so each peer predicts it (repeat the last confirmed mask) and rolls back
//! through its [`SnapshotRing`] whenever a confirmed input contradicts the
//! prediction. At the end both peers, and a reference world fed the true
//! inputs directly, must agree on the checksum.
//!
//! Run with:
//!   cargo run --example lockstep_duel -p rewind-engine
//!
//! Set `RUST_LOG=rewind_engine=debug` to see every rollback.

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rewind_engine::prelude::*;

const LINK_DELAY: usize = 4;
const FRAMES: u32 = 600;

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Walks left and right on input and lunges on PRIMARY.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Brawler {
    player: usize,
    lunges: u32,
    hits_taken: u32,
}

impl Component for Brawler {
    fn name(&self) -> &'static str {
        "brawler"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TICK | Capabilities::HIT | Capabilities::STATE
    }

    fn tick(&mut self, ctx: &mut EntityContext<'_>) {
        let mut walk = Fixed::ZERO;
        if ctx.input.held(self.player, Buttons::LEFT) {
            walk -= Fixed::from_int(4);
        }
        if ctx.input.held(self.player, Buttons::RIGHT) {
            walk += Fixed::from_int(4);
        }
        if ctx.input.just_pressed(self.player, Buttons::PRIMARY) {
            self.lunges += 1;
            walk += ctx.rng.range_fixed(Fixed::from_int(-20), Fixed::from_int(20));
        }
        ctx.core
            .transform
            .translate(FVec3::new(walk * ctx.dt, Fixed::ZERO, Fixed::ZERO));
    }

    fn on_hit_enter(&mut self, _hit: &Collision, _ctx: &mut EntityContext<'_>) {
        self.hits_taken += 1;
    }

    fn save(&self, out: &mut StateWriter) -> Result<(), CodecError> {
        out.write(self)
    }

    fn load(&mut self, input: &mut StateReader<'_>) -> Result<(), CodecError> {
        *self = input.read()?;
        Ok(())
    }
}

fn build_arena() -> World {
    let mut world = World::new(WorldConfig {
        rng_seed: 0x5eed,
        ..Default::default()
    });
    for (player, x) in [(0usize, -4i64), (1, 4)] {
        let id = world.spawn(
            Entity::new(format!("brawler{player}"))
                .at(FVec3::from_ints(x, 0, 0))
                .with_collider(Collider::solid_box(FVec2::from_ints(1, 2)).pushable())
                .with_component(KinematicBody::default())
                .with_component(Brawler {
                    player,
                    ..Default::default()
                }),
        );
        world.activate(id);
    }
    for (facing, x) in [(Facing::Right, -10i64), (Facing::Left, 10)] {
        let id = world.spawn(
            Entity::new(format!("wall{x}"))
                .at(FVec3::from_ints(x, 0, 0))
                .with_collider(Collider::wall(facing, Fixed::from_int(10)).any_row()),
        );
        world.activate(id);
    }
    world
}

/// The scripted "controller" for `player` on step `index`.
fn controller(player: usize, index: usize) -> u32 {
    let phase = (index / (7 + player * 5)) % 4;
    let mut mask = match phase {
        0 => Buttons::RIGHT.0,
        1 => 0,
        2 => Buttons::LEFT.0,
        _ => (Buttons::LEFT | Buttons::RIGHT).0,
    };
    if index % (23 + player * 6) == 0 {
        mask |= Buttons::PRIMARY.0;
    }
    if player == 1 {
        // Mirror the walk so the brawlers meet in the middle.
        let lr = Buttons::LEFT.0 | Buttons::RIGHT.0;
        if mask & lr == Buttons::LEFT.0 || mask & lr == Buttons::RIGHT.0 {
            mask ^= lr;
        }
    }
    mask
}

// ---------------------------------------------------------------------------
// Peer
// ---------------------------------------------------------------------------

struct Peer {
    name: &'static str,
    local: usize,
    world: World,
    ring: SnapshotRing,
    local_inputs: Vec<u32>,
    confirmed: Vec<Option<u32>>,
    /// Remote mask each simulated step actually used.
    used: Vec<u32>,
    rollbacks: u32,
    resimulated: u32,
}

impl Peer {
    fn new(name: &'static str, local: usize) -> anyhow::Result<Self> {
        let world = build_arena();
        let mut ring = SnapshotRing::new(LINK_DELAY * 2 + 2);
        ring.save(&world)?;
        Ok(Self {
            name,
            local,
            world,
            ring,
            local_inputs: Vec::new(),
            confirmed: Vec::new(),
            used: Vec::new(),
            rollbacks: 0,
            resimulated: 0,
        })
    }

    fn remote(&self) -> usize {
        1 - self.local
    }

    /// The remote mask to assume for step `index`: the confirmed one if
    /// known, otherwise the most recent confirmed mask before it.
    fn remote_guess(&self, index: usize) -> u32 {
        self.confirmed
            .iter()
            .take(index + 1)
            .rev()
            .find_map(|m| *m)
            .unwrap_or(0)
    }

    fn frame_input(&self, index: usize, remote: u32) -> InputFrame {
        let mut masks = [0; PLAYER_COUNT];
        masks[self.local] = self.local_inputs[index];
        masks[self.remote()] = remote;
        InputFrame {
            masks,
            disconnected: 0,
        }
    }

    /// Apply this peer's input for the next step and simulate it.
    fn advance(&mut self, local_mask: u32) -> anyhow::Result<()> {
        let index = self.world.frame() as usize;
        self.local_inputs.push(local_mask);
        let remote = self.remote_guess(index);
        self.used.push(remote);
        let input = self.frame_input(index, remote);
        self.world.step(&input);
        self.ring.save(&self.world)?;
        Ok(())
    }

    /// A confirmed remote mask for step `index` arrived.
    fn receive(&mut self, index: usize, mask: u32) -> anyhow::Result<()> {
        if self.confirmed.len() <= index {
            self.confirmed.resize(index + 1, None);
        }
        self.confirmed[index] = Some(mask);
        if index >= self.used.len() || self.used[index] == mask {
            return Ok(());
        }

        let current = self.used.len();
        let mut inputs = Vec::with_capacity(current - index);
        for i in index..current {
            let remote = self.remote_guess(i);
            self.used[i] = remote;
            inputs.push(self.frame_input(i, remote));
        }
        self.ring
            .resimulate(&mut self.world, index as u32, &inputs)
            .with_context(|| format!("{} failed to roll back to frame {index}", self.name))?;
        self.rollbacks += 1;
        self.resimulated += inputs.len() as u32;
        debug!(
            peer = self.name,
            from = index,
            to = current,
            "mispredicted remote input"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut peers = [Peer::new("alpha", 0)?, Peer::new("beta", 1)?];
    let mut reference = build_arena();

    for index in 0..FRAMES as usize {
        for peer in &mut peers {
            let mask = controller(peer.local, index);
            peer.advance(mask)?;
        }
        reference.step(&InputFrame::new(controller(0, index), controller(1, index)));

        // The packet for step `index - LINK_DELAY` lands now.
        if let Some(late) = index.checked_sub(LINK_DELAY) {
            for peer in &mut peers {
                let remote = peer.remote();
                peer.receive(late, controller(remote, late))?;
            }
        }
    }

    // Drain the link.
    for late in (FRAMES as usize).saturating_sub(LINK_DELAY)..FRAMES as usize {
        for peer in &mut peers {
            let remote = peer.remote();
            peer.receive(late, controller(remote, late))?;
        }
    }

    let expected = reference.checksum()?;
    for peer in &peers {
        let actual = peer.world.checksum()?;
        info!(
            peer = peer.name,
            frame = peer.world.frame(),
            rollbacks = peer.rollbacks,
            resimulated = peer.resimulated,
            checksum = actual,
            "peer finished"
        );
        ensure!(
            actual == expected,
            "{} desynced: {actual:016x} != reference {expected:016x}",
            peer.name
        );
    }

    for (player, name) in [(0, "brawler0"), (1, "brawler1")] {
        let id = reference
            .entities()
            .find(name)
            .context("brawler missing from reference world")?;
        let brawler = reference
            .get(id)
            .and_then(|e| e.get::<Brawler>())
            .context("brawler component missing")?;
        let pose = reference
            .presentation_pose(id)
            .context("brawler has no pose")?;
        info!(
            player,
            x = pose.position[0],
            lunges = brawler.lunges,
            hits_taken = brawler.hits_taken,
            "final state"
        );
    }

    info!(checksum = expected, "all peers agree");
    Ok(())
}
