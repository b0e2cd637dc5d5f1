//! Drives a world through recorded or generated input frames.

use anyhow::{ensure, Result};
use maze_tanks_core::{Command, Encode, Event, KeyState, MatchConfig, Replay, TankId};
use maze_tanks_world::{self as world, query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

const BOT_SEED_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

/// A running match together with the inputs it has consumed so far.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    replay: Replay,
}

impl Session {
    pub(crate) fn new(config: MatchConfig) -> Result<Self> {
        let world = World::new(config.clone())?;
        Ok(Self {
            world,
            replay: Replay {
                config,
                frames: Vec::new(),
            },
        })
    }

    /// Queues one input per tank and runs the resulting tick.
    pub(crate) fn play(&mut self, frame: Vec<KeyState>) -> Result<Vec<Event>> {
        ensure!(
            frame.len() == self.replay.config.tank_count as usize,
            "frame carries {} inputs for {} tanks",
            frame.len(),
            self.replay.config.tank_count
        );
        let mut events = Vec::new();
        let round = query::round(&self.world);
        for (index, keys) in frame.iter().enumerate() {
            world::apply(
                &mut self.world,
                Command::SubmitInput {
                    tank: TankId::new(index as u32),
                    round,
                    keys: *keys,
                },
                &mut events,
            );
        }
        world::apply(&mut self.world, Command::Advance, &mut events);
        self.replay.frames.push(frame);
        Ok(events)
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn into_replay(self) -> Replay {
        self.replay
    }

    /// Hex SHA-256 digest of everything observable about the match.
    pub(crate) fn fingerprint(&self) -> String {
        let world = &self.world;
        let mut bytes = Vec::new();
        query::round(world).encode(&mut bytes);
        query::tick(world).encode(&mut bytes);
        query::maze(world).encode(&mut bytes);
        for tank in query::tank_view(world).iter() {
            tank.state.encode(&mut bytes);
            tank.score.encode(&mut bytes);
            match tank.upgrade {
                Some(upgrade) => {
                    true.encode(&mut bytes);
                    upgrade.encode(&mut bytes);
                }
                None => false.encode(&mut bytes),
            }
        }
        for shot in query::shot_view(world).iter() {
            shot.position.encode(&mut bytes);
            shot.velocity.encode(&mut bytes);
        }
        for missile in query::missile_view(world).iter() {
            missile.position.encode(&mut bytes);
            missile.direction.encode(&mut bytes);
        }
        for mine in query::mine_view(world).iter() {
            mine.position.encode(&mut bytes);
        }
        for fragment in query::shrapnel_view(world).iter() {
            fragment.position.encode(&mut bytes);
        }
        for ray in query::death_ray_view(world).iter() {
            ray.path.encode(&mut bytes);
        }
        for upgrade in query::upgrade_view(world).iter() {
            upgrade.cell.encode(&mut bytes);
            upgrade.kind.encode(&mut bytes);
        }

        Sha256::digest(&bytes)
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }
}

/// Random driver that holds a set of controls for a while before switching.
#[derive(Debug)]
pub(crate) struct Bot {
    rng: ChaCha8Rng,
    held: KeyState,
    remaining: u32,
}

impl Bot {
    pub(crate) fn new(match_seed: u64, tank: u32) -> Self {
        let seed = match_seed ^ BOT_SEED_STRIDE.wrapping_mul(u64::from(tank) + 1);
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            held: KeyState::default(),
            remaining: 0,
        }
    }

    pub(crate) fn next_keys(&mut self) -> KeyState {
        if self.remaining == 0 {
            self.held = KeyState::from_bits(self.rng.gen::<u8>() & KeyState::ALL_BITS);
            self.remaining = self.rng.gen_range(5..30);
        }
        self.remaining -= 1;
        KeyState {
            fire: self.held.fire && self.rng.gen_bool(0.3),
            ..self.held
        }
    }
}
