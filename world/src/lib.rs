#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative match state for maze tanks.
//!
//! The [`World`] owns every tank, the current round and all projectiles in
//! flight. Adapters mutate it exclusively through [`apply`] and observe it
//! through the functions of [`query`]. A tick runs only once every active tank
//! has queued its input, so two worlds fed the same commands stay identical.

mod entities;
mod navigation;
mod round;
mod tank;
mod weapons;

use maze_tanks_core::{Command, Event, KeyState, MatchConfig, Point, TankId, TankState};
use thiserror::Error;

pub use navigation::{MazeMap, Route};

use round::Round;
use tank::Tank;

/// Reasons a match configuration cannot be played.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A match needs at least one tank.
    #[error("a match needs at least one tank")]
    NoTanks,
    /// The maze size range is empty or allows zero-sized mazes.
    #[error("maze size range {min}..{max} is empty or contains zero")]
    MazeSize {
        /// Smallest side, inclusive.
        min: u32,
        /// Largest side, exclusive.
        max: u32,
    },
}

/// Represents the authoritative state of a running match.
#[derive(Debug)]
pub struct World {
    config: MatchConfig,
    round: Round,
    tanks: Vec<Tank>,
    states: Vec<TankState>,
    tick: u64,
    round_end_timer: Option<u32>,
}

impl World {
    /// Creates a match and lays out its first round.
    ///
    /// The first round is ready as soon as this returns; `RoundStarted` is only
    /// reported for the rounds that follow.
    pub fn new(config: MatchConfig) -> Result<Self, ConfigError> {
        if config.tank_count == 0 {
            return Err(ConfigError::NoTanks);
        }
        if config.min_maze_size == 0 || config.max_maze_size <= config.min_maze_size {
            return Err(ConfigError::MazeSize {
                min: config.min_maze_size,
                max: config.max_maze_size,
            });
        }

        let count = config.tank_count as usize;
        let parked = TankState {
            position: Point::from_ints(-1, -1),
            direction: Point::from_ints(1, 0),
            key_state: KeyState::default(),
            active: true,
            alive: true,
        };
        let mut world = Self {
            round: Round::new(0, &config),
            tanks: vec![Tank::default(); count],
            states: vec![parked; count],
            config,
            tick: 0,
            round_end_timer: None,
        };
        world.spawn_tanks();
        log::info!(
            "match started with {} tanks, round 0 maze {}x{}",
            count,
            world.round.maze().width(),
            world.round.maze().height()
        );
        Ok(world)
    }

    fn spawn_tanks(&mut self) {
        for (tank, state) in self.tanks.iter_mut().zip(self.states.iter_mut()) {
            let (position, direction) = self.round.spawn_point();
            tank.reset(state, position, direction);
        }
    }

    fn can_step(&self) -> bool {
        self.states.iter().any(|state| state.active)
            && self
                .tanks
                .iter()
                .zip(&self.states)
                .all(|(tank, state)| tank.can_advance(state))
    }

    fn step(&mut self, out: &mut Vec<Event>) {
        let first = out.len();

        for index in 0..self.tanks.len() {
            let id = TankId::new(index as u32);
            self.tanks[index].advance(id, &mut self.states, &mut self.round, out);
        }
        self.round.step(&mut self.states, out);
        self.hand_out_upgrades(out);
        self.dispatch(first, out);

        self.tick += 1;
        log::trace!("round {} tick {}", self.round.number(), self.tick);
        out.push(Event::TickAdvanced {
            round: self.round.number(),
            tick: self.tick,
        });

        if self.round_end_timer.is_none() && self.round_decided() {
            self.round_end_timer = Some(self.config.round_end_delay);
        }
        match self.round_end_timer {
            Some(0) => self.finish_round(out),
            Some(remaining) => self.round_end_timer = Some(remaining - 1),
            None => {}
        }
    }

    fn hand_out_upgrades(&mut self, out: &mut Vec<Event>) {
        for (index, (tank, state)) in self.tanks.iter_mut().zip(&self.states).enumerate() {
            if tank.upgrade.is_some() {
                continue;
            }
            let id = TankId::new(index as u32);
            if let Some(kind) = self.round.collect_upgrade(id, state, out) {
                log::debug!("tank {index} picked up {kind:?}");
                tank.upgrade = Some(weapons::AppliedUpgrade::new(kind));
            }
        }
    }

    /// Feeds every event raised since `first` to the weapons, including the
    /// ones raised while reacting.
    fn dispatch(&mut self, first: usize, out: &mut Vec<Event>) {
        let mut cursor = first;
        while cursor < out.len() {
            let event = out[cursor].clone();
            cursor += 1;
            if let Event::TankKilled { tank, .. } = event {
                self.tanks[tank.index()].disarm(tank, out);
            }
            for tank in &mut self.tanks {
                tank.notify(&event, &mut self.round, out);
            }
        }
    }

    fn round_decided(&self) -> bool {
        self.states.len() >= 2 && self.states.iter().filter(|state| state.alive).count() <= 1
    }

    fn finish_round(&mut self, out: &mut Vec<Event>) {
        let survivors: Vec<TankId> = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.alive)
            .map(|(index, _)| TankId::new(index as u32))
            .collect();
        for survivor in &survivors {
            self.tanks[survivor.index()].score += 1;
        }
        let finished = self.round.number();
        log::info!("round {finished} ended, survivors {survivors:?}");
        out.push(Event::RoundEnded {
            round: finished,
            survivors,
        });

        self.round = Round::new(finished + 1, &self.config);
        self.spawn_tanks();
        self.tick = 0;
        self.round_end_timer = None;
        let maze = self.round.maze();
        log::info!(
            "round {} started on a {}x{} maze",
            finished + 1,
            maze.width(),
            maze.height()
        );
        out.push(Event::RoundStarted {
            round: finished + 1,
            width: maze.width(),
            height: maze.height(),
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// # Panics
///
/// Panics when a command names a tank outside the match.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SubmitInput { tank, round, keys } => {
            assert!(tank.index() < world.tanks.len(), "unknown tank {tank:?}");
            if round == world.round.number() {
                world.tanks[tank.index()].queue(keys);
            }
        }
        Command::SetActive { tank, active } => {
            assert!(tank.index() < world.tanks.len(), "unknown tank {tank:?}");
            world.states[tank.index()].active = active;
            world.tanks[tank.index()].clear_pending();
        }
        Command::Advance => {
            while world.can_step() {
                world.step(out_events);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use maze_tanks_core::{
        CellCoord, DeathRayId, MatchConfig, Maze, MineId, MineState, MissileGuidance, MissileId,
        Number, Point, ShotId, ShotKind, TankId, TankState, TankUpgradeState, UpgradeId,
        UpgradeKind,
    };
    use maze_tanks_system_motion::shrapnel_position;

    use super::{MazeMap, World};

    /// Configuration the match was created with.
    #[must_use]
    pub fn config(world: &World) -> &MatchConfig {
        &world.config
    }

    /// Zero-based number of the round being played.
    #[must_use]
    pub fn round(world: &World) -> u32 {
        world.round.number()
    }

    /// Ticks completed in the current round.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Maze of the current round.
    #[must_use]
    pub fn maze(world: &World) -> &Maze {
        world.round.maze()
    }

    /// Distance field of the current maze.
    #[must_use]
    pub fn maze_map(world: &World) -> &MazeMap {
        world.round.maze_map()
    }

    /// Reports whether [`super::apply`] with `Command::Advance` would run a tick.
    #[must_use]
    pub fn can_advance(world: &World) -> bool {
        world.can_step()
    }

    /// Reports whether a tank still has queued input waiting for a tick.
    ///
    /// # Panics
    ///
    /// Panics when the tank is not part of the match.
    #[must_use]
    pub fn tank_ready(world: &World, tank: TankId) -> bool {
        world.tanks[tank.index()].can_advance(&world.states[tank.index()])
    }

    /// Captures every tank in index order.
    #[must_use]
    pub fn tank_view(world: &World) -> View<TankSnapshot> {
        View::new(
            world
                .tanks
                .iter()
                .zip(&world.states)
                .enumerate()
                .map(|(index, (tank, state))| TankSnapshot {
                    id: TankId::new(index as u32),
                    state: *state,
                    upgrade: tank.upgrade.as_ref().map(|upgrade| upgrade.state()),
                    score: tank.score,
                })
                .collect(),
        )
    }

    /// Captures the shots in flight in id order.
    #[must_use]
    pub fn shot_view(world: &World) -> View<ShotSnapshot> {
        View::new(
            world
                .round
                .shots
                .iter()
                .map(|(&id, shot)| ShotSnapshot {
                    id,
                    owner: shot.details.owner,
                    kind: shot.details.kind,
                    position: shot.details.position,
                    velocity: shot.details.velocity,
                    radius: shot.details.radius,
                    timer: shot.details.timer,
                    path: shot.path.clone(),
                })
                .collect(),
        )
    }

    /// Captures the missiles in flight in id order.
    #[must_use]
    pub fn missile_view(world: &World) -> View<MissileSnapshot> {
        View::new(
            world
                .round
                .missiles
                .iter()
                .map(|(&id, missile)| MissileSnapshot {
                    id,
                    owner: missile.details.owner,
                    position: missile.details.position,
                    direction: missile.details.direction,
                    guidance: missile.guidance.kind(),
                    target: missile.guidance.target(),
                    timer: missile.timer,
                })
                .collect(),
        )
    }

    /// Captures the mines lying in the maze in id order.
    #[must_use]
    pub fn mine_view(world: &World) -> View<MineSnapshot> {
        View::new(
            world
                .round
                .mines
                .iter()
                .map(|(&id, mine)| MineSnapshot {
                    id,
                    owner: mine.details.owner,
                    position: mine.details.position,
                    direction: mine.details.direction,
                    state: mine.state(),
                })
                .collect(),
        )
    }

    /// Captures every explosion fragment in creation order.
    #[must_use]
    pub fn shrapnel_view(world: &World) -> View<ShrapnelSnapshot> {
        View::new(
            world
                .round
                .shrapnel
                .iter()
                .map(|fragment| ShrapnelSnapshot {
                    source: fragment.details.source,
                    way: fragment.details.way,
                    collision: fragment.collision,
                    timer: fragment.timer,
                    position: shrapnel_position(
                        &fragment.details,
                        fragment.collision,
                        fragment.timer,
                    ),
                })
                .collect(),
        )
    }

    /// Captures the lethal death rays in id order.
    #[must_use]
    pub fn death_ray_view(world: &World) -> View<DeathRaySnapshot> {
        View::new(
            world
                .round
                .death_rays
                .iter()
                .map(|(&id, ray)| DeathRaySnapshot {
                    id,
                    owner: ray.owner,
                    path: ray.path.clone(),
                    timer: ray.timer,
                })
                .collect(),
        )
    }

    /// Captures the upgrade pickups waiting in the maze in id order.
    #[must_use]
    pub fn upgrade_view(world: &World) -> View<UpgradeSnapshot> {
        View::new(
            world
                .round
                .upgrades
                .iter()
                .map(|(&id, upgrade)| UpgradeSnapshot {
                    id,
                    cell: upgrade.cell,
                    kind: upgrade.kind,
                })
                .collect(),
        )
    }

    /// Read-only list of snapshots captured after the last completed tick.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct View<T> {
        snapshots: Vec<T>,
    }

    impl<T> View<T> {
        fn new(snapshots: Vec<T>) -> Self {
            Self { snapshots }
        }

        /// Iterator over the captured snapshots in deterministic order.
        pub fn iter(&self) -> impl Iterator<Item = &T> {
            self.snapshots.iter()
        }

        /// Number of captured snapshots.
        #[must_use]
        pub fn len(&self) -> usize {
            self.snapshots.len()
        }

        /// Reports whether nothing was captured.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.snapshots.is_empty()
        }

        /// Consumes the view, yielding the underlying snapshots.
        pub fn into_vec(self) -> Vec<T> {
            self.snapshots
        }
    }

    /// Complete state of one tank.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TankSnapshot {
        /// Index of the tank.
        pub id: TankId,
        /// Body and controls.
        pub state: TankState,
        /// Upgrade in use, if any.
        pub upgrade: Option<TankUpgradeState>,
        /// Rounds survived so far.
        pub score: u32,
    }

    /// A shot in flight.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ShotSnapshot {
        /// Identifier of the shot.
        pub id: ShotId,
        /// Tank that fired it.
        pub owner: TankId,
        /// Flavour of projectile.
        pub kind: ShotKind,
        /// Centre of the shot.
        pub position: Point,
        /// Travel per tick.
        pub velocity: Point,
        /// Radius of the shot.
        pub radius: Number,
        /// Remaining ticks; negative never expires.
        pub timer: i32,
        /// Start, bounce and end points of the last tick's travel.
        pub path: Vec<Point>,
    }

    /// A missile in flight.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MissileSnapshot {
        /// Identifier of the missile.
        pub id: MissileId,
        /// Tank that launched it.
        pub owner: TankId,
        /// Centre of the missile.
        pub position: Point,
        /// Unit heading.
        pub direction: Point,
        /// Steering source.
        pub guidance: MissileGuidance,
        /// Tank being chased by a homing missile.
        pub target: Option<TankId>,
        /// Remaining ticks of fuel.
        pub timer: i32,
    }

    /// A mine lying in the maze.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MineSnapshot {
        /// Identifier of the mine.
        pub id: MineId,
        /// Tank that dropped it.
        pub owner: TankId,
        /// Centre of the footprint.
        pub position: Point,
        /// Orientation of the footprint.
        pub direction: Point,
        /// Observable phase.
        pub state: MineState,
    }

    /// An explosion fragment.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ShrapnelSnapshot {
        /// Origin of the burst.
        pub source: Point,
        /// Full unobstructed displacement.
        pub way: Point,
        /// Portion of the way at which a wall stops the fragment.
        pub collision: Number,
        /// Ticks since the burst.
        pub timer: i32,
        /// Current position.
        pub position: Point,
    }

    /// A lethal death ray.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct DeathRaySnapshot {
        /// Identifier of the ray.
        pub id: DeathRayId,
        /// Tank that fired it.
        pub owner: TankId,
        /// Polyline traced when the ray was fired.
        pub path: Vec<Point>,
        /// Remaining ticks.
        pub timer: i32,
    }

    /// An upgrade pickup.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct UpgradeSnapshot {
        /// Identifier of the pickup.
        pub id: UpgradeId,
        /// Cell holding it.
        pub cell: CellCoord,
        /// Upgrade it grants.
        pub kind: UpgradeKind,
    }
}
