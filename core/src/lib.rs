#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the maze tanks engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! carrying per-tick player intent, the world executes those commands via its
//! `apply` entry point, and then reports [`Event`] values describing what
//! happened during the tick. All geometry is expressed with the deterministic
//! fixed-point [`Number`] and [`Point`] types.

mod codec;
mod fixed;

use serde::{Deserialize, Serialize};

pub use codec::{from_bytes, to_bytes, CodecError, Decode, Encode, Reader};
pub use fixed::{cross, dot, length, normalized, rotate, Number, Point, FRACTION_BITS};

/// Commands that express all permissible world mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Queues one tick of input for a tank.
    ///
    /// Inputs tagged with a round other than the current one are discarded.
    SubmitInput {
        /// Tank receiving the input.
        tank: TankId,
        /// Round the input was produced for.
        round: u32,
        /// Controls held during the tick.
        keys: KeyState,
    },
    /// Toggles whether a tank must supply input before the world can advance.
    ///
    /// Pending inputs for the tank are dropped.
    SetActive {
        /// Tank whose participation changes.
        tank: TankId,
        /// Whether the tank now requires input.
        active: bool,
    },
    /// Steps the simulation for as long as every active tank has queued input.
    Advance,
}

/// Events reported by the world while processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A new round began with a freshly generated maze.
    RoundStarted {
        /// Zero-based round counter.
        round: u32,
        /// Number of maze columns.
        width: u32,
        /// Number of maze rows.
        height: u32,
    },
    /// A single simulation tick completed.
    TickAdvanced {
        /// Round the tick belonged to.
        round: u32,
        /// Tick counter within the round, starting at one.
        tick: u64,
    },
    /// A shot entered the arena.
    ShotFired {
        /// Identifier assigned to the shot.
        shot: ShotId,
        /// Tank that fired it.
        owner: TankId,
        /// Flavour of projectile.
        kind: ShotKind,
    },
    /// A shot left the arena by expiring, hitting a tank or being detonated.
    ShotRemoved {
        /// Identifier of the removed shot.
        shot: ShotId,
        /// Tank that fired it.
        owner: TankId,
        /// Last position of the shot.
        position: Point,
    },
    /// A missile was launched.
    MissileLaunched {
        /// Identifier assigned to the missile.
        missile: MissileId,
        /// Tank that launched it.
        owner: TankId,
        /// Steering source driving the missile.
        guidance: MissileGuidance,
    },
    /// A missile was destroyed.
    MissileRemoved {
        /// Identifier of the removed missile.
        missile: MissileId,
        /// Tank that launched it.
        owner: TankId,
        /// Last position of the missile.
        position: Point,
    },
    /// A mine was placed behind a tank.
    MineDropped {
        /// Identifier assigned to the mine.
        mine: MineId,
        /// Tank that placed it.
        owner: TankId,
        /// Centre of the mine footprint.
        position: Point,
    },
    /// A mine finished its countdown.
    MineDetonated {
        /// Identifier of the detonated mine.
        mine: MineId,
        /// Centre of the mine footprint.
        position: Point,
    },
    /// A burst of shrapnel was spawned.
    Explosion {
        /// Origin of the burst.
        position: Point,
    },
    /// A death ray path was traced and became lethal.
    DeathRayFired {
        /// Identifier assigned to the ray.
        ray: DeathRayId,
        /// Tank that fired it.
        owner: TankId,
    },
    /// A death ray faded out.
    DeathRayRemoved {
        /// Identifier of the removed ray.
        ray: DeathRayId,
        /// Tank that fired it.
        owner: TankId,
    },
    /// A tank was destroyed.
    TankKilled {
        /// Tank that died.
        tank: TankId,
        /// What destroyed it.
        cause: KillCause,
    },
    /// An upgrade pickup appeared in the maze.
    UpgradeSpawned {
        /// Identifier assigned to the pickup.
        upgrade: UpgradeId,
        /// Cell holding the pickup.
        cell: CellCoord,
        /// Upgrade granted on pickup.
        kind: UpgradeKind,
    },
    /// A tank drove over a pickup and acquired its upgrade.
    UpgradeCollected {
        /// Identifier of the consumed pickup.
        upgrade: UpgradeId,
        /// Tank that acquired the upgrade.
        tank: TankId,
        /// Upgrade granted to the tank.
        kind: UpgradeKind,
    },
    /// A tank's upgrade ran out and the default cannon took over.
    UpgradeExpired {
        /// Tank whose upgrade ended.
        tank: TankId,
        /// Upgrade that ended.
        kind: UpgradeKind,
    },
    /// The round finished and every survivor scored.
    RoundEnded {
        /// Round that finished.
        round: u32,
        /// Tanks alive at the end of the round.
        survivors: Vec<TankId>,
    },
}

/// Describes what destroyed a tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KillCause {
    /// Struck by a shot fired by the given tank.
    Shot {
        /// Tank that fired the shot.
        owner: TankId,
    },
    /// Struck by a missile launched by the given tank.
    Missile {
        /// Tank that launched the missile.
        owner: TankId,
    },
    /// Caught in an explosion.
    Shrapnel,
    /// Touched by a death ray fired by the given tank.
    DeathRay {
        /// Tank that fired the ray.
        owner: TankId,
    },
}

/// Flavour of a shot travelling through the maze.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShotKind {
    /// Regular bouncing cannon round.
    Bullet,
    /// Very fast, short lived beam segment.
    Laser,
}

/// Steering source attached to a missile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissileGuidance {
    /// Steered every tick by the launching player.
    Remote,
    /// Follows the maze distance field toward the closest enemy.
    Homing,
}

/// Observable phase of a mine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MineState {
    /// Arming, or armed and waiting for contact.
    Inactive,
    /// A tank is currently standing on the mine.
    Pressed,
    /// Contact ended and the detonation countdown is running.
    Counting,
}

/// Identifier of a tank; also its index in the world's tank array.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TankId(u32);

impl TankId {
    /// Creates a new tank identifier with the provided value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Position of the tank inside the world's tank array.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Creates a new identifier with the provided value.
            #[must_use]
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> u32 {
                self.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a shot within a round.
    ShotId
);
entity_id!(
    /// Identifier of a missile within a round.
    MissileId
);
entity_id!(
    /// Identifier of a mine within a round.
    MineId
);
entity_id!(
    /// Identifier of a death ray within a round.
    DeathRayId
);
entity_id!(
    /// Identifier of an upgrade pickup within a round.
    UpgradeId
);

/// Location of a single maze cell.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Point at the middle of the cell.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            Number::from_ratio(2 * self.column as i32 + 1, 2),
            Number::from_ratio(2 * self.row as i32 + 1, 2),
        )
    }

    /// Cell containing the point, if it lies inside a `width` x `height` maze.
    #[must_use]
    pub fn containing(point: Point, width: u32, height: u32) -> Option<Self> {
        let column = u32::try_from(point.x.floor()).ok()?;
        let row = u32::try_from(point.y.floor()).ok()?;
        (column < width && row < height).then_some(Self::new(column, row))
    }
}

/// Controls held by a player during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyState {
    /// Rotate counter-clockwise.
    pub left: bool,
    /// Rotate clockwise.
    pub right: bool,
    /// Drive forward.
    pub forward: bool,
    /// Reverse.
    pub back: bool,
    /// Fire the active weapon.
    pub fire: bool,
}

impl KeyState {
    /// Mask of every bit used by [`KeyState::to_bits`].
    pub const ALL_BITS: u8 = 0b1_1111;

    /// Packs the controls into a bitmask (left, right, forward, back, fire from bit 0).
    #[must_use]
    pub const fn to_bits(&self) -> u8 {
        (self.left as u8)
            | (self.right as u8) << 1
            | (self.forward as u8) << 2
            | (self.back as u8) << 3
            | (self.fire as u8) << 4
    }

    /// Unpacks a bitmask produced by [`KeyState::to_bits`]; unknown bits are ignored.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            left: bits & 1 != 0,
            right: bits & 1 << 1 != 0,
            forward: bits & 1 << 2 != 0,
            back: bits & 1 << 3 != 0,
            fire: bits & 1 << 4 != 0,
        }
    }

    /// Turn request: `1` for right, `-1` for left, `0` for neither or both.
    #[must_use]
    pub const fn turn(&self) -> i32 {
        self.right as i32 - self.left as i32
    }

    /// Reports whether fire went from released to held between two ticks.
    #[must_use]
    pub const fn fire_pressed_since(&self, previous: &KeyState) -> bool {
        self.fire && !previous.fire
    }
}

/// Upgrades that can be collected from pickups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Rapid-fire cannon with spread.
    Gatling,
    /// Single instantaneous beam shot.
    Laser,
    /// Slow shell detonated by a second press.
    Bomb,
    /// Missile steered by the owner.
    RcMissile,
    /// Missile that hunts the closest enemy through the maze.
    HomingMissile,
    /// A handful of pressure mines.
    Mines,
    /// Charged beam that bends toward enemies.
    DeathRay,
}

impl UpgradeKind {
    /// Every upgrade in declaration order.
    pub const ALL: [UpgradeKind; 7] = [
        Self::Gatling,
        Self::Laser,
        Self::Bomb,
        Self::RcMissile,
        Self::HomingMissile,
        Self::Mines,
        Self::DeathRay,
    ];

    /// Stable tag used by the binary codec.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Gatling => 0,
            Self::Laser => 1,
            Self::Bomb => 2,
            Self::RcMissile => 3,
            Self::HomingMissile => 4,
            Self::Mines => 5,
            Self::DeathRay => 6,
        }
    }

    /// Inverse of [`UpgradeKind::tag`].
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Gatling),
            1 => Some(Self::Laser),
            2 => Some(Self::Bomb),
            3 => Some(Self::RcMissile),
            4 => Some(Self::HomingMissile),
            5 => Some(Self::Mines),
            6 => Some(Self::DeathRay),
            _ => None,
        }
    }
}

/// Generic state cell shared by every upgrade state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TankUpgradeState {
    /// Upgrade currently applied.
    pub kind: UpgradeKind,
    /// Upgrade-specific phase.
    pub state: i32,
    /// Upgrade-specific tick counter.
    pub timer: i32,
}

/// Physical state of a tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TankState {
    /// Centre of the hull.
    pub position: Point,
    /// Unit vector the hull faces.
    pub direction: Point,
    /// Controls applied during the last tick.
    pub key_state: KeyState,
    /// Whether the tank waits for queued input before a tick can run.
    pub active: bool,
    /// Whether the tank still takes part in the round.
    pub alive: bool,
}

/// Algorithm used to lay out the maze of each round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MazeGeneration {
    /// Only the outer boundary.
    Empty,
    /// Random spanning tree plus a few extra openings.
    #[default]
    ExpandTree,
}

/// Rectangular grid maze with closed outer boundary.
///
/// Wall flags are stored column-major: `horizontal[x][y]` is the wall below
/// cell `(x, y)` and `vertical[x][y]` the wall to the right of it. Queries
/// outside the grid always report a wall.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Maze {
    width: u32,
    height: u32,
    horizontal: Vec<Vec<bool>>,
    vertical: Vec<Vec<bool>>,
}

impl Maze {
    /// Maze of the given size with every interior wall present.
    ///
    /// # Panics
    ///
    /// Panics when either dimension is zero.
    #[must_use]
    pub fn walled(width: u32, height: u32) -> Self {
        Self::filled(width, height, true)
    }

    /// Maze of the given size with no interior walls.
    ///
    /// # Panics
    ///
    /// Panics when either dimension is zero.
    #[must_use]
    pub fn open(width: u32, height: u32) -> Self {
        Self::filled(width, height, false)
    }

    fn filled(width: u32, height: u32, present: bool) -> Self {
        assert!(width > 0 && height > 0, "maze dimensions must be positive");
        let (w, h) = (width as usize, height as usize);
        Self {
            width,
            height,
            horizontal: vec![vec![present; h - 1]; w],
            vertical: vec![vec![present; h]; w - 1],
        }
    }

    /// Rebuilds a maze from raw wall tables, validating their shapes.
    #[must_use]
    pub fn from_walls(horizontal: Vec<Vec<bool>>, vertical: Vec<Vec<bool>>) -> Option<Self> {
        let width = horizontal.len();
        let height = horizontal.first()?.len() + 1;
        if horizontal.iter().any(|column| column.len() + 1 != height) {
            return None;
        }
        if vertical.len() + 1 != width || vertical.iter().any(|column| column.len() != height) {
            return None;
        }
        Some(Self {
            width: u32::try_from(width).ok()?,
            height: u32::try_from(height).ok()?,
            horizontal,
            vertical,
        })
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw table of walls below each cell.
    #[must_use]
    pub fn horizontal_walls(&self) -> &[Vec<bool>] {
        &self.horizontal
    }

    /// Raw table of walls right of each cell.
    #[must_use]
    pub fn vertical_walls(&self) -> &[Vec<bool>] {
        &self.vertical
    }

    /// Whether a wall separates `(x, y)` from `(x, y + 1)`.
    #[must_use]
    pub fn has_hwall_below(&self, x: i32, y: i32) -> bool {
        lookup(&self.horizontal, x, y).unwrap_or(true)
    }

    /// Whether a wall separates `(x, y)` from `(x + 1, y)`.
    #[must_use]
    pub fn has_vwall_right(&self, x: i32, y: i32) -> bool {
        lookup(&self.vertical, x, y).unwrap_or(true)
    }

    /// Sets the wall below `(x, y)`; out-of-range slots are ignored.
    pub fn set_horizontal_wall(&mut self, x: u32, y: u32, present: bool) {
        if let Some(slot) = slot_mut(&mut self.horizontal, x, y) {
            *slot = present;
        }
    }

    /// Sets the wall right of `(x, y)`; out-of-range slots are ignored.
    pub fn set_vertical_wall(&mut self, x: u32, y: u32, present: bool) {
        if let Some(slot) = slot_mut(&mut self.vertical, x, y) {
            *slot = present;
        }
    }

    /// Whether the arena-space point lies strictly inside the outer boundary.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x > Number::ZERO
            && point.y > Number::ZERO
            && point.x < Number::from_int(self.width as i32)
            && point.y < Number::from_int(self.height as i32)
    }
}

fn lookup(table: &[Vec<bool>], x: i32, y: i32) -> Option<bool> {
    let x = usize::try_from(x).ok()?;
    let y = usize::try_from(y).ok()?;
    table.get(x)?.get(y).copied()
}

fn slot_mut(table: &mut [Vec<bool>], x: u32, y: u32) -> Option<&mut bool> {
    table.get_mut(x as usize)?.get_mut(y as usize)
}

fn default_tank_count() -> u32 {
    2
}

fn default_min_maze_size() -> u32 {
    5
}

fn default_max_maze_size() -> u32 {
    12
}

fn default_round_end_delay() -> u32 {
    180
}

/// Parameters fixed for the duration of a match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    /// Seed of the match random number generator.
    pub seed: u64,
    /// Number of tanks taking part.
    pub tank_count: u32,
    /// Upgrades that pickups may grant; empty disables pickups.
    pub allowed_upgrades: Vec<UpgradeKind>,
    /// Maze layout algorithm.
    pub maze_generation: MazeGeneration,
    /// Smallest maze side, inclusive.
    pub min_maze_size: u32,
    /// Largest maze side, exclusive.
    pub max_maze_size: u32,
    /// Ticks between the deciding kill and the next round.
    pub round_end_delay: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            tank_count: default_tank_count(),
            allowed_upgrades: UpgradeKind::ALL.to_vec(),
            maze_generation: MazeGeneration::default(),
            min_maze_size: default_min_maze_size(),
            max_maze_size: default_max_maze_size(),
            round_end_delay: default_round_end_delay(),
        }
    }
}

/// Recorded match: configuration plus one frame of inputs per tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Replay {
    /// Configuration the match was started with.
    pub config: MatchConfig,
    /// Inputs of every tank, one entry per tick in tank order.
    pub frames: Vec<Vec<KeyState>>,
}
