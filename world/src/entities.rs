//! Per-tick behaviour of the transient bodies owned by a round.

use maze_tanks_core::{
    cross, dot, normalized, CellCoord, Maze, MineState, MissileGuidance, Number, Point, TankId,
    TankState, UpgradeKind,
};
use maze_tanks_system_motion::{
    advance_missile, advance_shot, death_ray_hits, mine_pressed_by, missile_overlaps,
    shrapnel_tank_fraction, shrapnel_way, MineDetails, MissileDetails, ShotDetails,
    ShrapnelDetails, SHRAPNEL_TTL, TURN_SIN,
};

use crate::navigation::MazeMap;

/// Ticks a missile flies before it burns out.
pub(crate) const MISSILE_TTL: i32 = 1_200;

/// Ticks a homing missile flies straight before it starts tracking.
pub(crate) const HOMING_DELAY: i32 = 60;

/// Ticks between a mine being dropped and it reacting to tanks.
pub(crate) const MINE_ARMING_TIME: i32 = 60;

/// Ticks between a mine being released and its detonation.
pub(crate) const MINE_COUNTDOWN: i32 = 60;

/// Ticks a death ray stays lethal.
pub(crate) const DEATH_RAY_TTL: i32 = 30;

/// Outcome of stepping a body that can strike a tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flight {
    Continues,
    Expired,
    Struck(TankId),
}

#[derive(Clone, Debug)]
pub(crate) struct Shot {
    pub(crate) details: ShotDetails,
    pub(crate) ignored: Option<TankId>,
    pub(crate) path: Vec<Point>,
}

impl Shot {
    pub(crate) fn new(details: ShotDetails) -> Self {
        Self {
            ignored: Some(details.owner),
            path: vec![details.position],
            details,
        }
    }

    pub(crate) fn step(&mut self, maze: &Maze, tanks: &[TankState]) -> Flight {
        if let Some(tank) = advance_shot(
            &mut self.details,
            &mut self.ignored,
            maze,
            tanks,
            &mut self.path,
        ) {
            return Flight::Struck(tank);
        }
        if self.details.timer > 0 {
            self.details.timer -= 1;
        }
        if self.details.timer == 0 {
            Flight::Expired
        } else {
            Flight::Continues
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Guidance {
    Remote { turn: i32 },
    Homing {
        delay: i32,
        turn: i32,
        target: Option<TankId>,
    },
}

impl Guidance {
    pub(crate) fn new(kind: MissileGuidance) -> Self {
        match kind {
            MissileGuidance::Remote => Self::Remote { turn: 0 },
            MissileGuidance::Homing => Self::Homing {
                delay: HOMING_DELAY,
                turn: 0,
                target: None,
            },
        }
    }

    pub(crate) const fn kind(&self) -> MissileGuidance {
        match self {
            Self::Remote { .. } => MissileGuidance::Remote,
            Self::Homing { .. } => MissileGuidance::Homing,
        }
    }

    const fn turn(&self) -> i32 {
        match self {
            Self::Remote { turn } | Self::Homing { turn, .. } => *turn,
        }
    }

    pub(crate) const fn target(&self) -> Option<TankId> {
        match self {
            Self::Remote { .. } => None,
            Self::Homing { target, .. } => *target,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Missile {
    pub(crate) details: MissileDetails,
    pub(crate) guidance: Guidance,
    pub(crate) timer: i32,
    ignoring_owner: bool,
}

impl Missile {
    pub(crate) fn new(details: MissileDetails, guidance: MissileGuidance) -> Self {
        Self {
            details,
            guidance: Guidance::new(guidance),
            timer: MISSILE_TTL,
            ignoring_owner: true,
        }
    }

    /// Remote steering input for the coming tick; ignored by homing missiles.
    pub(crate) fn steer(&mut self, turn: i32) {
        if let Guidance::Remote { turn: current } = &mut self.guidance {
            *current = turn;
        }
    }

    pub(crate) fn step(&mut self, maze: &Maze, maze_map: &MazeMap, tanks: &[TankState]) -> Flight {
        advance_missile(&mut self.details, self.guidance.turn(), maze);

        let owner = self.details.owner.index();
        for (index, tank) in tanks.iter().enumerate() {
            if tank.alive && missile_overlaps(&self.details, tank) {
                if index == owner && self.ignoring_owner {
                    continue;
                }
                return Flight::Struck(TankId::new(index as u32));
            }
            if index == owner {
                self.ignoring_owner = false;
            }
        }

        match &mut self.guidance {
            Guidance::Remote { turn } => *turn = 0,
            Guidance::Homing {
                delay,
                turn,
                target,
            } => {
                if *delay > 0 {
                    *delay -= 1;
                } else {
                    (*turn, *target) = homing_turn(maze_map, &self.details, tanks);
                }
            }
        }

        if self.timer > 0 {
            self.timer -= 1;
        }
        if self.timer == 0 {
            Flight::Expired
        } else {
            Flight::Continues
        }
    }
}

/// Steering signal of a homing missile and the tank it is chasing.
///
/// The chased tank is the live enemy with the fewest maze hops from the
/// missile, lower index first on ties. The missile aims at the centre of the
/// next cell on the route, or at the tank itself once they share a cell.
pub(crate) fn homing_turn(
    maze_map: &MazeMap,
    missile: &MissileDetails,
    tanks: &[TankState],
) -> (i32, Option<TankId>) {
    let Some(cell) = cell_of(maze_map, missile.position) else {
        return (0, None);
    };

    let mut best: Option<(u32, usize, CellCoord)> = None;
    for (index, tank) in tanks.iter().enumerate() {
        if !tank.alive || index == missile.owner.index() {
            continue;
        }
        let Some(tank_cell) = cell_of(maze_map, tank.position) else {
            continue;
        };
        let Some(distance) = maze_map.distance(cell, tank_cell) else {
            continue;
        };
        if best.map_or(true, |(current, _, _)| distance < current) {
            best = Some((distance, index, tank_cell));
        }
    }
    let Some((distance, index, tank_cell)) = best else {
        return (0, None);
    };

    let aim = if distance == 0 {
        tanks[index].position
    } else {
        match maze_map.route(cell, tank_cell) {
            Some(route) => route.next_cell(cell).center(),
            None => tanks[index].position,
        }
    };
    let wanted = normalized(aim - missile.position);
    let side = cross(missile.direction, wanted);
    let threshold = TURN_SIN / 2;
    let turn = if side > threshold {
        1
    } else if side < -threshold {
        -1
    } else if dot(missile.direction, wanted) < Number::ZERO {
        1
    } else {
        0
    };
    (turn, Some(TankId::new(index as u32)))
}

fn cell_of(maze_map: &MazeMap, position: Point) -> Option<CellCoord> {
    let (width, height) = maze_map.dimensions();
    CellCoord::containing(position, width, height)
}

#[derive(Clone, Debug)]
pub(crate) struct Mine {
    pub(crate) details: MineDetails,
    timer: i32,
    started: bool,
    pressed: bool,
}

impl Mine {
    pub(crate) fn new(details: MineDetails) -> Self {
        Self {
            details,
            timer: MINE_ARMING_TIME,
            started: false,
            pressed: false,
        }
    }

    /// Advances the pressure plate; returns `true` when the mine detonates.
    pub(crate) fn step(&mut self, tanks: &[TankState]) -> bool {
        if self.timer == 0 {
            if self.started {
                return true;
            }
            self.started = true;
        }
        if self.timer >= 0 {
            self.timer -= 1;
            return false;
        }

        let previously_pressed = self.pressed;
        self.pressed = tanks.iter().any(|tank| mine_pressed_by(&self.details, tank));
        if previously_pressed && !self.pressed {
            self.timer = MINE_COUNTDOWN;
        }
        false
    }

    pub(crate) const fn state(&self) -> MineState {
        if self.started && self.timer >= 0 {
            MineState::Counting
        } else if self.pressed {
            MineState::Pressed
        } else {
            MineState::Inactive
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct DeathRay {
    pub(crate) owner: TankId,
    pub(crate) path: Vec<Point>,
    pub(crate) timer: i32,
}

impl DeathRay {
    pub(crate) fn new(owner: TankId, path: Vec<Point>) -> Self {
        Self {
            owner,
            path,
            timer: DEATH_RAY_TTL,
        }
    }

    /// Counts down the ray; returns `None` once it has faded and the tanks it
    /// touches otherwise.
    pub(crate) fn step(&mut self, tanks: &[TankState]) -> Option<Vec<TankId>> {
        self.timer -= 1;
        if self.timer <= 0 {
            return None;
        }
        Some(
            tanks
                .iter()
                .enumerate()
                .filter(|(index, tank)| {
                    *index != self.owner.index() && death_ray_hits(&self.path, tank)
                })
                .map(|(index, _)| TankId::new(index as u32))
                .collect(),
        )
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Shrapnel {
    pub(crate) details: ShrapnelDetails,
    pub(crate) collision: Number,
    pub(crate) timer: i32,
}

impl Shrapnel {
    /// Advances the fragment; returns `None` once it has expired and the tanks
    /// it sweeps through this tick otherwise.
    pub(crate) fn step(&mut self, tanks: &[TankState]) -> Option<Vec<TankId>> {
        let start = shrapnel_way(self.timer);
        self.timer += 1;
        if self.timer > SHRAPNEL_TTL {
            return None;
        }
        if start > self.collision {
            return Some(Vec::new());
        }
        let end = shrapnel_way(self.timer).min(self.collision);
        Some(
            tanks
                .iter()
                .enumerate()
                .filter(|(_, tank)| tank.alive)
                .filter_map(|(index, tank)| {
                    let fraction = shrapnel_tank_fraction(&self.details, tank)?;
                    (start < fraction && fraction < end).then_some(TankId::new(index as u32))
                })
                .collect(),
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Upgrade {
    pub(crate) cell: CellCoord,
    pub(crate) kind: UpgradeKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_tanks_core::KeyState;

    fn tank(column: u32, row: u32) -> TankState {
        TankState {
            position: CellCoord::new(column, row).center(),
            direction: Point::new(Number::ONE, Number::ZERO),
            key_state: KeyState::default(),
            active: true,
            alive: true,
        }
    }

    #[test]
    fn homing_missile_flies_straight_at_enemy_ahead() {
        let maze = Maze::open(6, 3);
        let map = MazeMap::new(&maze);
        let missile = MissileDetails {
            position: Point::new(Number::from_ratio(7, 10), Number::from_ratio(1, 2)),
            direction: Point::new(Number::ONE, Number::ZERO),
            owner: TankId::new(0),
        };
        let tanks = [tank(0, 0), tank(4, 0)];
        assert_eq!(homing_turn(&map, &missile, &tanks), (0, Some(TankId::new(1))));
    }

    #[test]
    fn homing_missile_turns_toward_enemy_below() {
        let maze = Maze::open(3, 3);
        let map = MazeMap::new(&maze);
        let missile = MissileDetails {
            position: CellCoord::new(1, 0).center(),
            direction: Point::new(Number::ONE, Number::ZERO),
            owner: TankId::new(0),
        };
        let tanks = [tank(0, 0), tank(1, 2)];
        assert_eq!(homing_turn(&map, &missile, &tanks), (1, Some(TankId::new(1))));
    }

    #[test]
    fn homing_missile_without_enemies_keeps_course() {
        let maze = Maze::open(3, 3);
        let map = MazeMap::new(&maze);
        let missile = MissileDetails {
            position: CellCoord::new(1, 1).center(),
            direction: Point::new(Number::ONE, Number::ZERO),
            owner: TankId::new(0),
        };
        let dead = TankState {
            alive: false,
            ..tank(2, 2)
        };
        assert_eq!(homing_turn(&map, &missile, &[tank(0, 0), dead]), (0, None));
    }

    #[test]
    fn mine_counts_down_only_after_release() {
        let details = MineDetails {
            position: CellCoord::new(1, 1).center(),
            direction: Point::new(Number::ONE, Number::ZERO),
            owner: TankId::new(0),
        };
        let mut mine = Mine::new(details);
        let on_top = [tank(1, 1)];
        let away = [tank(3, 3)];

        for _ in 0..=MINE_ARMING_TIME {
            assert!(!mine.step(&away));
        }
        assert_eq!(mine.state(), MineState::Inactive);

        for _ in 0..200 {
            assert!(!mine.step(&on_top));
            assert_eq!(mine.state(), MineState::Pressed);
        }

        assert!(!mine.step(&away));
        assert_eq!(mine.state(), MineState::Counting);
        let mut ticks = 1;
        while !mine.step(&away) {
            ticks += 1;
            assert!(ticks < 200);
        }
        assert_eq!(ticks, MINE_COUNTDOWN + 1);
    }

    #[test]
    fn shot_expires_when_timer_runs_out() {
        let maze = Maze::open(4, 4);
        let mut shot = Shot::new(ShotDetails {
            position: CellCoord::new(1, 1).center(),
            velocity: Point::new(Number::ZERO, Number::from_ratio(1, 100)),
            radius: Number::from_ratio(3, 100),
            timer: 2,
            kind: maze_tanks_core::ShotKind::Bullet,
            owner: TankId::new(0),
        });
        assert_eq!(shot.step(&maze, &[]), Flight::Continues);
        assert_eq!(shot.step(&maze, &[]), Flight::Expired);
    }
}
