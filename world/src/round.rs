//! One maze instance and every transient body living in it.

use std::collections::BTreeMap;

use maze_tanks_core::{
    CellCoord, DeathRayId, Event, KillCause, MatchConfig, Maze, MineId, MissileGuidance,
    MissileId, Number, Point, ShotId, TankId, TankState, UpgradeId, UpgradeKind,
};
use maze_tanks_system_maze_generation::generate;
use maze_tanks_system_motion::{
    death_ray_path, discrete_direction, shrapnel_wall_fraction, upgrade_touched_by, MineDetails,
    MissileDetails, ShotDetails, ShrapnelDetails, DIRECTION_COUNT,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::entities::{DeathRay, Flight, Mine, Missile, Shot, Shrapnel, Upgrade};
use crate::navigation::MazeMap;

const ROUND_SEED_LABEL: &str = "round";

/// Fragments thrown out by one explosion.
const EXPLOSION_FRAGMENTS: usize = 100;

/// Shortest and longest fragment travel, the latter exclusive.
const EXPLOSION_RANGE: (Number, Number) = (Number::from_int(4), Number::from_int(5));

/// Countdown range between upgrade spawns, the upper bound exclusive.
const UPGRADE_DELAY: (i32, i32) = (60, 120);

/// Authoritative state of the current round.
#[derive(Debug)]
pub(crate) struct Round {
    number: u32,
    maze: Maze,
    maze_map: MazeMap,
    rng: ChaCha8Rng,
    allowed_upgrades: Vec<UpgradeKind>,
    next_id: u32,
    upgrade_timer: i32,
    pub(crate) shots: BTreeMap<ShotId, Shot>,
    pub(crate) missiles: BTreeMap<MissileId, Missile>,
    pub(crate) mines: BTreeMap<MineId, Mine>,
    pub(crate) death_rays: BTreeMap<DeathRayId, DeathRay>,
    pub(crate) shrapnel: Vec<Shrapnel>,
    pub(crate) upgrades: BTreeMap<UpgradeId, Upgrade>,
}

impl Round {
    /// Generates the maze of round `number` from the match seed.
    pub(crate) fn new(number: u32, config: &MatchConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(round_seed(config.seed, number));
        let upgrade_timer = rng.gen_range(UPGRADE_DELAY.0..UPGRADE_DELAY.1);
        let width = rng.gen_range(config.min_maze_size..config.max_maze_size);
        let height = rng.gen_range(config.min_maze_size..config.max_maze_size);
        let maze = generate(config.maze_generation, width, height, &mut rng);
        let maze_map = MazeMap::new(&maze);
        log::debug!("round {number}: generated {width}x{height} maze");

        Self {
            number,
            maze,
            maze_map,
            rng,
            allowed_upgrades: config.allowed_upgrades.clone(),
            next_id: 0,
            upgrade_timer,
            shots: BTreeMap::new(),
            missiles: BTreeMap::new(),
            mines: BTreeMap::new(),
            death_rays: BTreeMap::new(),
            shrapnel: Vec::new(),
            upgrades: BTreeMap::new(),
        }
    }

    pub(crate) const fn number(&self) -> u32 {
        self.number
    }

    pub(crate) fn maze(&self) -> &Maze {
        &self.maze
    }

    pub(crate) fn maze_map(&self) -> &MazeMap {
        &self.maze_map
    }

    pub(crate) fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Random cell centre and discrete heading for a tank entering the round.
    pub(crate) fn spawn_point(&mut self) -> (Point, Point) {
        let column = self.rng.gen_range(0..self.maze.width());
        let row = self.rng.gen_range(0..self.maze.height());
        let direction = discrete_direction(self.rng.gen_range(0..DIRECTION_COUNT));
        (CellCoord::new(column, row).center(), direction)
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn add_shot(&mut self, details: ShotDetails, out: &mut Vec<Event>) -> ShotId {
        let id = ShotId::new(self.allocate());
        let _ = self.shots.insert(id, Shot::new(details));
        out.push(Event::ShotFired {
            shot: id,
            owner: details.owner,
            kind: details.kind,
        });
        id
    }

    pub(crate) fn has_shot(&self, id: ShotId) -> bool {
        self.shots.contains_key(&id)
    }

    /// Removes a shot, reporting where it ended.
    pub(crate) fn remove_shot(&mut self, id: ShotId, out: &mut Vec<Event>) -> Option<Point> {
        let shot = self.shots.remove(&id)?;
        out.push(Event::ShotRemoved {
            shot: id,
            owner: shot.details.owner,
            position: shot.details.position,
        });
        Some(shot.details.position)
    }

    pub(crate) fn launch_missile(
        &mut self,
        details: MissileDetails,
        guidance: MissileGuidance,
        out: &mut Vec<Event>,
    ) -> MissileId {
        let id = MissileId::new(self.allocate());
        let _ = self.missiles.insert(id, Missile::new(details, guidance));
        out.push(Event::MissileLaunched {
            missile: id,
            owner: details.owner,
            guidance,
        });
        id
    }

    pub(crate) fn has_missile(&self, id: MissileId) -> bool {
        self.missiles.contains_key(&id)
    }

    pub(crate) fn steer_missile(&mut self, id: MissileId, turn: i32) {
        if let Some(missile) = self.missiles.get_mut(&id) {
            missile.steer(turn);
        }
    }

    fn remove_missile(&mut self, id: MissileId, out: &mut Vec<Event>) {
        if let Some(missile) = self.missiles.remove(&id) {
            out.push(Event::MissileRemoved {
                missile: id,
                owner: missile.details.owner,
                position: missile.details.position,
            });
        }
    }

    pub(crate) fn drop_mine(&mut self, details: MineDetails, out: &mut Vec<Event>) -> MineId {
        let id = MineId::new(self.allocate());
        let _ = self.mines.insert(id, Mine::new(details));
        out.push(Event::MineDropped {
            mine: id,
            owner: details.owner,
            position: details.position,
        });
        id
    }

    /// Traces and registers a death ray fired by `owner` from `origin`.
    pub(crate) fn fire_death_ray(
        &mut self,
        owner: TankId,
        origin: Point,
        direction: Point,
        tanks: &[TankState],
        out: &mut Vec<Event>,
    ) -> DeathRayId {
        let path = death_ray_path(origin, direction, owner, tanks, &self.maze);
        let id = DeathRayId::new(self.allocate());
        let _ = self.death_rays.insert(id, DeathRay::new(owner, path));
        out.push(Event::DeathRayFired { ray: id, owner });
        id
    }

    pub(crate) fn has_death_ray(&self, id: DeathRayId) -> bool {
        self.death_rays.contains_key(&id)
    }

    /// Throws a burst of fragments out of `source`.
    pub(crate) fn explode(&mut self, source: Point, out: &mut Vec<Event>) {
        let (shortest, longest) = EXPLOSION_RANGE;
        let ways: Vec<Point> = (0..EXPLOSION_FRAGMENTS)
            .map(|_| {
                let direction = discrete_direction(self.rng.gen_range(0..DIRECTION_COUNT));
                let reach = Number::from_raw(self.rng.gen_range(shortest.raw()..longest.raw()));
                direction * reach
            })
            .collect();
        for way in ways {
            let details = ShrapnelDetails { source, way };
            self.shrapnel.push(Shrapnel {
                collision: shrapnel_wall_fraction(&details, &self.maze),
                details,
                timer: 0,
            });
        }
        out.push(Event::Explosion { position: source });
    }

    /// Advances every body by one tick, in a fixed order.
    pub(crate) fn step(&mut self, tanks: &mut [TankState], out: &mut Vec<Event>) {
        self.step_shots(tanks, out);
        self.step_missiles(tanks, out);
        self.step_mines(tanks, out);
        self.step_death_rays(tanks, out);
        self.step_shrapnel(tanks, out);

        self.upgrade_timer -= 1;
        if self.upgrade_timer <= 0 {
            self.spawn_upgrade(tanks, out);
            self.upgrade_timer = self.rng.gen_range(UPGRADE_DELAY.0..UPGRADE_DELAY.1);
        }
    }

    fn step_shots(&mut self, tanks: &mut [TankState], out: &mut Vec<Event>) {
        let mut finished = Vec::new();
        for (&id, shot) in &mut self.shots {
            match shot.step(&self.maze, tanks) {
                Flight::Continues => {}
                Flight::Expired => finished.push(id),
                Flight::Struck(tank) => {
                    let owner = shot.details.owner;
                    kill(tanks, tank, KillCause::Shot { owner }, out);
                    finished.push(id);
                }
            }
        }
        for id in finished {
            let _ = self.remove_shot(id, out);
        }
    }

    fn step_missiles(&mut self, tanks: &mut [TankState], out: &mut Vec<Event>) {
        let mut finished = Vec::new();
        for (&id, missile) in &mut self.missiles {
            match missile.step(&self.maze, &self.maze_map, tanks) {
                Flight::Continues => {}
                Flight::Expired => finished.push(id),
                Flight::Struck(tank) => {
                    let owner = missile.details.owner;
                    kill(tanks, tank, KillCause::Missile { owner }, out);
                    finished.push(id);
                }
            }
        }
        for id in finished {
            self.remove_missile(id, out);
        }
    }

    fn step_mines(&mut self, tanks: &[TankState], out: &mut Vec<Event>) {
        let detonated: Vec<MineId> = self
            .mines
            .iter_mut()
            .filter_map(|(&id, mine)| mine.step(tanks).then_some(id))
            .collect();
        for id in detonated {
            if let Some(mine) = self.mines.remove(&id) {
                let position = mine.details.position;
                out.push(Event::MineDetonated { mine: id, position });
                self.explode(position, out);
            }
        }
    }

    fn step_death_rays(&mut self, tanks: &mut [TankState], out: &mut Vec<Event>) {
        let mut finished = Vec::new();
        for (&id, ray) in &mut self.death_rays {
            match ray.step(tanks) {
                Some(victims) => {
                    let owner = ray.owner;
                    for victim in victims {
                        kill(tanks, victim, KillCause::DeathRay { owner }, out);
                    }
                }
                None => finished.push(id),
            }
        }
        for id in finished {
            if let Some(ray) = self.death_rays.remove(&id) {
                out.push(Event::DeathRayRemoved {
                    ray: id,
                    owner: ray.owner,
                });
            }
        }
    }

    fn step_shrapnel(&mut self, tanks: &mut [TankState], out: &mut Vec<Event>) {
        self.shrapnel.retain_mut(|fragment| match fragment.step(tanks) {
            Some(victims) => {
                for victim in victims {
                    kill(tanks, victim, KillCause::Shrapnel, out);
                }
                true
            }
            None => false,
        });
    }

    /// Places an upgrade in a random cell unless that cell is taken.
    fn spawn_upgrade(&mut self, tanks: &[TankState], out: &mut Vec<Event>) {
        if self.allowed_upgrades.is_empty() {
            return;
        }
        let cell = CellCoord::new(
            self.rng.gen_range(0..self.maze.width()),
            self.rng.gen_range(0..self.maze.height()),
        );
        if self.upgrades.values().any(|upgrade| upgrade.cell == cell) {
            return;
        }
        let (width, height) = (self.maze.width(), self.maze.height());
        if tanks
            .iter()
            .any(|tank| CellCoord::containing(tank.position, width, height) == Some(cell))
        {
            return;
        }
        let kind = self.allowed_upgrades[self.rng.gen_range(0..self.allowed_upgrades.len())];
        let id = UpgradeId::new(self.allocate());
        let _ = self.upgrades.insert(id, Upgrade { cell, kind });
        out.push(Event::UpgradeSpawned {
            upgrade: id,
            cell,
            kind,
        });
    }

    /// Hands the first pickup the tank is touching to it.
    pub(crate) fn collect_upgrade(
        &mut self,
        tank: TankId,
        state: &TankState,
        out: &mut Vec<Event>,
    ) -> Option<UpgradeKind> {
        let id = self
            .upgrades
            .iter()
            .find(|(_, upgrade)| upgrade_touched_by(upgrade.cell, state))
            .map(|(&id, _)| id)?;
        let upgrade = self.upgrades.remove(&id)?;
        out.push(Event::UpgradeCollected {
            upgrade: id,
            tank,
            kind: upgrade.kind,
        });
        Some(upgrade.kind)
    }
}

/// Marks a live tank as dead and reports it.
fn kill(tanks: &mut [TankState], tank: TankId, cause: KillCause, out: &mut Vec<Event>) {
    let Some(state) = tanks.get_mut(tank.index()) else {
        return;
    };
    if !state.alive {
        return;
    }
    state.alive = false;
    log::debug!("tank {} killed by {cause:?}", tank.get());
    out.push(Event::TankKilled { tank, cause });
}

/// Seed of the generator driving round `round` of a match.
fn round_seed(match_seed: u64, round: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(match_seed.to_le_bytes());
    hasher.update(ROUND_SEED_LABEL.as_bytes());
    hasher.update(round.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_tanks_core::{KeyState, ShotKind};

    fn config(seed: u64) -> MatchConfig {
        MatchConfig {
            seed,
            ..MatchConfig::default()
        }
    }

    fn idle_tank(position: Point) -> TankState {
        TankState {
            position,
            direction: Point::new(Number::ONE, Number::ZERO),
            key_state: KeyState::default(),
            active: true,
            alive: true,
        }
    }

    #[test]
    fn round_seeds_differ_per_round_and_match() {
        assert_ne!(round_seed(1, 0), round_seed(1, 1));
        assert_ne!(round_seed(1, 0), round_seed(2, 0));
        assert_eq!(round_seed(7, 3), round_seed(7, 3));
    }

    #[test]
    fn same_seed_generates_same_maze() {
        let first = Round::new(4, &config(99));
        let second = Round::new(4, &config(99));
        assert_eq!(first.maze(), second.maze());
        let size = MatchConfig::default();
        assert!((size.min_maze_size..size.max_maze_size).contains(&first.maze().width()));
        assert!((size.min_maze_size..size.max_maze_size).contains(&first.maze().height()));
    }

    #[test]
    fn identifiers_are_shared_across_kinds() {
        let mut round = Round::new(0, &config(1));
        let mut out = Vec::new();
        let shot = round.add_shot(
            ShotDetails {
                position: CellCoord::new(0, 0).center(),
                velocity: Point::ZERO,
                radius: Number::from_ratio(3, 100),
                timer: 10,
                kind: ShotKind::Bullet,
                owner: TankId::new(0),
            },
            &mut out,
        );
        let mine = round.drop_mine(
            MineDetails {
                position: CellCoord::new(1, 1).center(),
                direction: Point::new(Number::ONE, Number::ZERO),
                owner: TankId::new(0),
            },
            &mut out,
        );
        assert_eq!(shot.get(), 0);
        assert_eq!(mine.get(), 1);
        assert_eq!(out.len(), 2);
        assert_eq!(
            round.remove_shot(shot, &mut out),
            Some(CellCoord::new(0, 0).center())
        );
        assert_eq!(round.remove_shot(shot, &mut out), None);
    }

    #[test]
    fn explosion_fragments_stay_inside_the_arena() {
        let mut round = Round::new(0, &config(5));
        let mut out = Vec::new();
        let source = CellCoord::new(1, 1).center();
        round.explode(source, &mut out);
        assert_eq!(round.shrapnel.len(), EXPLOSION_FRAGMENTS);
        assert_eq!(out, vec![Event::Explosion { position: source }]);
        for fragment in &round.shrapnel {
            assert!(fragment.collision <= Number::ONE);
            let stop = fragment.details.source + fragment.details.way * fragment.collision;
            assert!(round.maze().contains(stop));
        }
    }

    #[test]
    fn explosion_kills_nearby_tank_within_its_lifetime() {
        let mut round = Round::new(0, &config(11));
        let mut out = Vec::new();
        let center = CellCoord::new(2, 2).center();
        let mut tanks = [idle_tank(center + Point::new(Number::from_ratio(1, 2), Number::ZERO))];
        round.explode(center, &mut out);
        for _ in 0..60 {
            round.step_shrapnel(&mut tanks, &mut out);
        }
        assert!(round.shrapnel.is_empty());
        assert!(out
            .iter()
            .any(|event| matches!(event, Event::TankKilled { cause: KillCause::Shrapnel, .. })));
        assert!(!tanks[0].alive);
    }
}
