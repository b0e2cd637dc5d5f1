//! Weapon state machines driven by each tank's fire button.

use std::collections::BTreeSet;

use maze_tanks_core::{
    normalized, rotate, DeathRayId, Event, KeyState, MissileGuidance, MissileId, Number, Point,
    ShotId, ShotKind, TankId, TankState, TankUpgradeState, UpgradeKind,
};
use maze_tanks_system_motion::{MineDetails, MissileDetails, ShotDetails};
use rand::Rng;

use crate::round::Round;

/// Distance from the hull centre to the muzzle.
pub(crate) const CANNON_LENGTH: Number = Number::from_ratio(17, 100);

const SHOT_RADIUS: Number = Number::from_ratio(3, 100);
const SHOT_SPEED: Number = Number::from_ratio(1, 25);
const SHOT_TTL: i32 = 1_200;

/// Cannon shots a tank may have in flight at once.
pub(crate) const MAX_SHOTS: usize = 5;

const GATLING_RADIUS: Number = Number::from_ratio(3, 200);
const GATLING_SPEED: Number = Number::from_ratio(1, 20);
const GATLING_VARIANCE: Number = Number::from_ratio(1, 12);
const GATLING_TTL: i32 = 600;
const GATLING_INTERVAL: i32 = 10;
const GATLING_START_TIME: i32 = 30;

const LASER_RADIUS: Number = Number::from_ratio(1, 100);
const LASER_SPEED: Number = Number::from_int(10);
const LASER_TTL: i32 = 3;

const BOMB_RADIUS: Number = Number::from_ratio(5, 100);
const BOMB_SPEED: Number = Number::from_ratio(4, 100);

const MISSILE_LAUNCHER_LENGTH: Number = Number::from_ratio(1, 5);
const MINE_DISTANCE: Number = Number::from_ratio(7, 20);
const MINES_PER_UPGRADE: u32 = 3;
const DEATH_RAY_CHARGE: i32 = 60;

/// Everything a weapon sees of its tank during a tick.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Trigger {
    pub(crate) owner: TankId,
    pub(crate) state: TankState,
    pub(crate) previous: KeyState,
}

impl Trigger {
    fn pressed(&self) -> bool {
        self.state.key_state.fire_pressed_since(&self.previous)
    }

    fn muzzle(&self, length: Number) -> Point {
        self.state.position + self.state.direction * length
    }
}

/// Default weapon; caps the number of shots in flight.
#[derive(Clone, Debug, Default)]
pub(crate) struct Cannon {
    shots: BTreeSet<ShotId>,
}

impl Cannon {
    pub(crate) fn step(&mut self, trigger: &Trigger, round: &mut Round, out: &mut Vec<Event>) {
        if !trigger.pressed() || self.shots.len() >= MAX_SHOTS {
            return;
        }
        let shot = round.add_shot(
            ShotDetails {
                position: trigger.muzzle(CANNON_LENGTH),
                velocity: trigger.state.direction * SHOT_SPEED,
                radius: SHOT_RADIUS,
                timer: SHOT_TTL,
                kind: ShotKind::Bullet,
                owner: trigger.owner,
            },
            out,
        );
        let _ = self.shots.insert(shot);
    }

    pub(crate) fn on_event(&mut self, event: &Event) {
        if let Event::ShotRemoved { shot, .. } = event {
            let _ = self.shots.remove(shot);
        }
    }

    pub(crate) fn reset(&mut self) {
        self.shots.clear();
    }
}

/// Per-kind bookkeeping that does not fit the shared state cell.
#[derive(Clone, Copy, Debug)]
enum Arsenal {
    Gatling,
    Laser,
    Bomb { shot: Option<ShotId> },
    RcMissile { missile: Option<MissileId> },
    HomingMissile { missile: Option<MissileId> },
    Mines { remaining: u32 },
    DeathRay { ray: Option<DeathRayId> },
}

/// An upgrade a tank has collected and is currently using.
#[derive(Clone, Debug)]
pub(crate) struct AppliedUpgrade {
    state: TankUpgradeState,
    arsenal: Arsenal,
}

impl AppliedUpgrade {
    pub(crate) fn new(kind: UpgradeKind) -> Self {
        let (timer, arsenal) = match kind {
            UpgradeKind::Gatling => (-GATLING_START_TIME, Arsenal::Gatling),
            UpgradeKind::Laser => (0, Arsenal::Laser),
            UpgradeKind::Bomb => (0, Arsenal::Bomb { shot: None }),
            UpgradeKind::RcMissile => (0, Arsenal::RcMissile { missile: None }),
            UpgradeKind::HomingMissile => (0, Arsenal::HomingMissile { missile: None }),
            UpgradeKind::Mines => (
                0,
                Arsenal::Mines {
                    remaining: MINES_PER_UPGRADE,
                },
            ),
            UpgradeKind::DeathRay => (0, Arsenal::DeathRay { ray: None }),
        };
        Self {
            state: TankUpgradeState {
                kind,
                state: 0,
                timer,
            },
            arsenal,
        }
    }

    pub(crate) const fn state(&self) -> TankUpgradeState {
        self.state
    }

    pub(crate) const fn kind(&self) -> UpgradeKind {
        self.state.kind
    }

    /// Whether the tank may drive while this upgrade is held.
    pub(crate) const fn allows_moving(&self) -> bool {
        match self.arsenal {
            Arsenal::RcMissile { .. } | Arsenal::DeathRay { .. } => self.state.state == 0,
            _ => true,
        }
    }

    /// Runs one tick of the state machine; returns `true` once the upgrade is spent.
    pub(crate) fn step(
        &mut self,
        trigger: &Trigger,
        tanks: &[TankState],
        round: &mut Round,
        out: &mut Vec<Event>,
    ) -> bool {
        let pressed = trigger.pressed();
        let state = &mut self.state;
        match &mut self.arsenal {
            Arsenal::Gatling => {
                if pressed {
                    state.state = 1;
                }
                if state.state == 0 {
                    return false;
                }
                if !trigger.state.key_state.fire {
                    return true;
                }
                state.timer += 1;
                if state.timer >= 0 && state.timer % GATLING_INTERVAL == 0 {
                    let spread = GATLING_VARIANCE * round.rng().gen_range(-1_000..1_000) / 1_000;
                    let variance = normalized(Point::new(Number::ONE, spread));
                    let _ = round.add_shot(
                        ShotDetails {
                            position: trigger.muzzle(CANNON_LENGTH),
                            velocity: rotate(trigger.state.direction, variance) * GATLING_SPEED,
                            radius: GATLING_RADIUS,
                            timer: GATLING_TTL,
                            kind: ShotKind::Bullet,
                            owner: trigger.owner,
                        },
                        out,
                    );
                }
                false
            }
            Arsenal::Laser => {
                if !pressed {
                    return false;
                }
                let _ = round.add_shot(
                    ShotDetails {
                        position: trigger.muzzle(CANNON_LENGTH),
                        velocity: trigger.state.direction * LASER_SPEED,
                        radius: LASER_RADIUS,
                        timer: LASER_TTL,
                        kind: ShotKind::Laser,
                        owner: trigger.owner,
                    },
                    out,
                );
                true
            }
            Arsenal::Bomb { shot } => {
                if state.state == 1 {
                    let Some(id) = shot.filter(|id| round.has_shot(*id)) else {
                        return true;
                    };
                    if pressed {
                        *shot = None;
                        if let Some(position) = round.remove_shot(id, out) {
                            round.explode(position, out);
                        }
                        return true;
                    }
                    return false;
                }
                if pressed {
                    state.state = 1;
                    *shot = Some(round.add_shot(
                        ShotDetails {
                            position: trigger.muzzle(CANNON_LENGTH),
                            velocity: trigger.state.direction * BOMB_SPEED,
                            radius: BOMB_RADIUS,
                            timer: -1,
                            kind: ShotKind::Bullet,
                            owner: trigger.owner,
                        },
                        out,
                    ));
                }
                false
            }
            Arsenal::RcMissile { missile } => {
                if state.state == 1 {
                    return match missile.filter(|id| round.has_missile(*id)) {
                        Some(id) => {
                            round.steer_missile(id, trigger.state.key_state.turn());
                            false
                        }
                        None => true,
                    };
                }
                if pressed {
                    state.state = 1;
                    *missile = Some(launch(trigger, MissileGuidance::Remote, round, out));
                }
                false
            }
            Arsenal::HomingMissile { missile } => {
                if state.state == 1 {
                    return !missile.is_some_and(|id| round.has_missile(id));
                }
                if pressed {
                    state.state = 1;
                    *missile = Some(launch(trigger, MissileGuidance::Homing, round, out));
                }
                false
            }
            Arsenal::Mines { remaining } => {
                if pressed {
                    let _ = round.drop_mine(
                        MineDetails {
                            position: trigger.state.position
                                - trigger.state.direction * MINE_DISTANCE,
                            direction: trigger.state.direction,
                            owner: trigger.owner,
                        },
                        out,
                    );
                    *remaining = remaining.saturating_sub(1);
                }
                *remaining == 0
            }
            Arsenal::DeathRay { ray } => {
                if state.timer > 0 {
                    state.timer -= 1;
                    return false;
                }
                match state.state {
                    0 => {
                        if pressed {
                            state.state = 1;
                            state.timer = DEATH_RAY_CHARGE;
                        }
                        false
                    }
                    1 => {
                        state.state = 2;
                        *ray = Some(round.fire_death_ray(
                            trigger.owner,
                            trigger.muzzle(CANNON_LENGTH),
                            trigger.state.direction,
                            tanks,
                            out,
                        ));
                        false
                    }
                    _ => !ray.is_some_and(|id| round.has_death_ray(id)),
                }
            }
        }
    }

    /// Reacts to removals reported during the tick.
    ///
    /// A bomb shell destroyed by anything other than its owner's second press
    /// still detonates where it ended.
    pub(crate) fn on_event(&mut self, event: &Event, round: &mut Round, out: &mut Vec<Event>) {
        let Arsenal::Bomb { shot } = &mut self.arsenal else {
            return;
        };
        if let Event::ShotRemoved {
            shot: removed,
            position,
            ..
        } = event
        {
            if self.state.state == 1 && *shot == Some(*removed) {
                *shot = None;
                round.explode(*position, out);
            }
        }
    }
}

fn launch(
    trigger: &Trigger,
    guidance: MissileGuidance,
    round: &mut Round,
    out: &mut Vec<Event>,
) -> MissileId {
    round.launch_missile(
        MissileDetails {
            position: trigger.muzzle(MISSILE_LAUNCHER_LENGTH),
            direction: trigger.state.direction,
            owner: trigger.owner,
        },
        guidance,
        out,
    )
}
