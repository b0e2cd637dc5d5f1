//! Per-player controller: input queue, weapons and the tank body.

use std::collections::VecDeque;

use maze_tanks_core::{Event, KeyState, Point, TankId, TankState};
use maze_tanks_system_motion::advance_tank;

use crate::round::Round;
use crate::weapons::{AppliedUpgrade, Cannon, Trigger};

#[derive(Clone, Debug, Default)]
pub(crate) struct Tank {
    pending: VecDeque<KeyState>,
    cannon: Cannon,
    pub(crate) upgrade: Option<AppliedUpgrade>,
    pub(crate) score: u32,
}

impl Tank {
    pub(crate) fn queue(&mut self, keys: KeyState) {
        self.pending.push_back(keys);
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn can_advance(&self, state: &TankState) -> bool {
        !state.active || !self.pending.is_empty()
    }

    /// Places the tank for a fresh round and forgets everything it carried.
    pub(crate) fn reset(&mut self, state: &mut TankState, position: Point, direction: Point) {
        state.position = position;
        state.direction = direction;
        state.key_state = KeyState::default();
        state.alive = true;
        self.pending.clear();
        self.cannon.reset();
        self.upgrade = None;
    }

    /// Consumes one input and runs the tank's motion and weapon for a tick.
    pub(crate) fn advance(
        &mut self,
        id: TankId,
        tanks: &mut [TankState],
        round: &mut Round,
        out: &mut Vec<Event>,
    ) {
        let state = &mut tanks[id.index()];
        let previous = state.key_state;
        state.key_state = if state.active {
            self.pending.pop_front().unwrap_or_default()
        } else {
            KeyState::default()
        };
        if !state.alive {
            return;
        }

        let moving = self
            .upgrade
            .as_ref()
            .map_or(true, AppliedUpgrade::allows_moving);
        if moving {
            advance_tank(state, round.maze());
        }
        let trigger = Trigger {
            owner: id,
            state: *state,
            previous,
        };

        match &mut self.upgrade {
            Some(upgrade) => {
                if upgrade.step(&trigger, tanks, round, out) {
                    let kind = upgrade.kind();
                    self.upgrade = None;
                    log::debug!("tank {} used up {kind:?}", id.get());
                    out.push(Event::UpgradeExpired { tank: id, kind });
                }
            }
            None => self.cannon.step(&trigger, round, out),
        }
    }

    /// Hands a removal or detonation notice to the tank's weapons.
    pub(crate) fn notify(&mut self, event: &Event, round: &mut Round, out: &mut Vec<Event>) {
        self.cannon.on_event(event);
        if let Some(upgrade) = &mut self.upgrade {
            upgrade.on_event(event, round, out);
        }
    }

    /// Drops a held upgrade once the tank has been destroyed.
    pub(crate) fn disarm(&mut self, id: TankId, out: &mut Vec<Event>) {
        if let Some(upgrade) = self.upgrade.take() {
            out.push(Event::UpgradeExpired {
                tank: id,
                kind: upgrade.kind(),
            });
        }
    }
}
