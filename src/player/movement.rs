//! Closed character movement state machine. Disallowed transitions fail
//! without mutating state; self-transitions are no-ops.

use crate::core::state_machine::StateMachine;
use crate::player::state::CharacterState;

pub struct MovementFSM {
    sm: StateMachine<CharacterState>,
}

impl Default for MovementFSM {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementFSM {
    pub fn new() -> Self {
        use CharacterState::*;
        let sm = StateMachine::new(Grounded);

        sm.add_transition(Grounded, Jumping);
        sm.add_transition(Grounded, Falling);
        sm.add_transition(Grounded, Flying);
        sm.add_transition(Grounded, Dashing);

        sm.add_transition(Jumping, Falling);
        sm.add_transition(Jumping, Flying);

        sm.add_transition(Falling, Grounded);
        sm.add_transition(Falling, Flying);

        sm.add_transition(Flying, Falling);
        sm.add_transition(Flying, Grounded);
        sm.add_transition(Flying, Boosting);

        sm.add_transition(Dashing, Grounded);
        sm.add_transition(Dashing, Falling);

        sm.add_transition(Boosting, Flying);
        sm.add_transition(Boosting, Falling);

        Self { sm }
    }

    /// Attempt a transition; `false` leaves the current state untouched.
    pub fn try_transition(&self, target: CharacterState) -> bool {
        let current = self.sm.state();
        if !self.sm.is_valid_transition(current, target) {
            return false;
        }
        self.sm.set_state(target).is_ok()
    }

    pub fn current_state(&self) -> CharacterState {
        self.sm.state()
    }

    pub fn is_grounded(&self) -> bool {
        self.sm.state() == CharacterState::Grounded
    }

    pub fn is_airborne(&self) -> bool {
        matches!(
            self.sm.state(),
            CharacterState::Jumping | CharacterState::Falling
        )
    }

    pub fn is_flying(&self) -> bool {
        matches!(
            self.sm.state(),
            CharacterState::Flying | CharacterState::Boosting
        )
    }

    pub fn can_dash(&self) -> bool {
        self.sm.state() == CharacterState::Grounded
    }
}
