pub mod dash;
pub mod movement;
pub mod state;
pub mod transition;

pub use dash::{DashController, DashResult};
pub use movement::MovementFSM;
pub use state::{CharacterState, CharacterStateComponent, DashState};
pub use transition::TransitionController;
