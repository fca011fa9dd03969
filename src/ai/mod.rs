pub mod behavior;
pub mod pathfinding;
pub mod perception;

pub use behavior::{AiState, BehaviorAi, BehaviorTree, NodeStatus};
pub use pathfinding::{PathFollower, PathNode, PathResult, Pathfinding};
pub use perception::{has_line_of_sight, PerceptionComponent, PerceptionConfig};
