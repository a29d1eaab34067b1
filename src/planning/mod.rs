// Graph-based dynamic planning

pub mod trajectory;
pub mod node;
pub mod searchable_set;
pub mod straight_line;
pub mod graph_dynamic_planner;

pub use trajectory::*;
pub use node::*;
pub use searchable_set::*;
pub use straight_line::*;
pub use graph_dynamic_planner::*;
