//! Planner entities with their schema and a mapper for each backend family.

mod feature;
mod status;
mod task;

pub use feature::{Feature, FeatureChanges, NewFeature};
pub use status::{
    NewStatus, Status, StatusChanges, DEFAULT_ACCENT_COLOR, DEFAULT_BG_COLOR, DEFAULT_TEXT_COLOR,
};
pub use task::{NewTask, Task, TaskChanges};
