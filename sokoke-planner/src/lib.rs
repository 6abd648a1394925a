//! # sokoke-planner
//!
//! Persistence for the planner's `Status`, `Feature` and `Task` entities. The
//! `persistence` configuration key picks the backend once at startup:
//!
//! | `persistence` | Data access |
//! |---------------|-------------|
//! | `mongodb` | [`MongoDataAccess`](sokoke_data_mongodb::MongoDataAccess) |
//! | `sqlite` / `postgres` / `mysql` | [`SqlxDataAccess`](sokoke_data_sqlx::SqlxDataAccess) |
//!
//! ```ignore
//! let config = SokokeConfig::load("dev")?;
//! let planner = Planner::start(&config).await?;
//! let page = planner
//!     .features()
//!     .read_all(parse_query::<Feature>("page=2&limit=10&completed=false", &["completed"]).as_ref())
//!     .await;
//! ```

pub mod backend;
pub mod entities;
pub mod error;
pub mod planner;

pub use backend::{dialect_for, Backend};
pub use entities::{
    Feature, FeatureChanges, NewFeature, NewStatus, NewTask, Status, StatusChanges, Task,
    TaskChanges,
};
pub use error::StartupError;
pub use planner::Planner;
