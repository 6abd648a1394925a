use sokoke_core::{DatabaseSettings, SokokeConfig};
use sokoke_data::{Bindings, Repository};

use crate::backend::Backend;
use crate::entities::{Feature, Status, Task};
use crate::error::StartupError;

/// The wired persistence layer: one backend, one repository per entity.
///
/// Bindings are fixed at construction and never change afterwards.
pub struct Planner {
    backend: Backend,
    bindings: Bindings,
    statuses: Repository<Status>,
    features: Repository<Feature>,
    tasks: Repository<Task>,
}

impl Planner {
    /// Connect to the store named by `persistence` and bind every entity.
    ///
    /// # Errors
    ///
    /// An unknown persistence value or an unreachable store.
    pub async fn start(config: &SokokeConfig) -> Result<Self, StartupError> {
        let settings = DatabaseSettings::from_config(config)?;
        tracing::info!(profile = config.profile(), settings = ?settings, "starting planner");
        let backend = Backend::connect(&settings).await?;
        Ok(Self::with_backend(backend))
    }

    /// Bind every entity against an already open backend.
    pub fn with_backend(backend: Backend) -> Self {
        let status_access = backend.data_access::<Status>();
        let feature_access = backend.data_access::<Feature>();
        let task_access = backend.data_access::<Task>();
        let bindings = Bindings::builder()
            .bind::<Status>(status_access.clone())
            .bind::<Feature>(feature_access.clone())
            .bind::<Task>(task_access.clone())
            .build();
        tracing::info!(family = ?backend.family(), bindings = ?bindings, "planner ready");

        Planner {
            backend,
            bindings,
            statuses: Repository::new(status_access),
            features: Repository::new(feature_access),
            tasks: Repository::new(task_access),
        }
    }

    pub fn statuses(&self) -> &Repository<Status> {
        &self.statuses
    }

    pub fn features(&self) -> &Repository<Feature> {
        &self.features
    }

    pub fn tasks(&self) -> &Repository<Task> {
        &self.tasks
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Close the storage connection.
    pub async fn shutdown(self) {
        self.backend.shutdown().await;
        tracing::info!("planner stopped");
    }
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("backend", &self.backend)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}
