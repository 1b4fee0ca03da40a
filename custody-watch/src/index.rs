use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::RwLock;

use custody_ingest::{find_owning_project, Project};

/// The configured project roster, cached in memory and refreshed on a
/// cache miss: a file appearing under no known project triggers a reload
/// before giving up.
#[derive(Clone)]
pub struct ProjectIndex {
    pool: PgPool,
    projects: Arc<RwLock<Vec<Project>>>,
}

impl ProjectIndex {
    pub async fn load(pool: PgPool) -> anyhow::Result<Self> {
        let projects = custody_ingest::project::list_projects(&pool).await?;
        Ok(Self { pool, projects: Arc::new(RwLock::new(projects)) })
    }

    async fn refresh(&self) -> anyhow::Result<()> {
        let fresh = custody_ingest::project::list_projects(&self.pool).await?;
        *self.projects.write().await = fresh;
        Ok(())
    }

    /// Finds the project owning `relative_path`, reloading the roster once
    /// on a cache miss before concluding the file truly has no project.
    pub async fn find(&self, relative_path: &str) -> anyhow::Result<Option<Project>> {
        {
            let projects = self.projects.read().await;
            if let Some(p) = find_owning_project(&projects, relative_path) {
                return Ok(Some(p.clone()));
            }
        }

        self.refresh().await?;

        let projects = self.projects.read().await;
        Ok(find_owning_project(&projects, relative_path).cloned())
    }
}
