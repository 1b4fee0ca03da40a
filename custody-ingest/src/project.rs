use anyhow::Result;
use sqlx::{FromRow, PgPool};

/// A configured project root: a subtree of the sync root whose files
/// inherit its author attribution and extension allow-list.
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub project_id: String,
    pub project_path: String,
    pub author_type: Option<String>,
    pub author_name: Option<String>,
    pub author_identifier: Option<String>,
    pub file_extensions: Vec<String>,
}

/// An accept-listed signer: a PGP fingerprint, base64 ECDSA public key, or
/// domain name, paired with a human-readable name for attribution.
#[derive(Debug, Clone, FromRow)]
pub struct AllowedKey {
    pub key: String,
    pub name: String,
}

pub async fn list_projects(pool: &PgPool) -> Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, Project>(
        "SELECT project_id, project_path, author_type, author_name, author_identifier, file_extensions FROM project_metadata",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Finds the project whose `project_path` is the deepest ancestor of
/// `relative_path`, matching spec's "a file belongs to at most one
/// project — the deepest project whose path is an ancestor" rule.
pub fn find_owning_project<'a>(projects: &'a [Project], relative_path: &str) -> Option<&'a Project> {
    projects
        .iter()
        .filter(|p| {
            p.project_path.is_empty()
                || relative_path == p.project_path
                || relative_path.starts_with(&format!("{}/", p.project_path))
        })
        .max_by_key(|p| p.project_path.len())
}

pub async fn list_allowed_keys(pool: &PgPool, purpose: &str) -> Result<Vec<AllowedKey>> {
    let rows = sqlx::query_as::<_, AllowedKey>("SELECT key, name FROM allowed_keys WHERE purpose = $1")
        .bind(purpose)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

impl Project {
    /// The `author:{@type,name,identifier}` object built from non-empty
    /// project columns, or `None` when the project carries no attribution.
    pub fn author_object(&self) -> Option<serde_json::Value> {
        if self.author_type.is_none() && self.author_name.is_none() && self.author_identifier.is_none() {
            return None;
        }
        let mut map = serde_json::Map::new();
        if let Some(t) = &self.author_type {
            map.insert("@type".to_string(), serde_json::json!(t));
        }
        if let Some(n) = &self.author_name {
            map.insert("name".to_string(), serde_json::json!(n));
        }
        if let Some(i) = &self.author_identifier {
            map.insert("identifier".to_string(), serde_json::json!(i));
        }
        Some(serde_json::Value::Object(map))
    }

    pub fn should_include_extension(&self, file_name: &str) -> bool {
        if self.file_extensions.is_empty() {
            return true;
        }
        let ext = std::path::Path::new(file_name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        self.file_extensions.iter().any(|allowed| allowed == &ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(path: &str) -> Project {
        Project {
            project_id: path.to_string(),
            project_path: path.to_string(),
            author_type: None,
            author_name: None,
            author_identifier: None,
            file_extensions: vec![],
        }
    }

    #[test]
    fn picks_the_deepest_matching_project() {
        let projects = vec![project(""), project("alice"), project("alice/sub")];
        let found = find_owning_project(&projects, "alice/sub/file.txt").unwrap();
        assert_eq!(found.project_path, "alice/sub");
    }

    #[test]
    fn falls_back_to_root_project() {
        let projects = vec![project(""), project("bob")];
        let found = find_owning_project(&projects, "alice/file.txt").unwrap();
        assert_eq!(found.project_path, "");
    }
}
