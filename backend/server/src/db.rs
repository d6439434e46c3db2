//! Project store — migrations and document-style reads/writes.
//!
//! Each project is one row; its files and deployment history are stored as
//! JSON arrays so every read and write handles the whole document.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use ide_core::{DeploymentRecord, Project, ProjectFile, UpdateProjectRequest};

use crate::errors::{IdeError, Result};

const SELECT_PROJECT: &str = r#"
    SELECT id, name, files, contract_address, last_deployed, deployment_history,
           revision, created_at, updated_at
    FROM   projects
"#;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // An in-memory database lives only as long as its connection.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    files: String,
    contract_address: Option<String>,
    last_deployed: Option<i64>,
    deployment_history: String,
    revision: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ProjectRow> for Project {
    type Error = IdeError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: row.id,
            name: row.name,
            files: serde_json::from_str(&row.files)?,
            contract_address: row.contract_address,
            last_deployed: row.last_deployed.map(from_millis),
            deployment_history: serde_json::from_str(&row.deployment_history)?,
            revision: row.revision,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        })
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

// ─────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────

/// All projects, oldest first.
pub async fn list_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, ProjectRow>(&format!(
        "{SELECT_PROJECT} ORDER BY created_at ASC, id ASC"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Project::try_from).collect()
}

pub async fn get_project(pool: &SqlitePool, id: &str) -> Result<Option<Project>> {
    let row = sqlx::query_as::<_, ProjectRow>(&format!("{SELECT_PROJECT} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Project::try_from).transpose()
}

async fn require_project(pool: &SqlitePool, id: &str) -> Result<Project> {
    get_project(pool, id)
        .await?
        .ok_or_else(|| IdeError::NotFound(id.to_string()))
}

// ─────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────

/// Create a project holding `files` and return the stored document.
pub async fn insert_project(
    pool: &SqlitePool,
    name: &str,
    files: &[ProjectFile],
) -> Result<Project> {
    let id = Uuid::new_v4().simple().to_string();
    let now = Utc::now().timestamp_millis();

    sqlx::query(
        r#"
        INSERT INTO projects (id, name, files, deployment_history, revision, created_at, updated_at)
        VALUES (?1, ?2, ?3, '[]', 0, ?4, ?4)
        "#,
    )
    .bind(&id)
    .bind(name)
    .bind(serde_json::to_string(files)?)
    .bind(now)
    .execute(pool)
    .await?;

    info!("Created project {id} ({name})");
    require_project(pool, &id).await
}

/// Replace the fields present in `update`.
///
/// When `update.revision` is set it must equal the stored revision. The
/// revision only advances when `name` or `files` actually change; a write
/// that changes nothing only refreshes `updated_at`.
pub async fn update_project(
    pool: &SqlitePool,
    id: &str,
    update: &UpdateProjectRequest,
) -> Result<Project> {
    let files = update.files.as_ref().map(serde_json::to_string).transpose()?;

    // Check and write in one statement; SET expressions see the old row.
    let rows_affected = sqlx::query(
        r#"
        UPDATE projects
        SET    name       = COALESCE(?1, name),
               files      = COALESCE(?2, files),
               revision   = revision + (COALESCE(?1, name) <> name OR COALESCE(?2, files) <> files),
               updated_at = ?3
        WHERE  id = ?4 AND (?5 IS NULL OR revision = ?5)
        "#,
    )
    .bind(update.name.as_deref())
    .bind(files)
    .bind(Utc::now().timestamp_millis())
    .bind(id)
    .bind(update.revision)
    .execute(pool)
    .await?
    .rows_affected();

    let project = require_project(pool, id).await?;
    if rows_affected == 0 {
        return Err(IdeError::Conflict {
            expected: update.revision.unwrap_or(project.revision),
            actual: project.revision,
        });
    }

    debug!("Updated project {id} (revision {})", project.revision);
    Ok(project)
}

/// Point the project at a newly deployed contract and append to its history.
///
/// Leaves `revision` untouched: it only counts edits to `name` and `files`.
pub async fn record_deployment(
    pool: &SqlitePool,
    id: &str,
    record: &DeploymentRecord,
) -> Result<Project> {
    let rows_affected = sqlx::query(
        r#"
        UPDATE projects
        SET    contract_address   = ?1,
               last_deployed      = ?2,
               deployment_history = json_insert(deployment_history, '$[#]', json(?3)),
               updated_at         = ?4
        WHERE  id = ?5
        "#,
    )
    .bind(&record.contract_address)
    .bind(record.deployed_at.timestamp_millis())
    .bind(serde_json::to_string(record)?)
    .bind(Utc::now().timestamp_millis())
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if rows_affected == 0 {
        return Err(IdeError::NotFound(id.to_string()));
    }

    info!(
        "Recorded deployment of {} for project {id}",
        record.contract_address
    );
    require_project(pool, id).await
}

/// Returns `false` when no such project existed.
pub async fn delete_project(pool: &SqlitePool, id: &str) -> Result<bool> {
    let rows_affected = sqlx::query("DELETE FROM projects WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ide_core::{scaffold, Network};

    async fn memory_pool() -> SqlitePool {
        init_pool("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn insert_then_get_round_trips_files() {
        let pool = memory_pool().await;
        let created = insert_project(&pool, "Demo", &[ProjectFile::new("x.rs", "fn x() {}")])
            .await
            .unwrap();

        let fetched = get_project(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(fetched.files.len(), 1);
        assert_eq!(fetched.files[0].name, "x.rs");
        assert_eq!(fetched.files[0].content, "fn x() {}");
        assert_eq!(fetched.revision, 0);
        assert!(fetched.contract_address.is_none());
    }

    #[tokio::test]
    async fn list_is_ordered_by_creation() {
        let pool = memory_pool().await;
        let a = insert_project(&pool, "A", &scaffold::default_files()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = insert_project(&pool, "B", &scaffold::default_files()).await.unwrap();

        let ids: Vec<_> = list_projects(&pool).await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let pool = memory_pool().await;
        let p = insert_project(&pool, "Old", &scaffold::default_files()).await.unwrap();

        let renamed = update_project(&pool, &p.id, &UpdateProjectRequest::name("New"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "New");
        assert_eq!(renamed.files, p.files);
        assert_eq!(renamed.revision, 1);
    }

    #[tokio::test]
    async fn identical_save_only_touches_timestamp() {
        let pool = memory_pool().await;
        let p = insert_project(&pool, "Demo", &scaffold::default_files()).await.unwrap();
        let update = UpdateProjectRequest::files(p.files.clone());

        let first = update_project(&pool, &p.id, &update).await.unwrap();
        let second = update_project(&pool, &p.id, &update).await.unwrap();
        assert_eq!(first.files, second.files);
        assert_eq!(first.name, second.name);
        assert_eq!(first.revision, p.revision);
        assert_eq!(second.revision, p.revision);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let pool = memory_pool().await;
        let p = insert_project(&pool, "Demo", &scaffold::default_files()).await.unwrap();
        update_project(&pool, &p.id, &UpdateProjectRequest::name("Tab A").at_revision(0))
            .await
            .unwrap();

        let err = update_project(&pool, &p.id, &UpdateProjectRequest::name("Tab B").at_revision(0))
            .await
            .unwrap_err();
        assert!(matches!(err, IdeError::Conflict { expected: 0, actual: 1 }));
    }

    #[tokio::test]
    async fn update_missing_project_is_not_found() {
        let pool = memory_pool().await;
        let err = update_project(&pool, "nope", &UpdateProjectRequest::name("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdeError::NotFound(_)));
    }

    #[tokio::test]
    async fn record_deployment_appends_history() {
        let pool = memory_pool().await;
        let p = insert_project(&pool, "Demo", &scaffold::default_files()).await.unwrap();
        let record = DeploymentRecord {
            contract_address: "CDEPLOYED".into(),
            network: Network::Testnet,
            wallet_address: Some("GWALLET".into()),
            wasm_hash: None,
            deployed_at: Utc::now(),
        };

        record_deployment(&pool, &p.id, &record).await.unwrap();
        let updated = record_deployment(&pool, &p.id, &record).await.unwrap();
        assert_eq!(updated.contract_address.as_deref(), Some("CDEPLOYED"));
        assert!(updated.last_deployed.is_some());
        assert_eq!(updated.deployment_history.len(), 2);
        assert_eq!(updated.deployment_history[1].wallet_address.as_deref(), Some("GWALLET"));
        assert_eq!(updated.revision, p.revision);

        // An editor holding the pre-deploy revision can still save.
        let saved = update_project(&pool, &p.id, &UpdateProjectRequest::name("After").at_revision(0))
            .await
            .unwrap();
        assert_eq!(saved.revision, 1);
        assert_eq!(saved.deployment_history.len(), 2);
    }

    #[tokio::test]
    async fn record_deployment_for_missing_project_is_not_found() {
        let pool = memory_pool().await;
        let record = DeploymentRecord {
            contract_address: "CDEPLOYED".into(),
            network: Network::Testnet,
            wallet_address: None,
            wasm_hash: None,
            deployed_at: Utc::now(),
        };
        let err = record_deployment(&pool, "nope", &record).await.unwrap_err();
        assert!(matches!(err, IdeError::NotFound(_)));
    }

    #[tokio::test]
    async fn conflict_reports_stored_revision() {
        let pool = memory_pool().await;
        let p = insert_project(&pool, "Demo", &scaffold::default_files()).await.unwrap();
        for (rev, name) in [(0, "One"), (1, "Two")] {
            update_project(&pool, &p.id, &UpdateProjectRequest::name(name).at_revision(rev))
                .await
                .unwrap();
        }

        let err = update_project(&pool, &p.id, &UpdateProjectRequest::name("Stale").at_revision(0))
            .await
            .unwrap_err();
        assert!(matches!(err, IdeError::Conflict { expected: 0, actual: 2 }));
        assert_eq!(get_project(&pool, &p.id).await.unwrap().unwrap().name, "Two");
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let pool = memory_pool().await;
        let p = insert_project(&pool, "Demo", &scaffold::default_files()).await.unwrap();
        assert!(delete_project(&pool, &p.id).await.unwrap());
        assert!(!delete_project(&pool, &p.id).await.unwrap());
        assert!(get_project(&pool, &p.id).await.unwrap().is_none());
    }
}
