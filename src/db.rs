use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{EnrollmentRecord, LearnerSnapshot, ProjectRecord, ProjectRef, UserRecord};
use crate::source::MemorySource;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Stores one learner snapshot, replacing whatever was stored for that user.
pub async fn import_snapshot(pool: &PgPool, snapshot: &LearnerSnapshot) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    let user = &snapshot.user;

    sqlx::query(
        r#"
        INSERT INTO blackhole_escape.users (id, login, displayname)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE
        SET login = EXCLUDED.login, displayname = EXCLUDED.displayname, imported_at = now()
        "#,
    )
    .bind(user.id)
    .bind(&user.login)
    .bind(&user.displayname)
    .execute(&mut *tx)
    .await
    .with_context(|| format!("failed to upsert user {}", user.login))?;

    sqlx::query("DELETE FROM blackhole_escape.enrollments WHERE user_id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM blackhole_escape.project_records WHERE user_id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    for (position, enrollment) in snapshot.enrollments.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO blackhole_escape.enrollments
            (user_id, position, cursus_id, cursus_name, level, begin_at, blackholed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(position as i32)
        .bind(enrollment.cursus_id)
        .bind(&enrollment.cursus_name)
        .bind(enrollment.level)
        .bind(&enrollment.begin_at)
        .bind(&enrollment.blackholed_at)
        .execute(&mut *tx)
        .await?;
    }

    for (position, record) in snapshot.projects.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO blackhole_escape.project_records
            (id, user_id, position, status, final_mark, project_id, project_name, project_slug)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(position as i32)
        .bind(&record.status)
        .bind(record.final_mark)
        .bind(record.project.id)
        .bind(&record.project.name)
        .bind(&record.project.slug)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(
        login = %user.login,
        enrollments = snapshot.enrollments.len(),
        projects = snapshot.projects.len(),
        "snapshot imported"
    );
    Ok(())
}

pub async fn fetch_snapshot(pool: &PgPool, login: &str) -> anyhow::Result<Option<LearnerSnapshot>> {
    let Some(row) = sqlx::query(
        "SELECT id, login, displayname FROM blackhole_escape.users WHERE lower(login) = lower($1)",
    )
    .bind(login)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let user = UserRecord {
        id: row.get("id"),
        login: row.get("login"),
        displayname: row.get("displayname"),
    };

    let enrollments = sqlx::query(
        "SELECT cursus_id, cursus_name, level, begin_at, blackholed_at \
         FROM blackhole_escape.enrollments WHERE user_id = $1 ORDER BY position",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| EnrollmentRecord {
        cursus_id: row.get("cursus_id"),
        cursus_name: row.get("cursus_name"),
        level: row.get("level"),
        begin_at: row.get("begin_at"),
        blackholed_at: row.get("blackholed_at"),
    })
    .collect();

    let projects = sqlx::query(
        "SELECT status, final_mark, project_id, project_name, project_slug \
         FROM blackhole_escape.project_records WHERE user_id = $1 ORDER BY position",
    )
    .bind(user.id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| ProjectRecord {
        status: row.get("status"),
        final_mark: row.get("final_mark"),
        project: ProjectRef {
            id: row.get("project_id"),
            name: row.get("project_name"),
            slug: row.get("project_slug"),
        },
    })
    .collect();

    Ok(Some(LearnerSnapshot {
        user,
        enrollments,
        projects,
    }))
}

/// Materializes one login's stored records as an in-memory source.
pub async fn load_source(pool: &PgPool, login: &str) -> anyhow::Result<MemorySource> {
    let snapshots = fetch_snapshot(pool, login).await?.into_iter().collect();
    Ok(MemorySource::new(snapshots)?)
}
