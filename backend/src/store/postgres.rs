// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptRecord, NewAttempt},
        category::Category,
        exam::{Exam, ExamChanges, NewExam},
        user::{NewUser, User},
    },
    store::{LedgerOrder, QUESTIONS_FROZEN, Store},
};

const USER_COLUMNS: &str = "id, name, email, password, role, created_at";
const EXAM_COLUMNS: &str =
    "id, title, category_id, duration_minutes, questions, owner_id, created_at, updated_at";
const ATTEMPT_COLUMNS: &str =
    "id, student_id, exam_id, answers, score, passed, attempt_number, created_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the schema in `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Appends ` (id1, id2, ...)` to `builder`.
fn push_id_list(builder: &mut QueryBuilder<'_, Postgres>, ids: &[i64]) {
    builder.push(" (");
    let mut separated = builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password, role) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password)
        .bind(&new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Email '{}' is already registered", new.email))
            }
            other => {
                tracing::error!("Failed to create user: {:?}", other);
                other
            }
        })
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users WHERE id IN", USER_COLUMNS));
        push_id_list(&mut query_builder, ids);

        let users = query_builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn ensure_category(&self, name: &str) -> Result<Category, AppError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_exam(&self, new: NewExam) -> Result<Exam, AppError> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            r#"
            INSERT INTO exams (title, category_id, duration_minutes, questions, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            EXAM_COLUMNS
        ))
        .bind(&new.title)
        .bind(new.category_id)
        .bind(new.duration_minutes)
        .bind(Json(&new.questions))
        .bind(new.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create exam: {:?}", e);
            AppError::from(e)
        })?;
        Ok(exam)
    }

    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {} FROM exams WHERE id = $1 AND deleted_at IS NULL",
            EXAM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(exam)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {} FROM exams WHERE deleted_at IS NULL ORDER BY created_at DESC, id DESC",
            EXAM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn list_exams_by_owner(&self, owner_id: i64) -> Result<Vec<Exam>, AppError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            r#"
            SELECT {} FROM exams
            WHERE owner_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#,
            EXAM_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn exams_by_ids(&self, ids: &[i64]) -> Result<Vec<Exam>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM exams WHERE deleted_at IS NULL AND id IN",
            EXAM_COLUMNS
        ));
        push_id_list(&mut query_builder, ids);

        let exams = query_builder
            .build_query_as::<Exam>()
            .fetch_all(&self.pool)
            .await?;
        Ok(exams)
    }

    async fn update_exam(&self, id: i64, changes: ExamChanges) -> Result<Exam, AppError> {
        // Zero rows: either the exam is gone or its questions are frozen.
        let updated = sqlx::query_as::<_, Exam>(&format!(
            r#"
            UPDATE exams SET
                title = COALESCE($2, title),
                category_id = COALESCE($3, category_id),
                duration_minutes = COALESCE($4, duration_minutes),
                questions = COALESCE($5, questions),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
              AND ($5::jsonb IS NULL OR NOT EXISTS (SELECT 1 FROM attempts WHERE exam_id = $1))
            RETURNING {}
            "#,
            EXAM_COLUMNS
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.category_id)
        .bind(changes.duration_minutes)
        .bind(changes.questions.map(Json))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(exam) = updated {
            return Ok(exam);
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM exams WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Err(AppError::Conflict(QUESTIONS_FROZEN.to_string()))
        } else {
            Err(AppError::NotFound("Exam not found".to_string()))
        }
    }

    async fn delete_exam(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE exams SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }
        Ok(())
    }

    async fn record_attempt(&self, new: NewAttempt) -> Result<AttemptRecord, AppError> {
        // UNIQUE (student_id, exam_id, attempt_number) turns a concurrent
        // duplicate submission into a Conflict instead of a second ordinal.
        let record = sqlx::query_as::<_, AttemptRecord>(&format!(
            r#"
            INSERT INTO attempts (student_id, exam_id, answers, score, passed, attempt_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ATTEMPT_COLUMNS
        ))
        .bind(new.student_id)
        .bind(new.exam_id)
        .bind(Json(&new.answers))
        .bind(new.score)
        .bind(new.passed)
        .bind(new.attempt_number)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!(
                "Attempt {} was already recorded for this exam",
                new.attempt_number
            )),
            other => {
                tracing::error!("Failed to record attempt: {:?}", other);
                other
            }
        })?;
        Ok(record)
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptRecord, AppError> {
        sqlx::query_as::<_, AttemptRecord>(&format!(
            "SELECT {} FROM attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Result not found".to_string()))
    }

    async fn list_attempts(
        &self,
        student_id: i64,
        exam_id: Option<i64>,
        order: LedgerOrder,
    ) -> Result<Vec<AttemptRecord>, AppError> {
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM attempts WHERE student_id = ",
            ATTEMPT_COLUMNS
        ));
        query_builder.push_bind(student_id);
        if let Some(exam_id) = exam_id {
            query_builder.push(" AND exam_id = ").push_bind(exam_id);
        }
        query_builder.push(match order {
            LedgerOrder::NewestFirst => " ORDER BY created_at DESC, id DESC",
            LedgerOrder::OldestFirst => " ORDER BY created_at ASC, id ASC",
        });

        let records = query_builder
            .build_query_as::<AttemptRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn attempts_for_exams(&self, exam_ids: &[i64]) -> Result<Vec<AttemptRecord>, AppError> {
        if exam_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM attempts WHERE exam_id IN",
            ATTEMPT_COLUMNS
        ));
        push_id_list(&mut query_builder, exam_ids);
        query_builder.push(" ORDER BY created_at DESC, id DESC");

        let records = query_builder
            .build_query_as::<AttemptRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }
}
