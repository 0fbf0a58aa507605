use std::path::Path;
use std::str::FromStr;

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Settings;
use crate::models::{RecordError, StudentRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to the database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("failed to apply the database schema: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("invalid student record: {0}")]
    InvalidRecord(#[from] RecordError),
    #[error("invalid student record on CSV row {row}: {source}")]
    InvalidCsvRow {
        row: usize,
        #[source]
        source: RecordError,
    },
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
}

const INSERT_STUDENT: &str = r#"
    INSERT INTO student_performance
    (student_id, attendance_percentage, assignment_score, mid_term_score,
     study_hours, quiz_score, final_exam_score)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

fn insert_query(record: &StudentRecord) -> Query<'static, Sqlite, SqliteArguments<'static>> {
    sqlx::query(INSERT_STUDENT)
        .bind(record.student_id)
        .bind(record.attendance_percentage)
        .bind(record.assignment_score)
        .bind(record.mid_term_score)
        .bind(record.study_hours)
        .bind(record.quiz_score)
        .bind(record.final_exam_score)
}

/// Handle to the `student_performance` table.
///
/// Created once per process and passed to whatever needs storage; call
/// [`StudentStore::close`] when done.
#[derive(Debug, Clone)]
pub struct StudentStore {
    pool: SqlitePool,
}

impl StudentStore {
    pub async fn connect(settings: &Settings) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&settings.database_url)
            .map_err(StoreError::Connection)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await
            .map_err(StoreError::Connection)?;

        info!(database_url = %settings.database_url, "connected to database");
        Ok(Self { pool })
    }

    pub async fn init_db(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Returns the most recently appended row for `student_id`, if any.
    pub async fn fetch_student(&self, student_id: i64) -> Result<Option<StudentRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT student_id, attendance_percentage, assignment_score, mid_term_score,
                   study_hours, quiz_score, final_exam_score
            FROM student_performance
            WHERE student_id = ?
            ORDER BY rowid DESC
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        debug!(student_id, found = row.is_some(), "fetched student");

        Ok(row.map(|row| StudentRecord {
            student_id: row.get("student_id"),
            attendance_percentage: row.get("attendance_percentage"),
            assignment_score: row.get("assignment_score"),
            mid_term_score: row.get("mid_term_score"),
            study_hours: row.get("study_hours"),
            quiz_score: row.get("quiz_score"),
            final_exam_score: row.get("final_exam_score"),
        }))
    }

    pub async fn insert_student(&self, record: &StudentRecord) -> Result<(), StoreError> {
        record.validate()?;
        insert_query(record).execute(&self.pool).await?;
        info!(student_id = record.student_id, "student record saved");
        Ok(())
    }

    /// Appends every row of a CSV file whose headers match the table columns.
    ///
    /// All rows are validated before anything is written; the inserts share
    /// one transaction.
    pub async fn import_csv(&self, csv_path: &Path) -> Result<usize, StoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(csv_path)?;

        let mut records = Vec::new();
        for (index, result) in reader.deserialize::<StudentRecord>().enumerate() {
            let record = result?;
            record
                .validate()
                .map_err(|source| StoreError::InvalidCsvRow {
                    row: index + 1,
                    source,
                })?;
            records.push(record);
        }

        let mut tx = self.pool.begin().await?;
        for record in &records {
            insert_query(record).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(rows = records.len(), path = %csv_path.display(), "imported student records");
        Ok(records.len())
    }

    pub async fn seed(&self) -> Result<usize, StoreError> {
        let records = [
            StudentRecord {
                student_id: 1,
                attendance_percentage: 94.0,
                assignment_score: 8.5,
                mid_term_score: 78.0,
                study_hours: 3.0,
                quiz_score: 7.5,
                final_exam_score: 81.0,
            },
            StudentRecord {
                student_id: 2,
                attendance_percentage: 71.5,
                assignment_score: 6.0,
                mid_term_score: 54.0,
                study_hours: 1.5,
                quiz_score: 5.0,
                final_exam_score: 58.5,
            },
            StudentRecord {
                student_id: 3,
                attendance_percentage: 88.0,
                assignment_score: 9.5,
                mid_term_score: 91.0,
                study_hours: 4.5,
                quiz_score: 9.0,
                final_exam_score: 95.0,
            },
        ];

        for record in &records {
            self.insert_student(record).await?;
        }

        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn memory_store() -> StudentStore {
        let settings = Settings {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let store = StudentStore::connect(&settings)
            .await
            .expect("connect to in-memory database");
        store.init_db().await.expect("apply schema");
        store
    }

    async fn row_count(store: &StudentStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM student_performance")
            .fetch_one(&store.pool)
            .await
            .expect("count rows")
    }

    fn sample_record(student_id: i64) -> StudentRecord {
        StudentRecord {
            student_id,
            attendance_percentage: 87.25,
            assignment_score: 7.5,
            mid_term_score: 64.0,
            study_hours: 2.75,
            quiz_score: 8.0,
            final_exam_score: 70.5,
        }
    }

    fn csv_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn insert_then_fetch_returns_same_record() {
        let store = memory_store().await;
        let record = sample_record(42);
        store.insert_student(&record).await.unwrap();

        let fetched = store.fetch_student(42).await.unwrap();
        assert_eq!(fetched, Some(record));
    }

    #[tokio::test]
    async fn fetch_missing_student_is_none() {
        let store = memory_store().await;
        assert_eq!(store.fetch_student(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn repeated_ids_return_latest_row() {
        let store = memory_store().await;
        store.insert_student(&sample_record(5)).await.unwrap();
        let newer = StudentRecord {
            final_exam_score: 99.0,
            ..sample_record(5)
        };
        store.insert_student(&newer).await.unwrap();

        assert_eq!(row_count(&store).await, 2);
        assert_eq!(store.fetch_student(5).await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn invalid_record_is_not_written() {
        let store = memory_store().await;
        let record = StudentRecord {
            attendance_percentage: 120.0,
            ..sample_record(1)
        };
        let err = store.insert_student(&record).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn imports_csv_rows() {
        let store = memory_store().await;
        let file = csv_tempfile(
            "student_id,attendance_percentage,assignment_score,mid_term_score,study_hours,quiz_score,final_exam_score\n\
             10, 90, 9, 85, 4, 8, 88\n\
             11, 60.5, 5.5, 47, 1, 4, 52\n",
        );

        let inserted = store.import_csv(file.path()).await.unwrap();
        assert_eq!(inserted, 2);
        let fetched = store.fetch_student(11).await.unwrap().unwrap();
        assert_eq!(fetched.attendance_percentage, 60.5);
        assert_eq!(fetched.final_exam_score, 52.0);
    }

    #[tokio::test]
    async fn csv_with_invalid_row_imports_nothing() {
        let store = memory_store().await;
        let file = csv_tempfile(
            "student_id,attendance_percentage,assignment_score,mid_term_score,study_hours,quiz_score,final_exam_score\n\
             10,90,9,85,4,8,88\n\
             11,60,5,47,30,4,52\n",
        );

        let err = store.import_csv(file.path()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidCsvRow { row: 2, .. }));
        assert_eq!(row_count(&store).await, 0);
    }

    #[tokio::test]
    async fn seed_inserts_example_students() {
        let store = memory_store().await;
        assert_eq!(store.seed().await.unwrap(), 3);
        assert!(store.fetch_student(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn records_persist_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            database_url: format!("sqlite:{}", dir.path().join("students.db").display()),
            max_connections: 1,
        };

        let store = StudentStore::connect(&settings).await.unwrap();
        store.init_db().await.unwrap();
        store.insert_student(&sample_record(8)).await.unwrap();
        store.close().await;

        let reopened = StudentStore::connect(&settings).await.unwrap();
        reopened.init_db().await.unwrap();
        assert_eq!(
            reopened.fetch_student(8).await.unwrap(),
            Some(sample_record(8))
        );
        reopened.close().await;
    }

    #[tokio::test]
    async fn unreachable_database_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            database_url: format!(
                "sqlite:{}",
                dir.path().join("missing").join("students.db").display()
            ),
            max_connections: 1,
        };

        let err = StudentStore::connect(&settings).await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
