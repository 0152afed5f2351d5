//! Quiz and question persistence.
//!
//! [`QuizStore`] is the seam to the relational store holding quiz records
//! and their questions. [`JsonFileStore`] is a file-backed implementation:
//! quizzes come from a JSON manifest and questions are appended to a
//! JSON-Lines file, one [`FinalQuestion`] per line.
//!
//! Manifest format:
//!
//! ```json
//! [
//!   { "id": "bio-101", "document_ref": "courses/bio/chapter1.pdf" },
//!   { "id": "chem-7",  "document_ref": "courses/chem/acids.pdf" }
//! ]
//! ```

use crate::error::{StoreError, WriteError};
use crate::question::FinalQuestion;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A quiz that needs questions, and where its document lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRecord {
    pub id: String,
    /// Blob-store key of the source PDF.
    #[serde(alias = "pdf_url", alias = "document")]
    pub document_ref: String,
}

/// Store for quizzes and their generated questions.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn list_quizzes(&self) -> Result<Vec<QuizRecord>, StoreError>;

    /// Insert all questions of one quiz in a single write.
    async fn insert_questions(&self, records: &[FinalQuestion]) -> Result<(), WriteError>;
}

/// File-backed [`QuizStore`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    manifest: PathBuf,
    output: PathBuf,
}

impl JsonFileStore {
    pub fn new(manifest: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            output: output.into(),
        }
    }
}

#[async_trait]
impl QuizStore for JsonFileStore {
    async fn list_quizzes(&self) -> Result<Vec<QuizRecord>, StoreError> {
        let text = tokio::fs::read_to_string(&self.manifest)
            .await
            .map_err(|e| StoreError {
                detail: format!("cannot read {}: {e}", self.manifest.display()),
            })?;
        serde_json::from_str(&text).map_err(|e| StoreError {
            detail: format!("invalid manifest {}: {e}", self.manifest.display()),
        })
    }

    async fn insert_questions(&self, records: &[FinalQuestion]) -> Result<(), WriteError> {
        let quiz_id = records
            .first()
            .map(|r| r.quiz_id.clone())
            .unwrap_or_default();
        let write_err = |detail: String| WriteError {
            quiz_id: quiz_id.clone(),
            count: records.len(),
            detail,
        };

        let mut batch = Vec::new();
        for r in records {
            serde_json::to_writer(&mut batch, r).map_err(|e| write_err(e.to_string()))?;
            batch.push(b'\n');
        }

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_err(e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output)
            .await
            .map_err(|e| write_err(e.to_string()))?;
        file.write_all(&batch)
            .await
            .map_err(|e| write_err(e.to_string()))?;
        file.flush().await.map_err(|e| write_err(e.to_string()))?;

        debug!(
            "Appended {} questions for quiz {} to {}",
            records.len(),
            quiz_id,
            self.output.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(quiz_id: &str, n: usize) -> FinalQuestion {
        FinalQuestion {
            quiz_id: quiz_id.into(),
            text: format!("Question {n}?"),
            answers: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: Some((n % 4) as i64),
            degraded: false,
        }
    }

    #[test]
    fn manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("quizzes.json");
        std::fs::write(
            &manifest,
            r#"[{"id":"a","document_ref":"a.pdf"},{"id":"b","pdf_url":"b.pdf"}]"#,
        )
        .unwrap();
        let store = JsonFileStore::new(&manifest, dir.path().join("out.jsonl"));

        let quizzes = tokio_test::block_on(store.list_quizzes()).unwrap();
        assert_eq!(quizzes.len(), 2);
        assert_eq!(quizzes[1].document_ref, "b.pdf");
    }

    #[test]
    fn missing_manifest_is_a_store_error() {
        let store = JsonFileStore::new("/nonexistent/quizzes.json", "/tmp/out.jsonl");
        let err = tokio_test::block_on(store.list_quizzes()).unwrap_err();
        assert!(err.detail.contains("cannot read"));
    }

    #[tokio::test]
    async fn insert_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/questions.jsonl");
        let store = JsonFileStore::new(dir.path().join("m.json"), &out);

        let first: Vec<_> = (0..3).map(|n| question("q1", n)).collect();
        let second: Vec<_> = (0..2).map(|n| question("q2", n)).collect();
        store.insert_questions(&first).await.unwrap();
        store.insert_questions(&second).await.unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let rows: Vec<FinalQuestion> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], first[0]);
        assert_eq!(rows[4].quiz_id, "q2");
    }
}
