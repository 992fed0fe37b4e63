//! Chunked transactional writer.
//!
//! The ChunkedWriter drives one import through the store:
//! 1. Record sets rejected during preparation
//! 2. Plan chunks from the remaining sets
//! 3. Write chunks sequentially, one transaction each
//! 4. Apply the failure policy (stop or carry on) after a failed chunk
//! 5. Optionally discard earlier chunks so a failed batch leaves nothing behind
//!
//! Every set ends up with exactly one outcome, whichever path it took.

use crate::import::chunking::{ChunkLimits, plan_chunks};
use crate::import::data_structures::{PreparedBatch, SetLabel};
use crate::import::error::ImportError;
use crate::import::payload::ContentKind;
use crate::import::stats::ImportStats;
use crate::import::store::{ContentStore, CreatedSet, WriteScope};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

pub const SKIPPED_MESSAGE: &str = "Not attempted: an earlier chunk failed";
pub const ROLLED_BACK_MESSAGE: &str = "Rolled back: a later chunk failed";

/// What to do with the remaining chunks once one has failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFailurePolicy {
    /// Stop; sets in later chunks are reported as skipped.
    Abort,
    /// Keep writing later chunks.
    Continue,
}

impl FromStr for ChunkFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "stop" => Ok(ChunkFailurePolicy::Abort),
            "continue" => Ok(ChunkFailurePolicy::Continue),
            _ => Err(()),
        }
    }
}

/// Whether committed chunks survive a later chunk failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicityMode {
    /// Committed chunks stay committed.
    Partial,
    /// Delete every parent created by this import once any chunk fails.
    Compensate,
}

impl FromStr for AtomicityMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "partial" => Ok(AtomicityMode::Partial),
            "compensate" | "all_or_nothing" => Ok(AtomicityMode::Compensate),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterPolicy {
    pub limits: ChunkLimits,
    pub on_failure: ChunkFailurePolicy,
    pub atomicity: AtomicityMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SetStatus {
    Created,
    Failed,
    Skipped,
    RolledBack,
}

impl fmt::Display for SetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SetStatus::Created => "created",
            SetStatus::Failed => "failed",
            SetStatus::Skipped => "skipped",
            SetStatus::RolledBack => "rolledBack",
        })
    }
}

/// Final state of one submitted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    pub label: SetLabel,
    pub status: SetStatus,
    pub created_id: Option<Uuid>,
    pub stats: Option<ImportStats>,
    pub error: Option<String>,
}

impl SetOutcome {
    fn created(label: SetLabel, created: &CreatedSet) -> Self {
        Self {
            label,
            status: SetStatus::Created,
            created_id: Some(created.id),
            stats: Some(created.stats),
            error: None,
        }
    }

    fn not_created(label: SetLabel, status: SetStatus, error: String) -> Self {
        Self {
            label,
            status,
            created_id: None,
            stats: None,
            error: Some(error),
        }
    }
}

/// Everything the writer did for one batch.
#[derive(Debug, Clone)]
pub struct WriteReport {
    pub kind: ContentKind,
    /// One entry per submitted set, ordered by submission index.
    pub outcomes: Vec<SetOutcome>,
    pub stats: ImportStats,
    pub chunks_planned: usize,
    pub chunks_attempted: usize,
    pub chunks_committed: usize,
    /// Message of the first failed chunk, if any.
    pub first_error: Option<String>,
}

impl WriteReport {
    pub fn count(&self, status: SetStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    /// Id of the created entity when the batch held exactly one set.
    pub fn single_created_id(&self) -> Option<Uuid> {
        match self.outcomes.as_slice() {
            [only] if only.status == SetStatus::Created => only.created_id,
            _ => None,
        }
    }
}

pub struct ChunkedWriter<'a, S: ?Sized> {
    store: &'a S,
    policy: WriterPolicy,
}

impl<'a, S: ContentStore + ?Sized> ChunkedWriter<'a, S> {
    pub fn new(store: &'a S, policy: WriterPolicy) -> Self {
        Self { store, policy }
    }

    /// Write a prepared batch chunk by chunk.
    ///
    /// Chunk failures are reported per set. Two failures are returned as
    /// `Err` instead: no connection could be obtained before any chunk
    /// committed, or a compensation failed and left the database state
    /// unknown to the caller.
    pub async fn write(
        &self,
        batch: PreparedBatch,
        scope: &WriteScope,
    ) -> Result<WriteReport, ImportError> {
        let started = Instant::now();
        let kind = batch.kind;
        let mut outcomes: Vec<SetOutcome> = batch
            .rejected
            .into_iter()
            .map(|rejected| {
                log::warn!(
                    "set {} ({} / {}) rejected: {}",
                    rejected.label.index + 1,
                    rejected.label.subject,
                    rejected.label.topic,
                    rejected.error
                );
                SetOutcome::not_created(rejected.label, SetStatus::Failed, rejected.error.to_string())
            })
            .collect();

        let chunks = plan_chunks(batch.sets, self.policy.limits);
        let chunks_planned = chunks.len();
        let mut stats = ImportStats::default();
        let mut created_ids: Vec<Uuid> = Vec::new();
        let mut chunks_attempted = 0;
        let mut chunks_committed = 0;
        let mut first_error: Option<String> = None;
        let mut aborted = false;

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            if aborted {
                outcomes.extend(chunk.into_iter().map(|set| {
                    SetOutcome::not_created(set.label, SetStatus::Skipped, SKIPPED_MESSAGE.to_string())
                }));
                continue;
            }

            chunks_attempted += 1;
            log::debug!(
                "writing {} chunk {}/{} ({} sets)",
                kind,
                chunk_index + 1,
                chunks_planned,
                chunk.len()
            );

            match self.store.write_chunk(&chunk, scope).await {
                Ok(created) => {
                    chunks_committed += 1;
                    let mut by_index: HashMap<usize, CreatedSet> = created
                        .into_iter()
                        .map(|created| (created.index, created))
                        .collect();

                    for set in chunk {
                        match by_index.remove(&set.label.index) {
                            Some(created) => {
                                stats.merge(created.stats);
                                created_ids.push(created.id);
                                outcomes.push(SetOutcome::created(set.label, &created));
                            }
                            None => outcomes.push(SetOutcome::not_created(
                                set.label,
                                SetStatus::Failed,
                                "store did not report this set as created".to_string(),
                            )),
                        }
                    }
                }
                Err(err) if err.is_unavailable() && chunks_committed == 0 => {
                    log::error!(
                        "{} import aborted at chunk {}/{}: {}",
                        kind,
                        chunk_index + 1,
                        chunks_planned,
                        err
                    );
                    return Err(ImportError::Unavailable(err));
                }
                Err(err) => {
                    let message = err.to_string();
                    log::warn!(
                        "{} chunk {}/{} failed and was rolled back: {}",
                        kind,
                        chunk_index + 1,
                        chunks_planned,
                        message
                    );
                    first_error.get_or_insert_with(|| message.clone());
                    outcomes.extend(chunk.into_iter().map(|set| {
                        SetOutcome::not_created(set.label, SetStatus::Failed, message.clone())
                    }));

                    if self.policy.on_failure == ChunkFailurePolicy::Abort {
                        aborted = true;
                    }
                }
            }
        }

        if first_error.is_some()
            && self.policy.atomicity == AtomicityMode::Compensate
            && !created_ids.is_empty()
        {
            log::warn!(
                "discarding {} {} sets committed before the failure",
                created_ids.len(),
                kind
            );
            self.store
                .discard(kind, &created_ids)
                .await
                .map_err(ImportError::Compensation)?;

            for outcome in outcomes
                .iter_mut()
                .filter(|outcome| outcome.status == SetStatus::Created)
            {
                outcome.status = SetStatus::RolledBack;
                outcome.created_id = None;
                outcome.stats = None;
                outcome.error = Some(ROLLED_BACK_MESSAGE.to_string());
            }
            stats = ImportStats::default();
        }

        outcomes.sort_by_key(|outcome| outcome.label.index);

        log::info!(
            "{} import wrote {} of {} sets in {}/{} chunks ({:.2}ms)",
            kind,
            stats.sets,
            outcomes.len(),
            chunks_committed,
            chunks_planned,
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(WriteReport {
            kind,
            outcomes,
            stats,
            chunks_planned,
            chunks_attempted,
            chunks_committed,
            first_error,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::import::data_builder::prepare_batch;
    use crate::import::data_structures::PreparedSet;
    use crate::import::error::ChunkError;
    use crate::import::payload::{ImportBatch, ImportOptions};
    use crate::models::{AcademicContext, AcademicYear, Semester};
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory store that can be told to fail a given chunk (1-based).
    #[derive(Default)]
    pub(crate) struct RecordingStore {
        pub fail_on_chunk: Option<usize>,
        /// Chunk (1-based) that cannot get a connection.
        pub unreachable_on_chunk: Option<usize>,
        pub calls: Mutex<Vec<Vec<usize>>>,
        pub live: Mutex<Vec<Uuid>>,
        pub discarded: Mutex<Vec<Uuid>>,
    }

    impl RecordingStore {
        pub(crate) fn failing_on(chunk: usize) -> Self {
            Self {
                fail_on_chunk: Some(chunk),
                ..Default::default()
            }
        }

        pub(crate) fn unreachable_on(chunk: usize) -> Self {
            Self {
                unreachable_on_chunk: Some(chunk),
                ..Default::default()
            }
        }
    }

    #[rocket::async_trait]
    impl ContentStore for RecordingStore {
        async fn write_chunk(
            &self,
            chunk: &[PreparedSet],
            _scope: &WriteScope,
        ) -> Result<Vec<CreatedSet>, ChunkError> {
            let call_no = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(chunk.iter().map(|set| set.label.index).collect());
                calls.len()
            };

            if self.fail_on_chunk == Some(call_no) {
                return Err(ChunkError::Rejected("forced failure".into()));
            }
            if self.unreachable_on_chunk == Some(call_no) {
                return Err(ChunkError::AcquireTimeout(std::time::Duration::from_secs(5)));
            }

            let created: Vec<CreatedSet> = chunk
                .iter()
                .map(|set| CreatedSet {
                    index: set.label.index,
                    id: set.parent.id,
                    stats: ImportStats {
                        sets: 1,
                        questions: set.question_count(),
                        options: set.option_count(),
                        cards: set.card_count(),
                    },
                })
                .collect();
            self.live
                .lock()
                .unwrap()
                .extend(created.iter().map(|created| created.id));
            Ok(created)
        }

        async fn discard(&self, _kind: ContentKind, ids: &[Uuid]) -> Result<u64, ChunkError> {
            let mut live = self.live.lock().unwrap();
            live.retain(|id| !ids.contains(id));
            self.discarded.lock().unwrap().extend_from_slice(ids);
            Ok(ids.len() as u64)
        }
    }

    pub(crate) fn scope() -> WriteScope {
        WriteScope {
            context: AcademicContext {
                university: "MEDICAPS".into(),
                degree: "BTECH_CSE".into(),
                year: AcademicYear::FirstYear,
                semester: Semester::FirstSemester,
            },
            options: ImportOptions::default(),
        }
    }

    fn quiz_sets(n: usize) -> PreparedBatch {
        let sets: Vec<_> = (0..n)
            .map(|i| {
                json!({
                    "subject": format!("Subject {}", i + 1),
                    "topic": "Topic",
                    "questions": [{
                        "question": "Q?",
                        "options": [{"text": "A", "isCorrect": true}, {"text": "B"}]
                    }]
                })
            })
            .collect();
        let batch =
            ImportBatch::from_value(ContentKind::Quiz, json!({ "quizSets": sets })).unwrap();
        prepare_batch(&batch, &ImportOptions::default())
    }

    fn policy(on_failure: ChunkFailurePolicy, atomicity: AtomicityMode) -> WriterPolicy {
        WriterPolicy {
            limits: ChunkLimits::new(3, 10_000),
            on_failure,
            atomicity,
        }
    }

    #[tokio::test]
    async fn writes_in_ceil_n_over_three_transactions() {
        let store = RecordingStore::default();
        let writer = ChunkedWriter::new(
            &store,
            policy(ChunkFailurePolicy::Abort, AtomicityMode::Partial),
        );
        let report = writer.write(quiz_sets(7), &scope()).await.unwrap();

        assert_eq!(report.chunks_planned, 3);
        assert_eq!(report.chunks_committed, 3);
        assert_eq!(
            *store.calls.lock().unwrap(),
            vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]
        );
        assert_eq!(report.stats.sets, 7);
        assert_eq!(report.stats.questions, 7);
        assert_eq!(report.stats.options, 14);
        assert_eq!(report.count(SetStatus::Created), 7);
        assert!(report.first_error.is_none());
    }

    #[tokio::test]
    async fn failed_second_chunk_keeps_first_and_skips_rest() {
        let store = RecordingStore::failing_on(2);
        let writer = ChunkedWriter::new(
            &store,
            policy(ChunkFailurePolicy::Abort, AtomicityMode::Partial),
        );
        let report = writer.write(quiz_sets(8), &scope()).await.unwrap();

        assert_eq!(report.chunks_planned, 3);
        assert_eq!(report.chunks_attempted, 2);
        assert_eq!(report.chunks_committed, 1);
        assert_eq!(store.calls.lock().unwrap().len(), 2);
        assert_eq!(store.live.lock().unwrap().len(), 3);

        let statuses: Vec<SetStatus> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                SetStatus::Created,
                SetStatus::Created,
                SetStatus::Created,
                SetStatus::Failed,
                SetStatus::Failed,
                SetStatus::Failed,
                SetStatus::Skipped,
                SetStatus::Skipped,
            ]
        );
        assert_eq!(report.outcomes[3].error.as_deref(), Some("forced failure"));
        assert_eq!(report.outcomes[7].error.as_deref(), Some(SKIPPED_MESSAGE));
        assert_eq!(report.first_error.as_deref(), Some("forced failure"));
        assert_eq!(report.stats.sets, 3);
    }

    #[tokio::test]
    async fn unreachable_database_before_any_commit_is_fatal() {
        let store = RecordingStore::unreachable_on(1);
        let writer = ChunkedWriter::new(
            &store,
            policy(ChunkFailurePolicy::Continue, AtomicityMode::Partial),
        );
        let err = writer.write(quiz_sets(5), &scope()).await.unwrap_err();

        assert!(matches!(
            err,
            ImportError::Unavailable(ChunkError::AcquireTimeout(_))
        ));
        assert_eq!(store.calls.lock().unwrap().len(), 1);
        assert!(store.live.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_database_after_a_commit_is_reported_per_set() {
        let store = RecordingStore::unreachable_on(2);
        let writer = ChunkedWriter::new(
            &store,
            policy(ChunkFailurePolicy::Abort, AtomicityMode::Partial),
        );
        let report = writer.write(quiz_sets(7), &scope()).await.unwrap();

        assert_eq!(report.count(SetStatus::Created), 3);
        assert_eq!(report.count(SetStatus::Failed), 3);
        assert_eq!(report.count(SetStatus::Skipped), 1);
        assert!(report.first_error.unwrap().contains("database connection"));
    }

    #[tokio::test]
    async fn continue_policy_writes_later_chunks() {
        let store = RecordingStore::failing_on(1);
        let writer = ChunkedWriter::new(
            &store,
            policy(ChunkFailurePolicy::Continue, AtomicityMode::Partial),
        );
        let report = writer.write(quiz_sets(4), &scope()).await.unwrap();

        assert_eq!(report.chunks_attempted, 2);
        assert_eq!(report.count(SetStatus::Failed), 3);
        assert_eq!(report.count(SetStatus::Created), 1);
        assert_eq!(report.outcomes[3].status, SetStatus::Created);
    }

    #[tokio::test]
    async fn compensation_discards_committed_chunks() {
        let store = RecordingStore::failing_on(2);
        let writer = ChunkedWriter::new(
            &store,
            policy(ChunkFailurePolicy::Abort, AtomicityMode::Compensate),
        );
        let report = writer.write(quiz_sets(6), &scope()).await.unwrap();

        assert!(store.live.lock().unwrap().is_empty());
        assert_eq!(store.discarded.lock().unwrap().len(), 3);
        assert_eq!(report.count(SetStatus::RolledBack), 3);
        assert_eq!(report.count(SetStatus::Created), 0);
        assert_eq!(report.stats, ImportStats::default());
        assert!(report.outcomes.iter().all(|o| o.created_id.is_none()));
    }

    #[tokio::test]
    async fn rejected_sets_are_reported_without_reaching_the_store() {
        let batch = ImportBatch::from_value(
            ContentKind::Flashcard,
            json!({
                "flashcardSets": [
                    {"subject": "Biology", "topic": "Cells", "cards": [{"front": "Q", "back": ""}]},
                    {"subject": "History", "topic": "Rome", "cards": [{"front": "Founded?", "back": "753 BC"}]}
                ]
            }),
        )
        .unwrap();
        let prepared = prepare_batch(&batch, &ImportOptions::default());

        let store = RecordingStore::default();
        let writer = ChunkedWriter::new(
            &store,
            WriterPolicy {
                limits: ChunkLimits::new(1, 10_000),
                on_failure: ChunkFailurePolicy::Continue,
                atomicity: AtomicityMode::Partial,
            },
        );
        let report = writer.write(prepared, &scope()).await.unwrap();

        assert_eq!(*store.calls.lock().unwrap(), vec![vec![1]]);
        assert_eq!(report.outcomes[0].status, SetStatus::Failed);
        assert_eq!(
            report.outcomes[0].error.as_deref(),
            Some("No valid flashcards found")
        );
        assert_eq!(report.outcomes[1].status, SetStatus::Created);
        assert_eq!(report.stats.cards, 1);
        assert_eq!(report.single_created_id(), None);
    }

    #[tokio::test]
    async fn single_set_exposes_created_id() {
        let prepared = quiz_sets(1);
        let expected = prepared.sets[0].parent.id;
        let store = RecordingStore::default();
        let writer = ChunkedWriter::new(
            &store,
            policy(ChunkFailurePolicy::Abort, AtomicityMode::Partial),
        );
        let report = writer.write(prepared, &scope()).await.unwrap();
        assert_eq!(report.single_created_id(), Some(expected));
    }

    #[test]
    fn policies_parse_from_config_strings() {
        assert_eq!(
            "Abort".parse::<ChunkFailurePolicy>(),
            Ok(ChunkFailurePolicy::Abort)
        );
        assert_eq!(
            "continue".parse::<ChunkFailurePolicy>(),
            Ok(ChunkFailurePolicy::Continue)
        );
        assert_eq!(
            "compensate".parse::<AtomicityMode>(),
            Ok(AtomicityMode::Compensate)
        );
        assert_eq!("partial".parse::<AtomicityMode>(), Ok(AtomicityMode::Partial));
        assert!("sometimes".parse::<AtomicityMode>().is_err());
    }
}
