//! Import entry point shared by the HTTP routes and the CLI.

use crate::config::ImportConfig;
use crate::import::coordinator::ChunkedWriter;
use crate::import::data_builder::prepare_batch;
use crate::import::error::ImportError;
use crate::import::payload::{
    ContentKind, ImportBatch, ImportOptions, ImportRequest, parse_json_text, payload_digest,
};
use crate::import::preview::{ImportPreview, preview};
use crate::import::report::ImportSummary;
use crate::import::store::{ContentStore, WriteScope};
use crate::import::validator::Validator;
use std::time::Instant;

pub struct ImportService<S> {
    store: S,
    config: ImportConfig,
}

impl<S: ContentStore> ImportService<S> {
    pub fn new(store: S, config: ImportConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Validator used for submissions: lenient about empty flashcard sides,
    /// which are filtered per set instead of failing the upload.
    pub fn submission_validator(&self) -> Validator {
        Validator::submission().with_max_sets(self.config.max_sets)
    }

    /// Describe what `text` would import without writing anything.
    pub fn preview(
        &self,
        kind: ContentKind,
        text: &str,
        options: &ImportOptions,
        strict: bool,
    ) -> ImportPreview {
        let validator = if strict {
            Validator::strict().with_max_sets(self.config.max_sets)
        } else {
            self.submission_validator()
        };
        preview(kind, text, options, &validator)
    }

    /// Validate, prepare and write one upload.
    ///
    /// A validation failure is returned before any database work starts.
    /// Everything after validation is reported through the summary.
    pub async fn import(
        &self,
        kind: ContentKind,
        request: &ImportRequest,
    ) -> Result<ImportSummary, ImportError> {
        let started = Instant::now();
        let digest = payload_digest(&request.json_data);

        let value = parse_json_text(&request.json_data)?;
        self.submission_validator().validate(kind, &value)?;
        let batch = ImportBatch::from_value(kind, value)?;

        log::info!(
            "importing {} {} sets for {}/{} {} {} (digest {})",
            batch.len(),
            kind,
            request.context.university,
            request.context.degree,
            request.context.year,
            request.context.semester,
            &digest[..12]
        );

        let prepared = prepare_batch(&batch, &request.options);
        let scope = WriteScope {
            context: request.context.clone(),
            options: request.options.clone(),
        };

        let writer = ChunkedWriter::new(&self.store, self.config.writer_policy(kind));
        let report = writer.write(prepared, &scope).await?;
        let summary = ImportSummary::from_report(&report, digest);

        log::info!(
            "{} import finished in {:.2}s: {} created, {} failed, {} skipped",
            kind,
            started.elapsed().as_secs_f64(),
            summary.success_count,
            summary.error_count - summary.skipped_count,
            summary.skipped_count
        );

        Ok(summary)
    }
}
