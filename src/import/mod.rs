//! Bulk quiz and flashcard import.
//!
//! An upload flows through the pipeline in this order:
//!
//! 1. **Validation** (`validator`) - Structural checks on the raw JSON; the first
//!    violation rejects the whole upload before any database work
//! 2. **Data Preparation** (`data_builder`) - Typed sets become columnar rows with
//!    generated ids, derived titles and contiguous 1-based ordering
//! 3. **Chunk Planning** (`chunking`) - Sets are grouped into bounded chunks
//! 4. **Writing** (`coordinator`, `store`, `database_operations`) - Each chunk is
//!    one transaction; child rows are inserted with PostgreSQL UNNEST
//! 5. **Reporting** (`report`) - Per-set outcomes fold into an [`ImportSummary`]
//!
//! `preview` runs steps 1 and 2 only. `service` ties the pipeline together for
//! both the HTTP routes and the `import_content` binary.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use content_import::import::{ImportService, PgContentStore};
//!
//! let store = PgContentStore::new(pool, config.budget());
//! let service = ImportService::new(store, config);
//! let summary = service.import(ContentKind::Quiz, &request).await?;
//!
//! println!("{} of {} sets created", summary.success_count, summary.total_processed);
//! ```

pub mod chunking;
pub mod coordinator;
pub mod data_builder;
pub mod data_structures;
pub mod database_operations;
pub mod error;
pub mod payload;
pub mod preview;
pub mod report;
pub mod service;
pub mod stats;
pub mod store;
pub mod validator;

// Re-export main types
pub use coordinator::{AtomicityMode, ChunkFailurePolicy, ChunkedWriter, SetStatus, WriteReport};
pub use error::{ImportError, ValidationError};
pub use payload::{ContentKind, ImportOptions, ImportRequest};
pub use preview::ImportPreview;
pub use report::ImportSummary;
pub use service::ImportService;
pub use stats::ImportStats;
pub use store::{ContentStore, PgContentStore};
pub use validator::Validator;
