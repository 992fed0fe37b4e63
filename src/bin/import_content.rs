use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;

use content_import::config::ImportConfig;
use content_import::db::run_migrations;
use content_import::import::payload::read_payload_file;
use content_import::import::preview::{ImportPreview, preview};
use content_import::import::{
    ContentKind, ImportOptions, ImportRequest, ImportService, PgContentStore, Validator,
};
use content_import::models::{AcademicContext, AcademicYear, Semester};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Quiz,
    Flashcard,
}

impl From<Kind> for ContentKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Quiz => ContentKind::Quiz,
            Kind::Flashcard => ContentKind::Flashcard,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "import_content",
    about = "Import quiz or flashcard sets from a JSON file"
)]
struct Args {
    /// Kind of content held by the file.
    #[arg(long, value_enum)]
    kind: Kind,

    /// Path to the JSON document (`quizSets` or `flashcardSets`).
    #[arg(long)]
    file: PathBuf,

    #[arg(long)]
    university: String,

    #[arg(long)]
    degree: String,

    /// Academic year code, e.g. FIRST_YEAR.
    #[arg(long)]
    year: String,

    /// Semester code, e.g. FIRST_SEMESTER.
    #[arg(long)]
    semester: String,

    /// Unit number used for derived titles when a set has none.
    #[arg(long)]
    unit_number: Option<i32>,

    /// Title for a single-set file.
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    premium: bool,

    /// Subscription tier required to open premium content.
    #[arg(long)]
    required_tier: Option<String>,

    /// Publish the created content immediately.
    #[arg(long)]
    publish: bool,

    /// Only validate and preview; nothing is written.
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn academic_context(&self) -> Result<AcademicContext, String> {
        let year: AcademicYear = self.year.parse()?;
        let semester: Semester = self.semester.parse()?;
        AcademicContext::new(&self.university, &self.degree, year, semester)
    }

    fn options(&self) -> ImportOptions {
        ImportOptions {
            unit_number: self.unit_number,
            title: self.title.clone(),
            description: self.description.clone(),
            is_premium: self.premium,
            required_tier: self.required_tier.clone(),
            is_published: self.publish,
        }
    }
}

/// Strict preview of the file; never opens a database connection.
fn dry_run(
    kind: ContentKind,
    request: &ImportRequest,
    config: &ImportConfig,
) -> (ImportPreview, i32) {
    let validator = Validator::strict().with_max_sets(config.max_sets);
    let preview = preview(kind, &request.json_data, &request.options, &validator);
    let code = if preview.valid { 0 } else { 1 };
    (preview, code)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let kind = ContentKind::from(args.kind);

    let context = match args.academic_context() {
        Ok(context) => context,
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(2);
        }
    };

    let json_data = read_payload_file(&args.file).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("failed to read {}: {err}", args.file.display()),
        )
    })?;

    let request = ImportRequest {
        json_data,
        context,
        options: args.options(),
    };

    let config = ImportConfig::from_env();

    if args.dry_run {
        let (preview, code) = dry_run(kind, &request, &config);
        println!("{}", serde_json::to_string_pretty(&preview)?);
        if code != 0 {
            std::process::exit(code);
        }
        return Ok(());
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(config.acquire_timeout)
        .connect(&database_url)
        .await?;

    let service = ImportService::new(PgContentStore::new(pool.clone(), config.budget()), config);

    run_migrations(&pool).await?;

    let summary = match service.import(kind, &request).await {
        Ok(summary) => summary,
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if !summary.success {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn args_for(file: &NamedTempFile, extra: &[&str]) -> Args {
        let path = file.path().to_str().unwrap();
        let mut argv = vec![
            "import_content",
            "--kind",
            "flashcard",
            "--file",
            path,
            "--university",
            "medicaps",
            "--degree",
            "btech_cse",
            "--year",
            "FIRST_YEAR",
            "--semester",
            "FIRST_SEMESTER",
            "--dry-run",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn payload_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    fn request(args: &Args) -> ImportRequest {
        ImportRequest {
            json_data: read_payload_file(&args.file).unwrap(),
            context: args.academic_context().unwrap(),
            options: args.options(),
        }
    }

    #[test]
    fn dry_run_of_a_valid_file_exits_cleanly() {
        let file = payload_file(
            r#"{"flashcardSets": [{"subject": "History", "topic": "Rome",
                "cards": [{"front": "Founded?", "back": "753 BC"}]}]}"#,
        );
        let args = args_for(&file, &["--unit-number", "2"]);
        assert!(args.dry_run);

        let (preview, code) =
            dry_run(args.kind.into(), &request(&args), &ImportConfig::default());
        assert_eq!(code, 0);
        assert!(preview.valid);
        assert_eq!(preview.sets[0].title, "Unit 2: History");
        assert_eq!(preview.total_cards, 1);
    }

    #[test]
    fn dry_run_is_strict_about_empty_card_sides() {
        let file = payload_file(
            r#"{"flashcardSets": [{"subject": "Biology", "topic": "Cells",
                "cards": [{"front": "Nucleus?", "back": ""}]}]}"#,
        );
        let args = args_for(&file, &[]);

        let (preview, code) =
            dry_run(args.kind.into(), &request(&args), &ImportConfig::default());
        assert_eq!(code, 1);
        assert!(!preview.valid);
        assert_eq!(
            preview.error.as_deref(),
            Some("Set 1, card 1: \"back\" must not be empty")
        );
    }

    #[test]
    fn bad_academic_codes_are_reported() {
        let file = payload_file("{}");
        let mut args = args_for(&file, &[]);
        args.year = "FIFTH_YEAR".to_string();
        assert!(args.academic_context().is_err());
    }
}
