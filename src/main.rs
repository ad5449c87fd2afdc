//! `termmap` CLI: a thin driver over the `termmap::Engine` public API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use termmap::{Concept, Engine, EngineConfig, InMemoryVocabularyStore, Vocabulary};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "termmap",
    about = "Fuzzy-match free-text clinical terms against SNOMED CT, LOINC, and RxNorm",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of a plain table
    #[arg(short, long, global = true)]
    json: bool,

    /// Disable the HTTP cache for external lookups
    #[arg(long, global = true)]
    no_cache: bool,

    /// CSV fixture (code,vocabulary,term,display) to seed the in-memory
    /// vocabulary store; defaults to a small built-in sample
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Path to the synonym clusters JSON file
    #[arg(long, global = true, default_value = "synonyms.json")]
    synonyms: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Map a single free-text term
    #[command(after_help = "EXAMPLES:\n  termmap map \"MI\" --vocabulary snomed\n  termmap map \"hemaglobin a1c\" --context diabetic")]
    Map {
        /// Free-text clinical term
        term: String,
        /// Restrict to one or more vocabularies (default: all three)
        #[arg(long = "vocabulary", value_name = "VOCAB")]
        vocabularies: Vec<String>,
        /// Optional clinical context cue (e.g. "diabetic", "on metformin")
        #[arg(long)]
        context: Option<String>,
        /// Maximum results per vocabulary
        #[arg(long, default_value = "5")]
        max_per_system: usize,
    },
    /// Map many terms at once, in chunked concurrent batches
    Batch {
        /// Comma-separated free-text terms
        terms: String,
        #[arg(long = "vocabulary", value_name = "VOCAB")]
        vocabularies: Vec<String>,
        #[arg(long)]
        context: Option<String>,
        #[arg(long, default_value = "5")]
        max_per_system: usize,
    },
    /// Register a synonym cluster so member terms resolve to each other
    AddSynonym {
        /// Canonical term
        term: String,
        /// Comma-separated synonyms
        synonyms: String,
    },
    /// Report readiness and row counts for each vocabulary
    Systems,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let store = load_fixture(cli.fixture.as_deref())?;
    let config = EngineConfig::default()
        .with_synonyms_path(cli.synonyms.clone())
        .with_fuzzy_threshold(0.70);
    let config = if cli.no_cache { config_with_bypass(config) } else { config };
    let engine = Engine::build(&store, config).await;

    let output = match cli.command {
        Commands::Map { term, vocabularies, context, max_per_system } => {
            let vocabularies = parse_vocabularies(&vocabularies)?;
            let results = engine.map_term(&term, &vocabularies, context.as_deref(), max_per_system).await;
            if cli.json {
                serde_json::to_string_pretty(&to_json_rows(&results))?
            } else {
                render_table(&results)
            }
        }
        Commands::Batch { terms, vocabularies, context, max_per_system } => {
            let vocabularies = parse_vocabularies(&vocabularies)?;
            let terms: Vec<String> = terms.split(',').map(|t| t.trim().to_string()).collect();
            let results = engine.batch_map_terms(&terms, &vocabularies, context.as_deref(), max_per_system).await;
            if cli.json {
                serde_json::to_string_pretty(&to_json_batch(&results))?
            } else {
                render_batch(&results)
            }
        }
        Commands::AddSynonym { term, synonyms } => {
            let synonyms: Vec<String> = synonyms.split(',').map(|s| s.trim().to_string()).collect();
            let persisted = engine.add_synonym(&term, &synonyms);
            if persisted {
                format!("synonym cluster for {term:?} saved")
            } else {
                format!("synonym cluster for {term:?} updated in memory, but persisting to disk failed")
            }
        }
        Commands::Systems => {
            let info = engine.get_systems_info();
            if cli.json {
                serde_json::to_string_pretty(&to_json_systems(&info))?
            } else {
                render_systems(&info)
            }
        }
    };

    println!("{output}");
    Ok(())
}

fn config_with_bypass(mut config: EngineConfig) -> EngineConfig {
    config.bypass_cache = true;
    config
}

fn parse_vocabularies(raw: &[String]) -> anyhow::Result<Vec<Vocabulary>> {
    if raw.is_empty() {
        return Ok(Vocabulary::ALL.to_vec());
    }
    raw.iter()
        .map(|s| s.parse::<Vocabulary>().map_err(anyhow::Error::from))
        .collect()
}

/// Loads a `code,vocabulary,term,display` CSV fixture, or falls back to a
/// small built-in sample covering all three vocabularies.
fn load_fixture(path: Option<&std::path::Path>) -> anyhow::Result<InMemoryVocabularyStore> {
    let Some(path) = path else {
        return Ok(sample_store());
    };
    let contents = std::fs::read_to_string(path)?;
    let mut store = InMemoryVocabularyStore::new();
    for line in contents.lines().skip(1) {
        let fields: Vec<&str> = line.splitn(4, ',').collect();
        let [code, vocabulary, term, display] = fields[..] else {
            continue;
        };
        let vocabulary: Vocabulary = vocabulary.parse()?;
        store.insert(
            vocabulary,
            Concept {
                code: code.to_string(),
                term: term.to_string(),
                display: display.to_string(),
            },
        );
    }
    Ok(store)
}

fn sample_store() -> InMemoryVocabularyStore {
    let mut store = InMemoryVocabularyStore::new();
    store.insert(Vocabulary::Snomed, Concept { code: "22298006".into(), term: "Myocardial infarction".into(), display: "Myocardial infarction".into() });
    store.insert(Vocabulary::Snomed, Concept { code: "73211009".into(), term: "Diabetes mellitus".into(), display: "Diabetes mellitus".into() });
    store.insert(Vocabulary::Snomed, Concept { code: "195967001".into(), term: "Asthma".into(), display: "Asthma".into() });
    store.insert(Vocabulary::Loinc, Concept { code: "4548-4".into(), term: "Hemoglobin A1c".into(), display: "Hemoglobin A1c/Hemoglobin.total in Blood".into() });
    store.insert(Vocabulary::Loinc, Concept { code: "2345-7".into(), term: "Glucose".into(), display: "Glucose [Mass/volume] in Serum or Plasma".into() });
    store.insert(Vocabulary::Rxnorm, Concept { code: "6809".into(), term: "Metformin".into(), display: "Metformin".into() });
    store.insert(Vocabulary::Rxnorm, Concept { code: "5640".into(), term: "Ibuprofen".into(), display: "Ibuprofen".into() });
    store
}

fn render_table(results: &std::collections::HashMap<Vocabulary, Vec<termmap::ResultRow>>) -> String {
    let mut out = String::new();
    let mut vocabularies: Vec<&Vocabulary> = results.keys().collect();
    vocabularies.sort();
    for vocabulary in vocabularies {
        out.push_str(&format!("## {vocabulary}\n"));
        for row in &results[vocabulary] {
            out.push_str(&format!(
                "{:<12} {:<40} {:.2} {}{}\n",
                row.code,
                row.display,
                row.confidence,
                row.match_type,
                if row.context_enhanced { " (context boosted)" } else { "" }
            ));
        }
    }
    if out.is_empty() {
        out.push_str("no mappings found\n");
    }
    out
}

fn render_batch(results: &[termmap::TermResult]) -> String {
    let mut out = String::new();
    for result in results {
        out.push_str(&format!("### {:?} [{:?}]\n", result.term, result.status));
        if let Some(error) = &result.error {
            out.push_str(&format!("  error: {error}\n"));
        }
        out.push_str(&render_table(&result.results));
    }
    out
}

fn render_systems(info: &std::collections::HashMap<Vocabulary, termmap::SystemInfo>) -> String {
    let mut out = String::new();
    let mut vocabularies: Vec<&Vocabulary> = info.keys().collect();
    vocabularies.sort();
    for vocabulary in vocabularies {
        let system = &info[vocabulary];
        out.push_str(&format!(
            "{:<8} ready={:<5} rows={:<6} uri={}\n",
            vocabulary.as_str(),
            system.ready,
            system.row_count,
            system.uri
        ));
    }
    out
}

fn to_json_rows(
    results: &std::collections::HashMap<Vocabulary, Vec<termmap::ResultRow>>,
) -> std::collections::HashMap<String, Vec<JsonRow>> {
    results
        .iter()
        .map(|(vocabulary, rows)| {
            (
                vocabulary.as_str().to_string(),
                rows.iter()
                    .map(|row| JsonRow {
                        code: row.code.clone(),
                        display: row.display.clone(),
                        confidence: row.confidence,
                        match_type: row.match_type.clone(),
                        source: row.source.clone(),
                        context_enhanced: row.context_enhanced,
                    })
                    .collect(),
            )
        })
        .collect()
}

fn to_json_batch(results: &[termmap::TermResult]) -> Vec<JsonTermResult> {
    results
        .iter()
        .map(|result| JsonTermResult {
            term: result.term.clone(),
            status: format!("{:?}", result.status),
            error: result.error.clone(),
            results: to_json_rows(&result.results),
        })
        .collect()
}

fn to_json_systems(
    info: &std::collections::HashMap<Vocabulary, termmap::SystemInfo>,
) -> std::collections::HashMap<String, JsonSystemInfo> {
    info.iter()
        .map(|(vocabulary, system)| {
            (
                vocabulary.as_str().to_string(),
                JsonSystemInfo { ready: system.ready, row_count: system.row_count, uri: system.uri.to_string() },
            )
        })
        .collect()
}

#[derive(serde::Serialize)]
struct JsonRow {
    code: String,
    display: String,
    confidence: f64,
    match_type: String,
    source: String,
    context_enhanced: bool,
}

#[derive(serde::Serialize)]
struct JsonTermResult {
    term: String,
    status: String,
    error: Option<String>,
    results: std::collections::HashMap<String, Vec<JsonRow>>,
}

#[derive(serde::Serialize)]
struct JsonSystemInfo {
    ready: bool,
    row_count: usize,
    uri: String,
}
