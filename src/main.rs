use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use sme_classifier_lib::init_logging;
use sme_classifier_lib::services::{
    language_identifier, load_model, AppConfig, ConfigStore, Evaluator, LoggingConfig,
    MalformedLinePolicy, ModelBackend,
};

#[derive(Parser, Debug)]
#[command(name = "sme-classifier", version, about = "Classify Northern Sami text and evaluate accuracy")]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true, env = "SME_CLASSIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// Language-identification model file
    #[arg(long, global = true, env = "SME_CLASSIFIER_MODEL")]
    model: Option<PathBuf>,

    /// Identification backend: whatlang (default, ignores --model and cannot
    /// name `sme`) or fasttext (loads lid.176.bin, needs the `fasttext` feature)
    #[arg(long, global = true)]
    backend: Option<ModelBackend>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a labeled corpus and print its accuracy
    Evaluate(EvaluateArgs),
    /// Classify one or more texts
    Classify {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Write the default config file
    InitConfig {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct EvaluateArgs {
    /// Labeled corpus file
    #[arg(long, env = "SME_CLASSIFIER_CORPUS")]
    corpus: Option<PathBuf>,

    /// Fail on lines shorter than the label token instead of skipping them
    #[arg(long)]
    strict_lines: bool,

    /// Print unclassified, strict accuracy and per-label counts
    #[arg(long)]
    details: bool,

    /// Write the full report as JSON
    #[arg(long)]
    out: Option<PathBuf>,
}

fn config_store(cli: &Cli) -> Result<ConfigStore> {
    match &cli.config {
        Some(path) => Ok(ConfigStore::at_file(path.clone())),
        None => ConfigStore::default_config_dir()
            .map(ConfigStore::new)
            .context("could not determine config directory"),
    }
}

fn apply_overrides(cli: &Cli, config: &mut AppConfig) {
    if let Some(path) = &cli.model {
        config.model.path = path.clone();
    }
    if let Some(backend) = cli.backend {
        config.model.backend = backend;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = config_store(&cli)?;

    // Must not parse the current file: it may be the corrupt one being replaced.
    if let Some(Command::InitConfig { force }) = cli.command {
        init_logging(&LoggingConfig::default(), cli.verbose);
        return init_config(&store, force);
    }

    let mut config = store
        .load()
        .with_context(|| format!("loading {}", store.config_file().display()))?;
    apply_overrides(&cli, &mut config);

    init_logging(&config.logging, cli.verbose);
    info!(config = %store.config_file().display(), backend = %config.model.backend, "sme-classifier starting");

    match cli.command {
        Some(Command::InitConfig { force }) => init_config(&store, force),
        Some(Command::Classify { ref texts }) => classify(&config, texts),
        Some(Command::Evaluate(ref args)) => evaluate(&config, args),
        None => evaluate(&config, &EvaluateArgs::default()),
    }
}

fn init_config(store: &ConfigStore, force: bool) -> Result<()> {
    store.init(force)?;
    println!("Wrote config: {}", store.config_file().display());
    Ok(())
}

fn classify(config: &AppConfig, texts: &[String]) -> Result<()> {
    let classifier = config.classifier.classifier()?;
    let labels = config.classifier.labels();
    let model = load_model(config.model.backend, &config.model.path)?;

    for text in texts {
        let prediction = language_identifier(&model, text)?;
        let outcome = classifier.decide(&prediction);
        println!("{}\t{:.4}\t{}", outcome.label(&labels), prediction.confidence, text);
    }
    Ok(())
}

fn evaluate(config: &AppConfig, args: &EvaluateArgs) -> Result<()> {
    let classifier = config.classifier.classifier()?;
    let corpus = args.corpus.clone().unwrap_or_else(|| config.corpus.path.clone());
    let policy = if args.strict_lines {
        MalformedLinePolicy::Error
    } else {
        config.corpus.malformed_lines
    };

    let model = load_model(config.model.backend, &config.model.path)
        .with_context(|| format!("loading {} model", config.model.backend))?;
    let evaluator = Evaluator::new(&model, classifier, config.classifier.labels());
    let evaluation = evaluator
        .evaluate_file(&corpus, policy)
        .with_context(|| format!("evaluating {}", corpus.display()))?;

    let report = evaluation.into_report(
        &corpus.display().to_string(),
        config.model.backend.as_str(),
        &classifier,
    )?;

    // Debug formatting keeps the float literal form, e.g. `1.0`.
    println!("Accuracy: {:?}", report.accuracy);

    if args.details {
        let tally = &report.tally;
        println!("Unclassified: {}", tally.unclassified);
        println!("Hits: {} / {}", tally.hits, tally.total);
        println!("Skipped lines: {}", report.skipped_lines);
        println!("Strict accuracy: {:?}", report.strict_accuracy);
        for (label, counts) in &tally.by_label {
            println!(
                "  {}: total={} target={} other={} unclassified={}",
                label, counts.total, counts.target, counts.other, counts.unclassified
            );
        }
    }

    if let Some(out_path) = &args.out {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(out_path, json)
            .with_context(|| format!("writing {}", out_path.display()))?;
        info!(path = %out_path.display(), "Wrote JSON report");
    }

    Ok(())
}
