// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and delegates to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`   — train on labeled patches, write checkpoints
//   2. `predict` — score the test directory, write submission
//   3. `stats`   — summarise the label table
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, StatsArgs, TrainArgs};

/// clap generates argument parsing from these fields via the
/// Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "histo-cancer",
    version,
    about = "Train a CNN to detect metastatic tissue in histopathology patches, then score a test set."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case; nothing is computed here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Stats(args)   => run_stats(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on labels in: {}", args.labels_csv);
    let checkpoint_dir = args.checkpoint_dir.clone();

    let report = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training {:?} after {} epochs. Best epoch: {}, val_loss={:.4}, AUC={:.4}",
        report.outcome.state,
        report.outcome.epochs_run,
        report.outcome.best_epoch.map_or_else(|| "none".to_string(), |e| e.to_string()),
        report.outcome.best_val_loss,
        report.evaluation.auc,
    );
    println!("\n{}", report.evaluation.confusion);
    println!("\n{}", report.evaluation.report);
    println!("Checkpoint saved to '{}'.", checkpoint_dir);
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let output = args.output.clone();
    let rows   = PredictUseCase::new(args.into()).execute()?;
    println!("Wrote {rows} predictions to '{output}'.");
    Ok(())
}

fn run_stats(args: StatsArgs) -> Result<()> {
    use crate::application::stats_use_case::StatsUseCase;

    let stats = StatsUseCase::new(args.labels_csv.clone()).execute()?;
    let dist  = stats.distribution;
    println!("Label table: {}", args.labels_csv);
    println!("  rows:      {}", stats.rows);
    println!("  negative:  {}", dist.negatives);
    println!("  positive:  {}", dist.positives);
    println!("  positive ratio: {:.4}", dist.positive_ratio());
    Ok(())
}
