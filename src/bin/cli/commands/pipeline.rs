use anyhow::{bail, Result};
use clap::Subcommand;
use nakama::pipeline::{run_pipeline, CardStep, Pipeline, PipelineContext, PipelineReport, StepReport};

use crate::output::{self, OutputConfig};

/// Pipeline commands
#[derive(Subcommand, Debug)]
pub enum PipelineCommands {
    /// Create the next batch of cards and fill every column
    CreateCards,
    /// Apply pending ownership claims and resync user types
    ChangeOwner,
    /// Run a single step on its own
    Step {
        #[clap(value_enum)]
        step: CardStep,
    },
}

pub async fn execute(ctx: &PipelineContext, cmd: PipelineCommands, output_config: &OutputConfig) -> Result<()> {
    let report = match cmd {
        PipelineCommands::CreateCards => run_pipeline(ctx, Pipeline::CreateCards).await,
        PipelineCommands::ChangeOwner => run_pipeline(ctx, Pipeline::ChangeOwner).await,
        PipelineCommands::Step { step } => {
            let outcome = step.run(ctx).await;
            let pipeline = if Pipeline::ChangeOwner.steps().contains(&step) {
                Pipeline::ChangeOwner
            } else {
                Pipeline::CreateCards
            };
            PipelineReport {
                pipeline,
                steps: vec![StepReport { step, outcome }],
            }
        }
    };

    output::print_report(&report, output_config);

    if report.has_failures() {
        let failed: Vec<&str> = report.failed_steps().iter().map(|s| s.name()).collect();
        bail!("Failed steps: {}", failed.join(", "));
    }
    Ok(())
}
