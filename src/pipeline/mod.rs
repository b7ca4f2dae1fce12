/// Card generation pipeline
///
/// A pipeline is a fixed, ordered list of [`CardStep`]s. Each step reads the
/// card table, fills the blank cells of one column and writes them back. A
/// failing step is logged and recorded in the [`PipelineReport`]; the
/// remaining steps still run.

pub mod generators;
pub mod seeds;
mod steps;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::db::DbPool;

/// What a pipeline step needs to run
#[derive(Clone)]
pub struct PipelineContext {
    pub pool: Arc<DbPool>,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

/// One column-filling step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CardStep {
    FetchCoins,
    CardIds,
    PackId,
    CardDate,
    UserType,
    Owner,
    Coins,
    UsdAmount,
    Name,
    Chain,
    Theme,
    CardType,
    Keys,
    Url,
    MonsterPower,
    PowerCombat,
    Description,
    QrCodes,
    Images,
    ImageNames,
    Status,
    AirtableSync,
    ApplyClaims,
    SyncUserTypes,
}

impl CardStep {
    pub fn name(self) -> &'static str {
        match self {
            CardStep::FetchCoins => "fetch-coins",
            CardStep::CardIds => "card-ids",
            CardStep::PackId => "pack-id",
            CardStep::CardDate => "card-date",
            CardStep::UserType => "user-type",
            CardStep::Owner => "owner",
            CardStep::Coins => "coins",
            CardStep::UsdAmount => "usd-amount",
            CardStep::Name => "name",
            CardStep::Chain => "chain",
            CardStep::Theme => "theme",
            CardStep::CardType => "card-type",
            CardStep::Keys => "keys",
            CardStep::Url => "url",
            CardStep::MonsterPower => "monster-power",
            CardStep::PowerCombat => "power-combat",
            CardStep::Description => "description",
            CardStep::QrCodes => "qr-codes",
            CardStep::Images => "images",
            CardStep::ImageNames => "image-names",
            CardStep::Status => "status",
            CardStep::AirtableSync => "airtable-sync",
            CardStep::ApplyClaims => "apply-claims",
            CardStep::SyncUserTypes => "sync-user-types",
        }
    }

    /// Runs this step, turning an error into a `Failed` outcome
    #[instrument(skip(ctx), fields(step = self.name()))]
    pub async fn run(self, ctx: &PipelineContext) -> StepOutcome {
        let result = match self {
            CardStep::FetchCoins => steps::fetch_coins(ctx).await,
            CardStep::CardIds => steps::card_ids(ctx),
            CardStep::PackId => steps::pack_id(ctx),
            CardStep::CardDate => steps::card_date(ctx),
            CardStep::UserType => steps::user_type(ctx),
            CardStep::Owner => steps::owner(ctx),
            CardStep::Coins => steps::coins(ctx),
            CardStep::UsdAmount => steps::usd_amount(ctx),
            CardStep::Name => steps::name(ctx),
            CardStep::Chain => steps::chain(ctx),
            CardStep::Theme => steps::theme(ctx),
            CardStep::CardType => steps::card_type(ctx),
            CardStep::Keys => steps::keys(ctx),
            CardStep::Url => steps::url(ctx),
            CardStep::MonsterPower => steps::monster_power(ctx),
            CardStep::PowerCombat => steps::power_combat(ctx),
            CardStep::Description => steps::description(ctx),
            CardStep::QrCodes => steps::qr_codes(ctx).await,
            CardStep::Images => steps::images(ctx).await,
            CardStep::ImageNames => steps::image_names(ctx).await,
            CardStep::Status => steps::status(ctx),
            CardStep::AirtableSync => steps::airtable_sync(ctx).await,
            CardStep::ApplyClaims => steps::apply_claims(ctx),
            CardStep::SyncUserTypes => steps::sync_user_types(ctx),
        };

        match result {
            Ok(outcome) => {
                info!("Step {}: {}", self, outcome);
                outcome
            }
            Err(e) => {
                error!("Step {} failed: {:#}", self, e);
                StepOutcome::Failed { error: format!("{:#}", e) }
            }
        }
    }
}

impl fmt::Display for CardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Number of cells, cards or files written
    Completed { filled: usize },
    Skipped { reason: String },
    Failed { error: String },
}

impl StepOutcome {
    pub fn completed(filled: usize) -> Self {
        StepOutcome::Completed { filled }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped { reason: reason.into() }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Completed { filled } => write!(f, "completed ({} written)", filled),
            StepOutcome::Skipped { reason } => write!(f, "skipped ({})", reason),
            StepOutcome::Failed { error } => write!(f, "failed ({})", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: CardStep,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// The named step lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Pipeline {
    #[default]
    CreateCards,
    ChangeOwner,
}

const CREATE_CARDS_STEPS: [CardStep; 22] = [
    CardStep::FetchCoins,
    CardStep::CardIds,
    CardStep::PackId,
    CardStep::CardDate,
    CardStep::UserType,
    CardStep::Owner,
    CardStep::Coins,
    CardStep::UsdAmount,
    CardStep::Name,
    CardStep::Chain,
    CardStep::Theme,
    CardStep::CardType,
    CardStep::Keys,
    CardStep::Url,
    CardStep::MonsterPower,
    CardStep::PowerCombat,
    CardStep::Description,
    CardStep::QrCodes,
    CardStep::Images,
    CardStep::ImageNames,
    CardStep::Status,
    CardStep::AirtableSync,
];

const CHANGE_OWNER_STEPS: [CardStep; 3] = [
    CardStep::ApplyClaims,
    CardStep::SyncUserTypes,
    CardStep::AirtableSync,
];

impl Pipeline {
    pub fn name(self) -> &'static str {
        match self {
            Pipeline::CreateCards => "create-cards",
            Pipeline::ChangeOwner => "change-owner",
        }
    }

    /// Steps in run order
    pub fn steps(self) -> &'static [CardStep] {
        match self {
            Pipeline::CreateCards => &CREATE_CARDS_STEPS,
            Pipeline::ChangeOwner => &CHANGE_OWNER_STEPS,
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of every step of one run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub pipeline: Pipeline,
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.outcome.is_failed())
    }

    pub fn failed_steps(&self) -> Vec<CardStep> {
        self.steps
            .iter()
            .filter(|s| s.outcome.is_failed())
            .map(|s| s.step)
            .collect()
    }
}

/// Runs every step of `pipeline` in order
///
/// Steps never abort the run; a failure is recorded and the next step starts.
#[instrument(skip(ctx))]
pub async fn run_pipeline(ctx: &PipelineContext, pipeline: Pipeline) -> PipelineReport {
    info!("Starting pipeline {}", pipeline);

    let mut report = PipelineReport {
        pipeline,
        steps: Vec::with_capacity(pipeline.steps().len()),
    };

    for &step in pipeline.steps() {
        let outcome = step.run(ctx).await;
        report.steps.push(StepReport { step, outcome });
    }

    if report.has_failures() {
        warn!("Pipeline {} finished with failed steps: {:?}", pipeline, report.failed_steps());
    } else {
        info!("Pipeline {} finished", pipeline);
    }

    report
}
