//! Campaign creation workflow

mod chat;
mod create;
mod flow;

pub use chat::{ChatLog, ChatMessage, Role, thinking_steps};
pub use create::{CampaignDraft, CreateError, CreateOutcome, CreateStep, StepFailure, execute, round_robin};
pub use flow::{CampaignWizard, CreatePhase, WizardStep};
