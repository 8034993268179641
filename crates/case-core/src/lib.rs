pub mod action_type;
pub mod case;
pub mod error;
pub mod event;
pub mod execution;
pub mod followup;
pub mod ledger;
pub mod message;
pub mod mutations;
pub mod portal_task;
pub mod proposal;
pub mod run;
pub mod snapshot;
pub mod types;

pub use action_type::{ActionPolicy, ActionType, Classification, DenialSubtype};
pub use case::{AgencyIdentity, AutopilotMode, Case, CaseStatus, PauseReason, SubmissionChannel};
pub use error::CoreError;
pub use event::CaseEvent;
pub use execution::{Execution, ExecutionStatus, ProviderKind};
pub use followup::{FollowupSchedule, FollowupStatus};
pub use ledger::EventLedgerRow;
pub use message::{Message, MessageDirection, ThreadHeaders};
pub use mutations::{
    CaseMutation, ExecutionMutation, FollowupMutation, Mutations, Patch, PortalTaskMutation,
    Projection, ProposalMutation, RunMutation,
};
pub use portal_task::{PortalTask, PortalTaskStatus};
pub use proposal::{DecisionAction, HumanDecision, Proposal, ProposalStatus};
pub use run::{Run, RunStatus, RunTrigger};
pub use snapshot::CaseSnapshot;
pub use types::{CaseId, ExecutionId, MessageId, PortalTaskId, ProposalId, RunId};
