pub mod decisions;
pub mod filter;
pub mod reconcile;
pub mod session;
pub mod writer;

pub use decisions::{Decision, Decisions, LineKey, LineKind, OperationDecisions};
pub use filter::{apply_filter, parse_filter_expr, FilterRule};
pub use reconcile::{added_groups, added_lines, group_containing, reconcile, removed_lines};
pub use session::{
    ApplySummary, Direction, DiscardSummary, ReviewSession, ReviewState, SessionOptions,
    DEFAULT_GROUP_GAP,
};
pub use writer::{WriteIntent, WriteOutcome, WriteScheduler};
