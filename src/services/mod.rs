pub mod query_dispatcher;
pub mod response_normalizer;
pub mod stale_guard;

pub use query_dispatcher::QueryDispatcher;
pub use response_normalizer::{classify_failure_text, normalize, OutcomeStatus, QueryOutcome, SizeReport};
pub use stale_guard::ResponseGuard;
