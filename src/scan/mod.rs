//! Incremental memory search engine

pub mod collection;
pub mod compare;
pub mod region;
pub mod search;
pub mod session;

pub use collection::{DeactivateOutcome, RegionCollection, BUFFER_PAD};
pub use compare::{comparator, CompareOp, Scalar};
pub use region::Region;
pub use search::{is_satisfied, run_search, ResolvedSearch, ScanConfig, SearchMode, SearchRequest};
pub use session::{Candidate, SearchOutcome, SearchSession, UndoState};
