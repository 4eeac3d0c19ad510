//! Pure reducer for server-backed lists with local filter and sort state.
//!
//! The source rows and the filter settings live in one [`ListState`];
//! the visible rows are always recomputed from both, never patched in place.

mod assignments;
mod reducer;

pub use assignments::{
    AssignmentFilter, AssignmentSortKey, AssignmentStatus, AssignmentSummary, SortDirection,
};
pub use reducer::{Keyed, ListAction, ListFilter, ListState, reduce};
