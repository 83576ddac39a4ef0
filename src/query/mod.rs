//! Read pipeline: parameters -> join plan -> filter -> SQL, and the shape applied to the rows.

pub mod filter;
pub mod params;
pub mod planner;
pub mod shape;

pub use filter::translate;
pub use params::{JoinColumn, QueryRequest};
pub use planner::{plan, JoinPlan, JoinTarget, PlannedJoin};
pub use shape::{normalize_lookup_value, OutputField, ResultShape, SubField};
