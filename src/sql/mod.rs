//! Safe SQL builder: identifiers from the catalog only, values as parameters.

mod builder;
pub mod filter;
pub mod params;
pub use builder::*;
pub use filter::{Aggregate, CompareOp, Filter, OrderBy, SortDirection};
pub use params::*;
