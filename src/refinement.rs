pub mod surplus;
pub mod user_defined;

pub use surplus::SurplusRefinement;
pub use user_defined::{UserDefinedRefinement, UserRefinementFunction};
