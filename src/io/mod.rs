pub mod input;
pub mod output;

pub use input::{load_problem, LoadedProblem};
pub use output::format_solution;
