pub mod hint;
pub mod report;

pub use hint::*;
pub use report::*;
