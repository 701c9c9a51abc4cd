pub mod classifier;
pub mod offset;
pub mod remote;
pub mod saliency;

pub use classifier::*;
pub use offset::*;
pub use remote::*;
pub use saliency::*;
