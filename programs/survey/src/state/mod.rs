pub mod events;
pub mod submission;

pub use events::*;
pub use submission::*;
