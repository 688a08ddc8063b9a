pub mod submit_survey;
pub use submit_survey::*;

pub mod request_decryption;
pub use request_decryption::*;

pub mod queries;
pub use queries::*;
