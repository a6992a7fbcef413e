pub mod ats;
pub mod pipeline;
