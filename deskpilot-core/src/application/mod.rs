pub mod agent;
pub mod recovery;
pub mod tooling;
