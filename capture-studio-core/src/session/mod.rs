pub mod handoff;
pub mod recorder;
pub mod sources;
pub mod studio;
