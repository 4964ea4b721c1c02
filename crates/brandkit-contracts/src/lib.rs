pub mod captions;
pub mod creative;
pub mod events;
pub mod profile;
pub mod report;
pub mod session;
