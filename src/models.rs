pub mod filter;
pub mod project;
pub mod session;
pub mod tag;
pub mod upload;
