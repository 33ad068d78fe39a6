pub mod export;
pub mod process;
pub mod project;
pub mod report;
pub mod status;
pub mod sync;
pub mod upload;
