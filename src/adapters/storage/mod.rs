//! Report store adapters.

pub mod file;
pub mod memory;

pub use file::FileReportStore;
pub use memory::InMemoryReportStore;
