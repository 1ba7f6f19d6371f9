//! Filesystem adapters.

pub mod catalog;

pub use catalog::FsModuleCatalog;
