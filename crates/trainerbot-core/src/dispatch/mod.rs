//! Message dispatch: command classification, reply rendering and the router.

pub mod command;
pub mod render;
pub mod router;

pub use router::DispatchRouter;
