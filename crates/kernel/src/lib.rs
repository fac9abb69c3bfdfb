//! Kernel for the bookshelf workspace: settings, the module lifecycle, and
//! the time sources every other crate is built against.

pub mod clock;
pub mod module;
pub mod registry;
pub mod settings;

pub use clock::{Clock, Latency, ManualClock, NoLatency, RandomLatency, SystemClock};
pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
