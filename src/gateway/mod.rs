//! Signal handling: symbol resolution, position inspection, order execution

pub mod executor;
pub mod inspector;
pub mod resolver;
pub mod router;
pub mod signal;

pub use executor::OrderExecutor;
pub use inspector::PositionInspector;
pub use resolver::SymbolResolver;
pub use router::SignalRouter;
pub use signal::{Outcome, ResultStatus, Signal, SignalKind, SignalResult};
