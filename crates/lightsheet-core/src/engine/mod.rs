mod executor;
mod fiji;
mod invocation;
mod operation;

pub use executor::{Backend, StageExecutor};
pub use fiji::{macro_source, FijiBackend};
pub use invocation::{marshal, Invocation};
pub use operation::StageOperation;
