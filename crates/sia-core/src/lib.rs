pub mod error;
pub use error::{BoxError, CoreError, LoopError};

pub mod looping;
pub use looping::{Exit, LoopingCall, LoopingCallHandle, Step, WorkResult};

pub mod locks;
pub use locks::{LockSweep, SweepReport};

pub mod ids;
pub mod net;

mod system;
pub use system::{hostname, init_uptime, pid_alive, uptime, uptime_seconds};
