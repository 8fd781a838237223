//! Remote command/observe protocol, job control, log-stream replay,
//! health endpoint, and configuration loading (spec §6).

pub mod config;
pub mod error;
pub mod health;
pub mod jobcontrol;
pub mod listeners;
pub mod logstream;
pub mod protocol;

pub use config::{load_config, CoreConfig};
pub use error::{InterfaceError, Result};
pub use health::{router as health_router, HealthState};
pub use jobcontrol::{drop_job, kill_job, start_job};
pub use listeners::{Listener, ListenerRegistry};
pub use logstream::{ReplayedObject, Replayer};
pub use protocol::{read_frame, write_frame, Packet, Session};
