// Encoding engine - independent of the CLI front-end

pub mod cmd;
pub mod job;
pub mod locate;
pub mod plan;
pub mod probe;
pub mod process;
pub mod progress;
pub mod types;
pub mod worker;

pub use job::{JobError, run_job};
pub use process::{EncoderProcess, SpawnError};
pub use types::{EncodeJob, EncodePlan, JobEvent, Mode};
pub use worker::{JobHandle, start_job};
