pub mod error;
pub mod pubsub;
pub mod queue;
pub mod tasks;

pub use error::{BrokerError, Result};
pub use pubsub::{JobUpdateMessage, Publisher, Subscriber};
pub use queue::TaskQueues;
pub use tasks::{QUEUE_CPU_TASKS, QUEUE_GPU_TASKS, TOPIC_JOB_UPDATES, TaskEnvelope};
