//! Sequential LLM agent crews.
//!
//! An [`Agent`] is a persona (role, goal, backstory) plus the tools it may
//! call. A [`Task`] is an instruction for one agent, optionally fed with the
//! outputs of earlier tasks. A [`Crew`] runs its tasks in order against a
//! [`ChatBackend`], resolving tool calls through a [`Toolbox`].
//!
//! # Example
//!
//! ```ignore
//! use crew::{Agent, Crew, Task, LlmSettings};
//! use std::sync::Arc;
//!
//! let settings = LlmSettings::from_env()?;
//! let backend = Arc::new(settings.client());
//! let writer = Agent::new("Writer", "Write a haiku", "A terse poet");
//!
//! let mut crew = Crew::new(backend);
//! let writer = crew.add_agent(writer);
//! crew.set_tasks(vec![Task::new("Write about rust", "Three lines", writer)]);
//!
//! let output = crew.kickoff(&Default::default()).await?;
//! println!("{}", output.raw());
//! ```

mod agent;
mod backend;
mod crew;
mod error;
pub mod logging;
mod retry;
pub mod settings;
mod task;
pub mod testing;
mod toolbox;

pub use agent::Agent;
pub use backend::ChatBackend;
pub use crew::{Crew, CrewOutput, Process};
pub use error::CrewError;
pub use retry::Backoff;
pub use settings::{ConfigError, LlmSettings};
pub use task::{Task, TaskOutput};
pub use toolbox::{NoTools, Toolbox};

pub use llm::CancellationToken;
