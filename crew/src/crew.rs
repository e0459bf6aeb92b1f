//! Crews: agents plus an ordered list of tasks.

use crate::agent::Agent;
use crate::backend::ChatBackend;
use crate::error::CrewError;
use crate::task::{Task, TaskOutput};
use crate::toolbox::{NoTools, Toolbox};
use llm::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// How tasks are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Process {
    /// One task at a time, in order, outputs feeding forward.
    #[default]
    Sequential,
}

/// The outputs of a finished kickoff.
#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub tasks_output: Vec<TaskOutput>,
}

impl CrewOutput {
    /// The output of the last task.
    pub fn raw(&self) -> &str {
        self.tasks_output
            .last()
            .map(|output| output.raw.as_str())
            .unwrap_or("")
    }
}

/// A pipeline of agents executing tasks.
pub struct Crew {
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    process: Process,
    backend: Arc<dyn ChatBackend>,
    toolbox: Arc<dyn Toolbox>,
    time_limit: Option<Duration>,
}

impl Crew {
    /// Create an empty crew talking to `backend`.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            agents: Vec::new(),
            tasks: Vec::new(),
            process: Process::Sequential,
            backend,
            toolbox: Arc::new(NoTools),
            time_limit: None,
        }
    }

    pub fn with_toolbox(mut self, toolbox: Arc<dyn Toolbox>) -> Self {
        self.toolbox = toolbox;
        self
    }

    pub fn with_process(mut self, process: Process) -> Self {
        self.process = process;
        self
    }

    /// Bound the whole kickoff; in-flight calls are cancelled when it expires.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Add an agent and return its index for use in tasks.
    pub fn add_agent(&mut self, agent: Agent) -> usize {
        self.agents.push(agent);
        self.agents.len() - 1
    }

    /// Replace the task list.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn process(&self) -> Process {
        self.process
    }

    /// Check that tasks reference existing agents and only earlier tasks.
    pub fn validate(&self) -> Result<(), CrewError> {
        if self.tasks.is_empty() {
            return Err(CrewError::Invalid("crew has no tasks".to_string()));
        }
        for (index, task) in self.tasks.iter().enumerate() {
            if task.agent >= self.agents.len() {
                return Err(CrewError::Invalid(format!(
                    "task {index} refers to missing agent {}",
                    task.agent
                )));
            }
            if let Some(bad) = task.context.iter().find(|&&c| c >= index) {
                return Err(CrewError::Invalid(format!(
                    "task {index} uses the output of task {bad}, which has not run yet"
                )));
            }
        }
        Ok(())
    }

    /// Run every task and collect the outputs.
    pub async fn kickoff(&self, cancel: &CancellationToken) -> Result<CrewOutput, CrewError> {
        self.validate()?;

        let Some(limit) = self.time_limit else {
            return self.run(cancel).await;
        };

        let scoped = cancel.child_token();
        match tokio::time::timeout(limit, self.run(&scoped)).await {
            Ok(result) => result,
            Err(_) => {
                scoped.cancel();
                Err(CrewError::TimeLimit(limit))
            }
        }
    }

    async fn run(&self, cancel: &CancellationToken) -> Result<CrewOutput, CrewError> {
        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());

        match self.process {
            Process::Sequential => {
                for (index, task) in self.tasks.iter().enumerate() {
                    let agent = &self.agents[task.agent];
                    let context: Vec<&TaskOutput> =
                        task.context.iter().map(|&c| &outputs[c]).collect();
                    let prompt = task.render_prompt(&context);

                    info!(
                        task = index + 1,
                        total = self.tasks.len(),
                        agent = %agent.role,
                        "starting task"
                    );

                    let raw = agent
                        .execute(&prompt, self.backend.as_ref(), self.toolbox.as_ref(), cancel)
                        .await?;

                    outputs.push(TaskOutput {
                        agent_role: agent.role.clone(),
                        description: task.description.clone(),
                        raw,
                    });
                }
            }
        }

        Ok(CrewOutput {
            tasks_output: outputs,
        })
    }
}
