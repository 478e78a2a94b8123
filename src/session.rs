//! Session dispatch loop and agent registry.
//!
//! A [`ChatSession`] owns one I/O context and drives a read-dispatch loop:
//! read a unit of input, route commands, and hand chat messages to the
//! model with a per-agent response handler. The [`AgentRegistry`] keeps an
//! independent conversation history per agent so switching back resumes
//! where that agent left off.

use std::collections::BTreeMap;

use anyhow::{Result, bail};

use crate::command::{self, Command, Input};
use crate::config::{AgentConfig, Config};
use crate::interrupt::{self, InterruptedError};
use crate::io::IoContext;
use crate::model::{ChatMessage, ChatModel};
use crate::security::SecurityPolicy;

/// Outcome of an agent switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    Switched,
    AlreadyActive,
}

/// Configured agents plus their per-agent conversation state.
///
/// Histories are created lazily: an agent gets one the first time it
/// becomes active, and keeps it across switches.
#[derive(Debug)]
pub struct AgentRegistry {
    config: Config,
    active: String,
    histories: BTreeMap<String, Vec<ChatMessage>>,
}

impl AgentRegistry {
    /// Builds a registry with `initial` active. Fails if `initial` is not
    /// a configured agent.
    pub fn new(config: Config, initial: &str) -> Result<Self> {
        if config.agent(initial).is_none() {
            bail!("Unknown agent: {initial}");
        }
        let mut histories = BTreeMap::new();
        histories.insert(initial.to_string(), Vec::new());
        Ok(Self {
            config,
            active: initial.to_string(),
            histories,
        })
    }

    /// Builds a registry starting on the configured base agent.
    pub fn from_config(config: Config) -> Result<Self> {
        let initial = config.global.base_agent.clone();
        Self::new(config, &initial)
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    /// The active agent's configuration.
    pub fn active_agent(&self) -> AgentConfig {
        // `active` is validated on construction and on every switch.
        self.config.agent(&self.active).unwrap_or_default()
    }

    /// Makes `name` the active agent, opening its history on first use.
    pub fn switch(&mut self, name: &str) -> Result<Switch> {
        if self.config.agent(name).is_none() {
            bail!("Unknown agent: {name}");
        }
        if name == self.active {
            return Ok(Switch::AlreadyActive);
        }
        self.histories.entry(name.to_string()).or_default();
        self.active = name.to_string();
        Ok(Switch::Switched)
    }

    /// The active agent's conversation so far.
    pub fn history(&self) -> &[ChatMessage] {
        self.histories
            .get(&self.active)
            .map_or(&[], Vec::as_slice)
    }

    pub fn push_turn(&mut self, message: ChatMessage) {
        self.histories.entry(self.active.clone()).or_default().push(message);
    }

    /// Agents with an open conversation, in name order.
    pub fn open_sessions(&self) -> Vec<&str> {
        self.histories.keys().map(String::as_str).collect()
    }

    /// All configured agent names.
    pub fn agent_names(&self) -> Vec<String> {
        self.config.agent_names()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Running,
    Exiting,
}

/// One interactive session: an I/O context, a model, and a registry.
pub struct ChatSession<M> {
    io: IoContext,
    model: M,
    registry: AgentRegistry,
    state: SessionState,
}

impl<M: ChatModel> ChatSession<M> {
    pub fn new(io: IoContext, model: M, registry: AgentRegistry) -> Self {
        let session = Self {
            io,
            model,
            registry,
            state: SessionState::Running,
        };
        session.apply_active_agent();
        session
    }

    /// Security policy for the active agent, for hosts wiring up tools.
    pub fn security_policy(&self) -> SecurityPolicy {
        SecurityPolicy::new(self.registry.active_agent().security)
    }

    pub fn io(&self) -> &IoContext {
        &self.io
    }

    /// Runs the dispatch loop until an exit command arrives.
    ///
    /// The caller keeps ownership of the context and is responsible for
    /// closing it afterward.
    pub async fn run(&mut self) -> Result<()> {
        while self.state == SessionState::Running {
            self.step().await?;
        }
        Ok(())
    }

    /// One loop iteration: read, parse, dispatch. A `None` read (empty
    /// queued inbound) is a no-op iteration.
    pub async fn step(&mut self) -> Result<()> {
        let Some(line) = self.io.read(None) else {
            return Ok(());
        };

        match command::parse(&line) {
            Input::Cmd(cmd) => self.handle_command(cmd),
            Input::Msg(text) => self.handle_message(&text).await?,
        }
        Ok(())
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Exit => self.state = SessionState::Exiting,
            Command::Help => self.print_help(),
            // The terminal backend already cleared the screen.
            Command::Clear => {}
            Command::History => self.print_history(),
            Command::Agent(name) => self.switch_agent(&name),
            Command::Sessions => self.list_sessions(),
            Command::Agents => self.list_agents(),
            Command::Unknown(raw) => self.io.error(&format!("Unknown command: {raw}")),
        }
    }

    async fn handle_message(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let agent = self.registry.active_agent();
        let mut handler = self
            .io
            .create_response_handler(agent.color, agent.stream_delay_ms);

        self.registry.push_turn(ChatMessage::user(text));

        match self.model.generate(self.registry.history(), &mut handler).await {
            Ok(response) => {
                self.registry.push_turn(ChatMessage::assistant(response));
            }
            Err(e) if e.downcast_ref::<InterruptedError>().is_some() => {
                interrupt::reset();
                self.io.warn("Interrupted");
            }
            // The model already reported through the handler's error path;
            // the user turn stays, no assistant turn is recorded.
            Err(e) => {
                tracing::warn!(agent = self.registry.active_name(), error = %e, "generation failed");
            }
        }
        Ok(())
    }

    fn switch_agent(&mut self, name: &str) {
        match self.registry.switch(name) {
            Ok(Switch::Switched) => {
                self.apply_active_agent();
                self.io.info(&format!("Switched to agent: {name}"));
            }
            Ok(Switch::AlreadyActive) => {
                self.io.info(&format!("Already in session: {name}"));
            }
            Err(e) => self.io.error(&format!("Error: {e:#}")),
        }
    }

    /// Points the terminal cursor at the active agent.
    fn apply_active_agent(&self) {
        let agent = self.registry.active_agent();
        self.io
            .set_cursor(format!("{}> ", self.registry.active_name()), agent.color);
    }

    fn print_help(&self) {
        self.io.println("Available commands:");
        self.io.println("  /exit, /quit, /q - Exit the session");
        self.io.println("  /help, /? - Show this help message");
        self.io.println("  /clear, /cls - Clear the screen");
        self.io.println("  /history - Show conversation history");
        self.io.println("  /agent <name> - Switch to a different agent");
        self.io.println("  /sessions - List agents with an open conversation");
        self.io.println("  /agents - List available agent configurations");
    }

    fn print_history(&self) {
        let history = self.registry.history();
        if history.is_empty() {
            self.io.println("No conversation yet.");
            return;
        }
        for message in history {
            let speaker = match message.role {
                crate::model::Role::User => "you",
                crate::model::Role::Assistant => self.registry.active_name(),
            };
            self.io.println(&format!("{speaker}: {}", message.content));
        }
    }

    fn list_sessions(&self) {
        self.io.println("Active sessions:");
        for name in self.registry.open_sessions() {
            let marker = if name == self.registry.active_name() {
                " *"
            } else {
                ""
            };
            self.io.println(&format!("  {name}{marker}"));
        }
    }

    fn list_agents(&self) {
        self.io.println("Available agents:");
        for name in self.registry.agent_names() {
            let marker = if name == self.registry.active_name() {
                " (current)"
            } else {
                ""
            };
            self.io.println(&format!("  {name}{marker}"));
        }
    }
}
