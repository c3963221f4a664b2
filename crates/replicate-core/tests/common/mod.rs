#![allow(dead_code, unreachable_pub)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use replicate_config::MemorySettings;
use replicate_core::{
    CommandOutcome, CommandRunner, CommandSpec, Dispatcher, LineCallback, ReplicateError,
    ReplicateResult, ReportSink,
};
use serde_json::Value;

/// Which sink a recorded line went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Console,
    Status,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(Channel, String)>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<(Channel, String)> {
        self.lines.lock().expect("sink lock").clone()
    }

    pub fn console_lines(&self) -> Vec<String> {
        self.channel(Channel::Console)
    }

    pub fn status_lines(&self) -> Vec<String> {
        self.channel(Channel::Status)
    }

    fn channel(&self, wanted: Channel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(channel, _)| *channel == wanted)
            .map(|(_, line)| line)
            .collect()
    }
}

impl ReportSink for RecordingSink {
    fn console(&self, message: &str) {
        self.lines
            .lock()
            .expect("sink lock")
            .push((Channel::Console, message.to_string()));
    }

    fn status(&self, message: &str) {
        self.lines
            .lock()
            .expect("sink lock")
            .push((Channel::Status, message.to_string()));
    }
}

/// Scripted behaviour for one program.
#[derive(Debug, Clone)]
pub enum Script {
    Exit { code: i32, output: Vec<String> },
    Missing,
    Unreadable,
}

/// Runner that records commands instead of executing them.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    scripts: HashMap<String, Script>,
    commands: Mutex<Vec<CommandSpec>>,
}

impl RecordingRunner {
    pub fn script(mut self, program: &str, script: Script) -> Self {
        self.scripts.insert(program.to_string(), script);
        self
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().expect("runner lock").clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(|command| command.program().to_string())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        on_line: Option<&LineCallback<'_>>,
    ) -> ReplicateResult<CommandOutcome> {
        self.commands
            .lock()
            .expect("runner lock")
            .push(command.clone());
        match self.scripts.get(command.program()) {
            Some(Script::Missing) => Err(ReplicateError::Spawn {
                program: command.program().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            }),
            Some(Script::Unreadable) => Err(ReplicateError::Output {
                program: command.program().to_string(),
                source: io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
            }),
            Some(Script::Exit { code, output }) => {
                if let Some(callback) = on_line {
                    output.iter().for_each(|line| callback(line.as_str()));
                }
                Ok(CommandOutcome { code: Some(*code) })
            }
            None => Ok(CommandOutcome { code: Some(0) }),
        }
    }
}

pub struct Harness {
    pub sink: Arc<RecordingSink>,
    pub runner: Arc<RecordingRunner>,
    pub dispatcher: Dispatcher,
}

pub fn harness(settings: &Value) -> Harness {
    harness_with(settings, RecordingRunner::default())
}

pub fn harness_with(settings: &Value, runner: RecordingRunner) -> Harness {
    let store = MemorySettings::from_json_str(&settings.to_string()).expect("settings parse");
    let sink = Arc::new(RecordingSink::default());
    let runner = Arc::new(runner);
    let dispatcher = Dispatcher::new(Arc::new(store), sink.clone()).with_runner(runner.clone());
    Harness {
        sink,
        runner,
        dispatcher,
    }
}

pub fn args(command: &CommandSpec) -> Vec<String> {
    command.arguments().to_vec()
}
