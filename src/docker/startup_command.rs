//! Startup command synthesis
//!
//! Docker resolves an image's `Entrypoint` and `Cmd` into one process
//! invocation by concatenating them. The embedded agent's wrapper takes over
//! the entrypoint, so the original pair is folded into a single list that the
//! wrapper execs into once the agent is running.

use serde_json::Value;

/// An `Entrypoint` or `Cmd` field as found in image metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommandField {
    #[default]
    Absent,
    Scalar(String),
    Sequence(Vec<String>),
}

impl CommandField {
    /// Parse a raw JSON field value.
    ///
    /// `null` and missing values are `Absent`. Arrays must contain only strings.
    pub fn from_value(value: Option<&Value>) -> Result<Self, String> {
        match value {
            None | Some(Value::Null) => Ok(CommandField::Absent),
            Some(Value::String(s)) => Ok(CommandField::Scalar(s.clone())),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(format!("expected a string element, found {other}")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(CommandField::Sequence),
            Some(other) => Err(format!("expected a string or a list of strings, found {other}")),
        }
    }

    fn append_to(&self, out: &mut Vec<String>) {
        match self {
            CommandField::Absent => {}
            CommandField::Scalar(s) => {
                if !s.is_empty() {
                    out.push(s.clone());
                }
            }
            CommandField::Sequence(items) => out.extend(items.iter().cloned()),
        }
    }
}

/// The effective process invocation of an image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupCommand(Vec<String>);

impl StartupCommand {
    /// Concatenate entrypoint then cmd. Absent or empty contributions are skipped.
    pub fn synthesize(entrypoint: &CommandField, cmd: &CommandField) -> Self {
        let mut args = Vec::new();
        entrypoint.append_to(&mut args);
        cmd.append_to(&mut args);
        Self(args)
    }

    pub fn args(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for StartupCommand {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

/// Entrypoint and cmd read from an image's `Config` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageStartup {
    pub entrypoint: CommandField,
    pub cmd: CommandField,
}

impl ImageStartup {
    /// Extract the startup fields from `docker image inspect` JSON
    pub fn from_inspect_json(json: &str) -> Result<Self, String> {
        let inspect: Value =
            serde_json::from_str(json).map_err(|e| format!("invalid inspect output: {e}"))?;
        let config = inspect.get("Config");

        let entrypoint = CommandField::from_value(config.and_then(|c| c.get("Entrypoint")))
            .map_err(|e| format!("Entrypoint: {e}"))?;
        let cmd = CommandField::from_value(config.and_then(|c| c.get("Cmd")))
            .map_err(|e| format!("Cmd: {e}"))?;

        Ok(Self { entrypoint, cmd })
    }

    pub fn startup_command(&self) -> StartupCommand {
        StartupCommand::synthesize(&self.entrypoint, &self.cmd)
    }
}
