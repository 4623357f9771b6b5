//! Multi-stage Dockerfile composition
//!
//! This module renders the Dockerfile that lifts the Falcon sidecar's files
//! out of its image, stages them under a fixed prefix and layers them onto the
//! source image behind the agent's wrapper entrypoint.

use crate::docker::layout::{
    BUILD_STAGE, CID_ENV_VAR, DIRECTORY_MAPPINGS, FALCON_STAGE, FINAL_ROOT, STAGING_ROOT,
    WRAPPER_ENTRYPOINT, staging_setup_command,
};
use crate::docker::startup_command::StartupCommand;
use crate::error::EmbedError;

/// Inputs of a composition, all taken verbatim from the command line except
/// the startup command, which comes from the source image
#[derive(Debug, Clone)]
pub struct EmbedRequest<'a> {
    pub falcon_image: &'a str,
    pub source_image: &'a str,
    pub target_image: &'a str,
    pub startup_command: &'a StartupCommand,
    pub cid: &'a str,
}

/// Result of composing the embed Dockerfile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDockerfile {
    /// The complete Dockerfile content
    pub dockerfile_content: String,
    /// The tag the built image receives
    pub image_tag: String,
}

/// Appends Dockerfile instructions line by line
#[derive(Debug, Default)]
struct DockerfileBuilder {
    content: String,
}

impl DockerfileBuilder {
    fn comment(&mut self, text: &str) -> &mut Self {
        self.line(&format!("# {text}"))
    }

    fn instruction(&mut self, keyword: &str, arguments: &str) -> &mut Self {
        self.line(&format!("{keyword} {arguments}"))
    }

    fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    fn line(&mut self, line: &str) -> &mut Self {
        self.content.push_str(line);
        self.content.push('\n');
        self
    }

    fn finish(self) -> String {
        self.content
    }
}

/// Composes the embed Dockerfile
pub struct DockerComposer {
    staging_image: String,
}

impl DockerComposer {
    /// Creates a composer whose intermediate stage is based on `staging_image`
    pub fn new(staging_image: impl Into<String>) -> Self {
        Self {
            staging_image: staging_image.into(),
        }
    }

    /// Render the three-stage Dockerfile for `request`.
    ///
    /// Image references and the CID are checked first so that no input can
    /// add or split instructions.
    pub fn compose(&self, request: &EmbedRequest<'_>) -> Result<ComposedDockerfile, EmbedError> {
        check_reference("falcon", request.falcon_image)?;
        check_reference("source", request.source_image)?;
        check_reference("target", request.target_image)?;
        check_reference("staging", &self.staging_image)?;
        let cid = render_env_value(request.cid)?;

        let mut dockerfile = DockerfileBuilder::default();

        dockerfile
            .comment("Stage 1: Falcon container image as the copy source")
            .instruction(
                "FROM",
                &format!("{} AS {FALCON_STAGE}", request.falcon_image),
            )
            .blank();

        dockerfile
            .comment("Stage 2: Stage the Falcon files in an image that can RUN setup commands")
            .instruction(
                "FROM",
                &format!("{} AS {BUILD_STAGE}", self.staging_image),
            )
            .instruction("RUN", &staging_setup_command());
        for mapping in DIRECTORY_MAPPINGS {
            dockerfile.instruction(
                "COPY",
                &format!(
                    "--from={FALCON_STAGE} {} {}",
                    mapping.source, mapping.destination
                ),
            );
        }
        dockerfile.blank();

        dockerfile
            .comment("Stage 3: Load Falcon before the source image's own entrypoint and cmd")
            .instruction("FROM", request.source_image)
            .instruction(
                "COPY",
                &format!("--from={BUILD_STAGE} {STAGING_ROOT} {FINAL_ROOT}"),
            )
            .instruction("ENTRYPOINT", &json_array(&WRAPPER_ENTRYPOINT))
            .instruction("CMD", &json_array(request.startup_command.args()))
            .instruction("ENV", &format!("{CID_ENV_VAR}={cid}"))
            .instruction("USER", "0:0");

        Ok(ComposedDockerfile {
            dockerfile_content: dockerfile.finish(),
            image_tag: request.target_image.to_string(),
        })
    }

    /// Validate the structure of a composed Dockerfile
    pub fn validate_dockerfile(&self, content: &str) -> Result<(), EmbedError> {
        let count = |keyword: &str| {
            content
                .lines()
                .filter(|line| {
                    line.split_once(' ')
                        .is_some_and(|(first, _)| first == keyword)
                })
                .count()
        };

        let from_count = count("FROM");
        if from_count != 3 {
            return Err(EmbedError::MalformedDockerfile(format!(
                "expected 3 FROM instructions, found {from_count}"
            )));
        }

        for keyword in ["ENTRYPOINT", "CMD", "ENV", "USER"] {
            let found = count(keyword);
            if found != 1 {
                return Err(EmbedError::MalformedDockerfile(format!(
                    "expected exactly one {keyword} instruction, found {found}"
                )));
            }
        }

        let copy_count = count("COPY");
        if copy_count != DIRECTORY_MAPPINGS.len() + 1 {
            return Err(EmbedError::MalformedDockerfile(format!(
                "expected {} COPY instructions, found {copy_count}",
                DIRECTORY_MAPPINGS.len() + 1
            )));
        }

        Ok(())
    }
}

/// Render a list as a Dockerfile exec-form JSON array, `["a", "b"]`
fn json_array<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| serde_json::Value::from(item.as_ref()).to_string())
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Image references never contain whitespace or control characters and never
/// end in `\`; one that does would split or continue the instruction it is
/// interpolated into
fn check_reference(role: &'static str, reference: &str) -> Result<(), EmbedError> {
    let reason = if reference.chars().any(char::is_control) {
        Some("contains control characters")
    } else if reference.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else if reference.ends_with('\\') {
        Some("ends with a line continuation")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(EmbedError::InvalidReference {
            role,
            reference: reference.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Render an ENV value that Docker reads back as exactly `value`.
///
/// Plain words are emitted as-is. Anything with whitespace, quotes, `\` or
/// `$` is double-quoted with `\`, `"` and `$` escaped.
fn render_env_value(value: &str) -> Result<String, EmbedError> {
    if value.chars().any(char::is_control) {
        return Err(EmbedError::InvalidToken(
            "contains control characters such as line breaks",
        ));
    }

    let needs_quoting = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '$'));
    if !needs_quoting {
        return Ok(value.to_string());
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Ok(quoted)
}
