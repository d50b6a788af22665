use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::config::EngineConfig;
use crate::pipeline::Stage;

use super::executor::Backend;
use super::invocation::Invocation;

/// Runs engine commands through a headless Fiji process and converter calls
/// as plain child processes.
///
/// Each engine command gets its own JVM, so memory is returned to the system
/// when the command exits.
pub struct FijiBackend {
    executable: PathBuf,
    args: Vec<String>,
}

impl FijiBackend {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            args: config.args.clone(),
        }
    }
}

/// Macro source running one named command.
pub fn macro_source(command: &str, options: &str) -> String {
    format!("run(\"{}\", \"{}\");", escape(command), escape(options))
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

fn check_status(stage: Stage, program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(PipelineError::Backend(format!(
            "{program} exited with {status} during {stage}"
        )))
    }
}

impl Backend for FijiBackend {
    fn invoke(&self, stage: Stage, invocation: &Invocation) -> Result<()> {
        match invocation {
            Invocation::Command { command, options } => {
                let source = macro_source(command, options);
                debug!(executable = %self.executable.display(), %source, "Starting engine");
                let status = Command::new(&self.executable)
                    .args(&self.args)
                    .arg("-eval")
                    .arg(&source)
                    .status()
                    .map_err(|e| {
                        PipelineError::Backend(format!(
                            "failed to start {}: {e}",
                            self.executable.display()
                        ))
                    })?;
                check_status(stage, &self.executable.display().to_string(), status)
            }
            Invocation::Process {
                program,
                args,
                working_dir,
            } => {
                debug!(program = %program.display(), ?args, "Starting process");
                let status = Command::new(program)
                    .args(args)
                    .current_dir(working_dir)
                    .status()
                    .map_err(|e| {
                        PipelineError::Backend(format!(
                            "failed to start {}: {e}",
                            program.display()
                        ))
                    })?;
                check_status(stage, &program.display().to_string(), status)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_source_escapes_quotes() {
        let src = macro_source("Select Illuminations", r#"select=[/a "b"/p.xml]"#);
        assert_eq!(
            src,
            r#"run("Select Illuminations", "select=[/a \"b\"/p.xml]");"#
        );
    }

    #[test]
    fn test_process_backend_has_nothing_to_reclaim() {
        let backend = FijiBackend::new(&EngineConfig::default());
        assert!(!backend.can_reclaim_memory());
    }
}
