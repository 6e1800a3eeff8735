//! Python code execution for calculations

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{strip_code_fence, ToolError, ToolTrait};

const MAX_OUTPUT: usize = 10000;

/// Runs model-written Python in a child interpreter
pub struct PythonReplTool {
    interpreter: String,
    timeout_secs: u64,
}

impl PythonReplTool {
    pub fn new(interpreter: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout_secs,
        }
    }
}

impl Default for PythonReplTool {
    fn default() -> Self {
        Self::new("python3", 60)
    }
}

/// Drop markdown fences and a `python` tag around model-written code
pub fn sanitize_input(input: &str) -> String {
    strip_code_fence(input, "python")
}

#[async_trait]
impl ToolTrait for PythonReplTool {
    fn name(&self) -> &str {
        "Python_REPL"
    }
    fn description(&self) -> &str {
        "A Python shell. Use this to execute python commands. \
         Input should be a valid python command. \
         If you want to see the output of a value, you should print it out with `print(...)`."
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let code = sanitize_input(input);
        debug!("Running python: {}", code);

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-c")
            .arg(&code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Failing to start the interpreter is a tool failure, not an observation
        let child = cmd.spawn()?;

        let output = match tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Ok(format!(
                    "TimeoutError: execution exceeded {} seconds",
                    self.timeout_secs
                ))
            }
        };

        let mut result = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.stderr.is_empty() {
            if !result.is_empty() && !result.ends_with('\n') {
                result.push('\n');
            }
            result.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        if !output.status.success() {
            if !result.is_empty() && !result.ends_with('\n') {
                result.push('\n');
            }
            result.push_str(&format!(
                "Exit code: {}",
                output.status.code().unwrap_or(-1)
            ));
        }

        Ok(truncate_output(result))
    }
}

fn truncate_output(result: String) -> String {
    if result.len() <= MAX_OUTPUT {
        return result;
    }
    let mut cut = MAX_OUTPUT;
    while !result.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n... output truncated ({} more bytes)",
        &result[..cut],
        result.len() - cut
    )
}
