//! Test utilities for setup-sdl-lib.
//!
//! Cross-platform shell snippets for tests that run commands through the
//! [`Executor`](crate::execute::Executor).

/// Returns a shell command that prints an environment variable.
#[cfg(unix)]
pub fn echo_env(var: &str) -> String {
  format!("echo \"${}\"", var)
}

#[cfg(windows)]
pub fn echo_env(var: &str) -> String {
  format!("echo %{}%", var)
}

/// Returns a shell command that exits with the given status.
pub fn exit_with(code: i32) -> String {
  format!("exit {}", code)
}

/// Returns a shell command that appends its argument line to a file.
#[cfg(unix)]
pub fn append_line(file: &std::path::Path, line: &str) -> String {
  format!("echo '{}' >> '{}'", line, file.display())
}

#[cfg(windows)]
pub fn append_line(file: &std::path::Path, line: &str) -> String {
  format!("echo {}>> \"{}\"", line, file.display())
}
