//! Command-line argument helpers.
//!
//! Extra CMake arguments arrive as a single string (e.g. `-DSDL_STATIC=ON -DSDL_X11=OFF`)
//! and are split with POSIX shell rules. Commands handed to the shell are joined
//! back with every argument double-quoted.

use thiserror::Error;

/// Error returned for argument strings that cannot be split.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot split arguments (unbalanced quotes or trailing escape): {0}")]
pub struct SplitArgsError(pub String);

/// Split a string into arguments using shell quoting rules.
///
/// `None`, empty and whitespace-only input yield no arguments.
pub fn split_args(text: Option<&str>) -> Result<Vec<String>, SplitArgsError> {
  let Some(text) = text else {
    return Ok(Vec::new());
  };
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Ok(Vec::new());
  }
  shlex::split(trimmed).ok_or_else(|| SplitArgsError(text.to_string()))
}

/// Join arguments into one command string, double-quoting each argument.
pub fn command_arglist_to_string<S: AsRef<str>>(args: &[S]) -> String {
  args
    .iter()
    .map(|s| format!("\"{}\"", s.as_ref()))
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn split(text: &str) -> Vec<String> {
    split_args(Some(text)).unwrap()
  }

  #[test]
  fn none_yields_nothing() {
    assert!(split_args(None).unwrap().is_empty());
  }

  #[test]
  fn empty_and_whitespace_yield_nothing() {
    for text in ["", " ", "   ", "\t", " \t", "\t\t    \t"] {
      assert!(split(text).is_empty(), "{:?}", text);
    }
  }

  #[test]
  fn simple_words() {
    assert_eq!(split("a"), vec!["a"]);
    assert_eq!(split("a b"), vec!["a", "b"]);
    assert_eq!(split("  a \t  \t b  "), vec!["a", "b"]);
  }

  #[test]
  fn quoted_words() {
    assert_eq!(split("\"a\""), vec!["a"]);
    assert_eq!(split("\"a\" \"b\""), vec!["a", "b"]);
    assert_eq!(split("\"a b\"  "), vec!["a b"]);
  }

  #[test]
  fn cmake_arguments() {
    assert_eq!(split("-A win32"), vec!["-A", "win32"]);
    assert_eq!(
      split("-DSDL_STATIC=ON -DSDL_X11=OFF"),
      vec!["-DSDL_STATIC=ON", "-DSDL_X11=OFF"]
    );
  }

  #[test]
  fn unbalanced_quote_is_an_error() {
    assert!(split_args(Some("\"abc")).is_err());
  }

  #[test]
  fn arglist_is_quoted() {
    assert_eq!(
      command_arglist_to_string(&["cmake", "-S", "/tmp/source dir"]),
      "\"cmake\" \"-S\" \"/tmp/source dir\""
    );
    assert_eq!(command_arglist_to_string::<&str>(&[]), "");
  }
}
