use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("non-zero exit code: {code}{}", stderr_suffix(.stderr))]
    NonZeroExit { code: i32, stderr: Option<String> },
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("killed by signal")]
    KilledBySignal,
    #[error("missing program")]
    MissingProgram,
}

fn stderr_suffix(stderr: &Option<String>) -> String {
    match stderr {
        Some(line) => format!(" ({line})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_message_includes_stderr_tail() {
        let e = ExecError::NonZeroExit {
            code: 2,
            stderr: Some("no such file".into()),
        };
        assert_eq!(e.to_string(), "non-zero exit code: 2 (no such file)");

        let e = ExecError::NonZeroExit { code: 1, stderr: None };
        assert_eq!(e.to_string(), "non-zero exit code: 1");
    }
}
