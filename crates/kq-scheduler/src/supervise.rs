use std::time::Duration;

use taskvisor::{BackoffPolicy, RestartPolicy, TaskRef, TaskSpec};

/// Re-run `task` `every` after each completion; failed runs back off first.
pub fn periodic(task: TaskRef, every: Duration, timeout: Option<Duration>) -> TaskSpec {
    TaskSpec::new(
        task,
        RestartPolicy::Always {
            interval: Some(every),
        },
        BackoffPolicy::default(),
        timeout,
    )
}

/// Long-running task restarted only when it fails.
pub fn resident(task: TaskRef) -> TaskSpec {
    TaskSpec::new(task, RestartPolicy::OnFailure, BackoffPolicy::default(), None)
}
