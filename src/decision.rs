use crate::filter::PathJudge;

/// Aggregate outcome of a hook run
#[derive(Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { path: String, reason: String },
}

impl Decision {
    /// Process exit status the host interprets (2 blocks the tool call)
    pub fn exit_code(&self) -> u8 {
        match self {
            Decision::Allow => 0,
            Decision::Deny { .. } => 2,
        }
    }

    /// Message written to stderr when blocking
    pub fn block_message(&self) -> Option<String> {
        match self {
            Decision::Allow => None,
            Decision::Deny { path, reason } => Some(format!(
                "SECURITY BLOCK: Access to {} denied. {}",
                path, reason
            )),
        }
    }
}

/// Check paths in order and stop at the first denial.
pub fn evaluate(paths: &[String], judge: &impl PathJudge) -> Decision {
    for path in paths {
        let verdict = judge.judge(path);
        tracing::debug!(
            path = %path,
            allowed = verdict.allowed,
            reason = %verdict.reason,
            "checked path"
        );
        if !verdict.allowed {
            return Decision::Deny {
                path: path.clone(),
                reason: verdict.reason,
            };
        }
    }

    Decision::Allow
}
