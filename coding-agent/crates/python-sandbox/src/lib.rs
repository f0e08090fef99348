//! Python Sandbox - gate and run untrusted, model-generated Python
//!
//! This crate is the trust boundary between generated code and the host:
//! - [`validator`] parses the source and rejects denied imports or unparseable text
//! - [`executor`] runs validated code in a separate, time-boxed interpreter process
//! - [`check_and_execute`] joins the two, so callers cannot skip validation
//!
//! It is a best-effort static gate plus a killed-on-timeout subprocess. It does
//! not filter syscalls, isolate the filesystem or deny network access.

pub mod error;
pub mod executor;
pub mod policy;
pub mod process;
pub mod protocol;
pub mod validator;

pub use error::SandboxError;
pub use executor::{ExecutorConfig, SandboxExecutor, TemporaryArtifact};
pub use policy::Policy;
pub use protocol::{ExecutionClassification, ExecutionResult};
pub use validator::{validate, UnsafeReason, ValidatedCode, ValidationOutcome};

/// Validate `code` and, only if it is safe, execute that exact text.
///
/// A rejected unit is reported as `Blocked` without touching the filesystem
/// or spawning anything.
pub async fn check_and_execute(
    code: &str,
    policy: &Policy,
    executor: &SandboxExecutor,
) -> ExecutionResult {
    match validate(code, policy) {
        ValidationOutcome::Safe(validated) => executor.execute(&validated, policy).await,
        ValidationOutcome::Unsafe { reason } => {
            tracing::info!(reason = %reason, "[Sandbox] Execution skipped");
            ExecutionResult::blocked(reason.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsafe_code_is_blocked_without_running() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let executor = SandboxExecutor::new(ExecutorConfig {
            scratch_dir: Some(dir.path().to_path_buf()),
            ..ExecutorConfig::default()
        });

        let code = format!(
            "import os\nopen(r'{}', 'w').write('x')\n",
            marker.display()
        );
        let result = check_and_execute(&code, &Policy::default(), &executor).await;

        assert_eq!(
            result.classification,
            ExecutionClassification::Blocked {
                reason: "import of denied module 'os'".to_string()
            }
        );
        assert!(!marker.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unparseable_code_is_blocked() {
        let executor = SandboxExecutor::default();
        let result = check_and_execute("def (:", &Policy::default(), &executor).await;
        assert_eq!(
            result.classification,
            ExecutionClassification::Blocked {
                reason: "unparseable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn safe_code_runs() {
        let executor = SandboxExecutor::default();
        let result = check_and_execute("print(6 * 7)", &Policy::default(), &executor).await;
        assert!(result.is_success());
        assert_eq!(result.stdout.trim(), "42");
    }
}
