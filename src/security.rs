//! Approval policy for tool execution.
//!
//! Tools call [`SecurityPolicy::require_approval`] before doing anything
//! irreversible. Rules apply in strict order: blocked substrings deny
//! outright, always-allow entries skip the prompt, action types listed as
//! approval-required prompt the user, and everything else passes.

use anyhow::{Result, bail};

use crate::config::SecurityConfig;
use crate::io::IoContext;

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    config: SecurityConfig,
}

impl SecurityPolicy {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    /// Decides whether `payload` may run as `action_type`.
    ///
    /// Returns `Ok(false)` for a blocked or user-denied action; errors only
    /// on an empty payload. Concurrent prompts against the same context
    /// queue behind its approval gate so they never interleave.
    pub async fn require_approval(
        &self,
        action_type: &str,
        payload: &str,
        io: &IoContext,
    ) -> Result<bool> {
        if payload.trim().is_empty() {
            bail!("empty payload for action '{action_type}'");
        }

        // Blocked rules win over everything, including always-allow.
        for rule in &self.config.blocked {
            if payload.contains(rule.as_str()) {
                tracing::warn!(action_type, payload, rule, "blocked by security rule");
                io.security_alert(&format!(
                    "[SECURITY] AUTOMATICALLY BLOCKED: {payload} (Matches rule: {rule})"
                ));
                return Ok(false);
            }
        }

        for allowed in &self.config.always_allow {
            // Exact match or prefix followed by a separator, so "ls" does
            // not whitelist "lsof".
            if payload == allowed || payload.starts_with(&format!("{allowed} ")) {
                return Ok(true);
            }
        }

        if self
            .config
            .approval_required_for
            .iter()
            .any(|t| t == action_type)
        {
            return Ok(self.prompt_for_approval(action_type, payload, io).await);
        }

        Ok(true)
    }

    async fn prompt_for_approval(&self, action_type: &str, payload: &str, io: &IoContext) -> bool {
        let _gate = io.approval_gate().lock().await;

        io.security_alert("[SECURITY ALERT] Agent wants to execute:");
        io.println(&format!("Tool:    {action_type}"));
        io.println(&format!("Command: {payload}"));

        let allowed = match io.read(Some("Allow? [y/N]: ")) {
            Some(response) => {
                let response = response.trim();
                response.eq_ignore_ascii_case("y") || response.eq_ignore_ascii_case("yes")
            }
            // EOF or empty queue counts as denial.
            None => false,
        };
        tracing::debug!(action_type, payload, allowed, "approval prompt resolved");
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(blocked: &[&str], always_allow: &[&str], approval_required: &[&str]) -> SecurityPolicy {
        SecurityPolicy::new(SecurityConfig {
            approval_required_for: approval_required.iter().map(ToString::to_string).collect(),
            always_allow: always_allow.iter().map(ToString::to_string).collect(),
            blocked: blocked.iter().map(ToString::to_string).collect(),
        })
    }

    #[tokio::test]
    async fn test_blocked_substring_denies_with_alert() {
        let io = IoContext::queued();
        let policy = policy(&["rm -rf"], &[], &[]);

        let allowed = policy
            .require_approval("shell", "rm -rf /tmp/x", &io)
            .await
            .unwrap();

        assert!(!allowed);
        let output = io.drain_output();
        assert!(output.contains("[SECURITY] AUTOMATICALLY BLOCKED: rm -rf /tmp/x"));
        assert!(output.contains("(Matches rule: rm -rf)"));
    }

    #[tokio::test]
    async fn test_blocked_wins_over_always_allow() {
        let io = IoContext::queued();
        let policy = policy(&["sudo"], &["sudo ls"], &[]);

        let allowed = policy
            .require_approval("shell", "sudo ls", &io)
            .await
            .unwrap();
        assert!(!allowed);
    }

    #[tokio::test]
    async fn test_always_allow_exact_and_prefix() {
        let io = IoContext::queued();
        let policy = policy(&[], &["git status", "ls"], &["shell"]);

        assert!(policy.require_approval("shell", "git status", &io).await.unwrap());
        assert!(policy.require_approval("shell", "ls -la", &io).await.unwrap());
        assert!(io.drain_output().is_empty());
    }

    #[tokio::test]
    async fn test_always_allow_requires_separator() {
        let io = IoContext::queued();
        let policy = policy(&[], &["ls"], &["shell"]);

        // "lsof" must fall through to the prompt; with an empty inbound
        // queue the prompt reads nothing and denies.
        let allowed = policy.require_approval("shell", "lsof", &io).await.unwrap();
        assert!(!allowed);
        assert!(io.drain_output().contains("[SECURITY ALERT]"));
    }

    #[tokio::test]
    async fn test_prompt_accepts_y_and_yes_case_insensitive() {
        for answer in ["y", "Y", "yes", "YES", "Yes"] {
            let io = IoContext::queued();
            io.push_input(answer);
            let policy = policy(&[], &[], &["shell"]);

            let allowed = policy
                .require_approval("shell", "cargo build", &io)
                .await
                .unwrap();
            assert!(allowed, "answer {answer:?} should allow");

            let output = io.drain_output();
            assert!(output.contains("[SECURITY ALERT] Agent wants to execute:"));
            assert!(output.contains("Tool:    shell"));
            assert!(output.contains("Command: cargo build"));
        }
    }

    #[tokio::test]
    async fn test_prompt_denies_anything_else() {
        for answer in ["n", "no", "yep", ""] {
            let io = IoContext::queued();
            io.push_input(answer);
            let policy = policy(&[], &[], &["shell"]);

            let allowed = policy
                .require_approval("shell", "cargo build", &io)
                .await
                .unwrap();
            assert!(!allowed, "answer {answer:?} should deny");
        }
    }

    #[tokio::test]
    async fn test_second_prompt_waits_for_the_open_one() {
        let io = IoContext::queued();
        io.push_input("y");
        let policy = policy(&[], &[], &["shell"]);

        // Model an unresolved prompt by holding the context's gate.
        let gate = io.approval_gate().lock().await;

        let task_io = io.clone();
        let task_policy = policy.clone();
        let pending = tokio::spawn(async move {
            task_policy
                .require_approval("shell", "cargo build", &task_io)
                .await
                .unwrap()
        });

        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(io.peek_output(), None, "prompt must wait for the gate");

        drop(gate);
        assert!(pending.await.unwrap());
        assert!(io.drain_output().contains("[SECURITY ALERT]"));
    }

    #[tokio::test]
    async fn test_concurrent_prompts_stay_contiguous() {
        let io = IoContext::queued();
        io.push_input("y");
        io.push_input("n");
        let policy = policy(&[], &[], &["shell"]);

        let (io_a, policy_a) = (io.clone(), policy.clone());
        let first = tokio::spawn(async move {
            policy_a.require_approval("shell", "first", &io_a).await.unwrap()
        });
        let (io_b, policy_b) = (io.clone(), policy.clone());
        let second = tokio::spawn(async move {
            policy_b.require_approval("shell", "second", &io_b).await.unwrap()
        });

        assert!(first.await.unwrap());
        assert!(!second.await.unwrap());

        // Each prompt's alert/Tool/Command block is contiguous in the sink.
        let output = io.drain_output();
        let groups: Vec<&str> = output
            .split("[SECURITY ALERT] Agent wants to execute:")
            .skip(1)
            .collect();
        assert_eq!(groups.len(), 2);
        assert!(groups[0].contains("Tool:    shell"));
        assert!(groups[0].contains("Command: first"));
        assert!(!groups[0].contains("Command: second"));
        assert!(groups[1].contains("Command: second"));
    }

    #[tokio::test]
    async fn test_unlisted_action_type_defaults_to_allow() {
        let io = IoContext::queued();
        let policy = policy(&[], &[], &["shell"]);

        assert!(policy
            .require_approval("web_fetch", "https://example.com", &io)
            .await
            .unwrap());
        assert!(io.drain_output().is_empty());
    }

    #[tokio::test]
    async fn test_empty_payload_is_an_error() {
        let io = IoContext::queued();
        let policy = policy(&[], &[], &[]);

        assert!(policy.require_approval("shell", "  ", &io).await.is_err());
    }
}
