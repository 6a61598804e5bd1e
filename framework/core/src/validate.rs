use crate::error::ConfigurationError;

/// Characters that would let a substituted field escape the harness command.
const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '$', '`', '(', ')', '<', '>', '{', '}', '"', '\'', '\\', '*', '?', '~', '!',
    '\n', '\r', ' ', '\t',
];

/// Reject values that cannot be safely substituted into a shell command.
///
/// User-controlled fields such as workload ids and cluster endpoints are
/// interpolated into the remote harness invocation. Anything that could break
/// out of that command is refused up front.
pub fn ensure_shell_safe(field: &'static str, value: &str) -> Result<(), ConfigurationError> {
    if value.is_empty() || value.contains(SHELL_METACHARACTERS) {
        return Err(ConfigurationError::UnsafeField {
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        ensure_shell_safe("workload", "workloada").unwrap();
        ensure_shell_safe("cluster endpoint", "db-node1.internal:9000").unwrap();
        ensure_shell_safe("path", "/tmp/run_1/harness.tar.gz").unwrap();
    }

    #[test]
    fn rejects_shell_metacharacters() {
        for value in ["workloada; rm -rf /", "a$(whoami)", "a|b", "a b", "`id`"] {
            let err = ensure_shell_safe("workload", value).unwrap_err();
            assert!(matches!(
                err,
                ConfigurationError::UnsafeField { field: "workload", .. }
            ));
        }
    }

    #[test]
    fn rejects_empty_values() {
        assert!(ensure_shell_safe("workload", "").is_err());
    }
}
