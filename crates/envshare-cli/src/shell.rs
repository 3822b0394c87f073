//! POSIX shell statement rendering.

/// Quote `value` for a POSIX shell using single quotes.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            // Close, emit an escaped quote, reopen
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Whether `name` is a POSIX shell variable name: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A statement that binds `name` to `value`, or unsets it when absent.
///
/// Returns `None` when `name` is not a shell identifier; the name is emitted
/// unquoted, so anything else could inject commands into the `eval`.
pub fn statement(name: &str, value: Option<&str>) -> Option<String> {
    if !is_identifier(name) {
        return None;
    }
    Some(match value {
        Some(value) => format!("export {}={}", name, quote(value)),
        None => format!("unset {}", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote(""), "''");
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("$HOME `x` \"y\""), "'$HOME `x` \"y\"'");
        assert_eq!(quote("it's"), "'it'\\''s'");
        assert_eq!(quote("a\nb"), "'a\nb'");
    }

    #[test]
    fn test_statement() {
        assert_eq!(statement("EDITOR", Some("vi")).as_deref(), Some("export EDITOR='vi'"));
        assert_eq!(statement("EDITOR", Some("")).as_deref(), Some("export EDITOR=''"));
        assert_eq!(statement("EDITOR", None).as_deref(), Some("unset EDITOR"));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("AWS_PROFILE"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2FAST"));
        assert!(!is_identifier("A-B"));
        assert!(!is_identifier("NAME "));
        assert!(!is_identifier("X; touch /tmp/owned #"));
        assert!(!is_identifier("$(id)"));
        assert!(!is_identifier("ÄPFEL"));
    }

    #[test]
    fn test_statement_rejects_non_identifiers() {
        assert_eq!(statement("X; touch /tmp/owned #", Some("v")), None);
        assert_eq!(statement("`id`", None), None);
        assert_eq!(statement("A B", Some("v")), None);
    }
}
