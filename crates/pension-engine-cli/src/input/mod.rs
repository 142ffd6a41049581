pub mod file;

use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialise command input from `--input <file.json>`, falling back to
/// piped stdin. `what` names the command in the error when neither is given.
pub fn resolve<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_json(path);
    }
    if atty::is(atty::Stream::Stdin) {
        return Err(missing_input(what));
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer, what)
}

fn missing_input(what: &str) -> Box<dyn std::error::Error> {
    format!("--input <file.json> or stdin required for {}", what).into()
}

/// Blank piped input counts as no input at all.
fn parse_piped<T: DeserializeOwned>(
    buffer: &str,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Err(missing_input(what));
    }
    log::debug!("read {} bytes of {} input from stdin", trimmed.len(), what);
    serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse stdin for {}: {}", what, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pension_engine_core::MemberFinancialProfile;

    #[test]
    fn test_blank_stdin_names_the_command() {
        let err = parse_piped::<MemberFinancialProfile>("  \n", "readiness").unwrap_err();
        assert_eq!(
            err.to_string(),
            "--input <file.json> or stdin required for readiness"
        );
    }

    #[test]
    fn test_piped_profile_parses() {
        let json = r#"{"member_id":"M-1","age":40,"retirement_age_goal":65}"#;
        let profile: MemberFinancialProfile = parse_piped(json, "project").unwrap();
        assert_eq!(profile.member_id, "M-1");
        assert_eq!(profile.retirement_age_goal, 65);
    }

    #[test]
    fn test_malformed_stdin_reports_command() {
        let err = parse_piped::<MemberFinancialProfile>("{not json", "stress-test").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse stdin for stress-test"));
    }
}
