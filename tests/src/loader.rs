//! Loader for serialized command lists.
//!
//! Replays the JSON produced by `Plan::to_json` (or written by hand) as a
//! list of raw command wishes.

use graft_mutation::{Command, Wish};

use crate::error::{ScenarioError, ScenarioResult};

/// Parse a JSON array of commands.
pub fn parse_commands(step: &str, source: &str) -> ScenarioResult<Vec<Command>> {
    serde_json::from_str(source).map_err(|e| ScenarioError::replay(step, e.to_string()))
}

/// Parse a JSON array of commands into wishes that pass them through.
pub fn replay_wishes(step: &str, source: &str) -> ScenarioResult<Vec<Wish>> {
    Ok(parse_commands(step, source)?
        .into_iter()
        .map(Wish::Command)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_mutation::{Atom, Ident, Instantiate};

    #[test]
    fn test_parse_instantiate() {
        let source = r#"[
            {"kind": "instantiate", "atom": {"entity": "Person"}, "ids": [{"user": "p"}]}
        ]"#;

        let commands = parse_commands("load", source).unwrap();

        assert_eq!(
            commands,
            vec![Command::Instantiate(Instantiate {
                atom: Atom::Entity("Person".into()),
                ids: vec![Ident::user("p")],
            })]
        );
    }

    #[test]
    fn test_reject_unknown_kind() {
        let result = parse_commands("load", r#"[{"kind": "explode"}]"#);

        assert!(matches!(result.unwrap_err(), ScenarioError::Replay { .. }));
    }
}
