// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shape validation and normalization of catalog rows.

use std::sync::LazyLock;

use atende_core::AtendeError;
use atende_core::types::{
    CatalogEntry, CatalogSnapshot, CommandDefinition, CustomFlowDefinition, QuickReplyDefinition,
    VariableDefinition,
};
use regex::Regex;

/// Prefix of every command token.
pub const COMMAND_PREFIX: char = '#';

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#[a-z0-9_]+$").unwrap());

static VARIABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Normalizes a command token to its canonical `#word` form.
///
/// Case is folded and a missing prefix is added, so `IBO`, `#Ibo` and
/// ` #ibo ` all become `#ibo`.
pub fn normalize_token(raw: &str) -> Result<String, AtendeError> {
    let lowered = raw.trim().to_lowercase();
    let token = if lowered.starts_with(COMMAND_PREFIX) {
        lowered
    } else {
        format!("{COMMAND_PREFIX}{lowered}")
    };
    if TOKEN.is_match(&token) {
        Ok(token)
    } else {
        Err(AtendeError::validation(
            "token",
            format!("`{}` must be `#` followed by letters, digits or `_`", raw.trim()),
        ))
    }
}

/// Validates a row and returns its normalized form.
pub fn normalize_entry(entry: CatalogEntry) -> Result<CatalogEntry, AtendeError> {
    Ok(match entry {
        CatalogEntry::Command(c) => CatalogEntry::Command(CommandDefinition {
            token: normalize_token(&c.token)?,
            flow_name: non_empty("flow_name", &c.flow_name)?.to_lowercase(),
            device_id: scope(c.device_id),
            ..c
        }),
        CatalogEntry::QuickReply(q) => CatalogEntry::QuickReply(QuickReplyDefinition {
            trigger: non_empty("trigger", &q.trigger)?,
            response_template: non_empty("response_template", &q.response_template)?,
            device_id: scope(q.device_id),
            ..q
        }),
        CatalogEntry::Flow(f) => {
            let triggers = f
                .triggers
                .iter()
                .map(|t| non_empty("triggers", t))
                .collect::<Result<Vec<_>, _>>()?;
            if triggers.is_empty() {
                return Err(AtendeError::validation("triggers", "at least one trigger is required"));
            }
            if f.stages.is_empty() {
                return Err(AtendeError::validation("stages", "at least one stage is required"));
            }
            let stages = f
                .stages
                .iter()
                .map(|s| non_empty("stages", s))
                .collect::<Result<Vec<_>, _>>()?;
            CatalogEntry::Flow(CustomFlowDefinition {
                name: non_empty("name", &f.name)?,
                triggers,
                stages,
                device_id: scope(f.device_id),
                ..f
            })
        }
        CatalogEntry::Variable(v) => {
            let name = v.name.trim().to_string();
            if !VARIABLE_NAME.is_match(&name) {
                return Err(AtendeError::validation(
                    "name",
                    format!("`{name}` must match [A-Za-z_][A-Za-z0-9_]*"),
                ));
            }
            CatalogEntry::Variable(VariableDefinition {
                name,
                device_id: scope(v.device_id),
                ..v
            })
        }
    })
}

/// Fails with a conflict when another row of the same kind and scope
/// already uses the normalized key of `entry`.
pub fn check_conflict(snapshot: &CatalogSnapshot, entry: &CatalogEntry) -> Result<(), AtendeError> {
    let id = entry.id();
    let device = entry.device_id();
    let clash = match entry {
        CatalogEntry::Command(c) => snapshot
            .commands
            .iter()
            .any(|o| o.id != id && o.device_id.as_deref() == device && o.token == c.token),
        CatalogEntry::QuickReply(q) => snapshot.quick_replies.iter().any(|o| {
            o.id != id
                && o.device_id.as_deref() == device
                && o.trigger.to_lowercase() == q.trigger.to_lowercase()
        }),
        CatalogEntry::Flow(f) => snapshot.flows.iter().any(|o| {
            o.id != id
                && o.device_id.as_deref() == device
                && o.name.to_lowercase() == f.name.to_lowercase()
        }),
        CatalogEntry::Variable(v) => snapshot
            .variables
            .iter()
            .any(|o| o.id != id && o.device_id.as_deref() == device && o.name == v.name),
    };
    if clash {
        Err(AtendeError::Conflict {
            kind: entry.kind().to_string(),
            key: key_of(entry),
        })
    } else {
        Ok(())
    }
}

fn key_of(entry: &CatalogEntry) -> String {
    match entry {
        CatalogEntry::Command(c) => c.token.clone(),
        CatalogEntry::QuickReply(q) => q.trigger.clone(),
        CatalogEntry::Flow(f) => f.name.clone(),
        CatalogEntry::Variable(v) => v.name.clone(),
    }
}

fn non_empty(field: &str, value: &str) -> Result<String, AtendeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AtendeError::validation(field, "must not be empty"))
    } else {
        Ok(trimmed.to_string())
    }
}

fn scope(device_id: Option<String>) -> Option<String> {
    device_id
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atende_core::types::MatchType;

    fn command(token: &str, device: Option<&str>) -> CatalogEntry {
        CatalogEntry::Command(CommandDefinition {
            id: 0,
            token: token.into(),
            flow_name: "ibo".into(),
            enabled: true,
            device_id: device.map(Into::into),
        })
    }

    #[test]
    fn tokens_are_normalized() {
        assert_eq!(normalize_token("#IBO").unwrap(), "#ibo");
        assert_eq!(normalize_token(" ibo ").unwrap(), "#ibo");
        assert_eq!(normalize_token("#play_2").unwrap(), "#play_2");
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for bad in ["#", "", "# ibo", "#ib-o", "##ibo"] {
            let err = normalize_token(bad).unwrap_err();
            assert!(
                matches!(&err, AtendeError::Validation { field, .. } if field == "token"),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn empty_quick_reply_fields_are_rejected() {
        let entry = CatalogEntry::QuickReply(QuickReplyDefinition {
            id: 0,
            trigger: "  ".into(),
            response_template: "x".into(),
            match_type: MatchType::Exact,
            enabled: true,
            device_id: None,
        });
        assert!(matches!(
            normalize_entry(entry),
            Err(AtendeError::Validation { field, .. }) if field == "trigger"
        ));
    }

    #[test]
    fn flows_need_triggers_and_stages() {
        let flow = |triggers: Vec<&str>, stages: Vec<&str>| {
            CatalogEntry::Flow(CustomFlowDefinition {
                id: 0,
                name: "boas vindas".into(),
                triggers: triggers.into_iter().map(Into::into).collect(),
                stages: stages.into_iter().map(Into::into).collect(),
                enabled: true,
                device_id: None,
            })
        };
        assert!(matches!(
            normalize_entry(flow(vec!["oi"], vec![])),
            Err(AtendeError::Validation { field, .. }) if field == "stages"
        ));
        assert!(matches!(
            normalize_entry(flow(vec![], vec!["a"])),
            Err(AtendeError::Validation { field, .. }) if field == "triggers"
        ));
        assert!(normalize_entry(flow(vec![" oi "], vec!["olá"])).is_ok());
    }

    #[test]
    fn variable_names_are_identifiers() {
        let var = |name: &str| {
            CatalogEntry::Variable(VariableDefinition {
                id: 0,
                name: name.into(),
                value: "v".into(),
                device_id: None,
            })
        };
        assert!(normalize_entry(var("pix_key")).is_ok());
        assert!(normalize_entry(var("_x1")).is_ok());
        assert!(normalize_entry(var("1x")).is_err());
        assert!(normalize_entry(var("chave pix")).is_err());
    }

    #[test]
    fn blank_device_means_global() {
        let CatalogEntry::Command(c) = normalize_entry(command("#ibo", Some("  "))).unwrap() else {
            panic!("kind changed");
        };
        assert_eq!(c.device_id, None);
    }

    #[test]
    fn conflicts_are_scoped_per_device() {
        let mut snapshot = CatalogSnapshot::default();
        if let CatalogEntry::Command(c) = normalize_entry(command("#ibo", None)).unwrap() {
            snapshot.commands.push(CommandDefinition { id: 1, ..c });
        }
        let global = normalize_entry(command("IBO", None)).unwrap();
        assert!(matches!(
            check_conflict(&snapshot, &global),
            Err(AtendeError::Conflict { key, .. }) if key == "#ibo"
        ));
        let device = normalize_entry(command("#ibo", Some("loja"))).unwrap();
        assert!(check_conflict(&snapshot, &device).is_ok());

        let mut same_row = global;
        same_row.set_id(1);
        assert!(check_conflict(&snapshot, &same_row).is_ok());
    }
}
