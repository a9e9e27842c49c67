//! State upgrades between schema versions of a resource kind.
//!
//! Upgraders are chained: a state persisted at version 0 of a kind at version 2 goes through the
//! 0 → 1 then the 1 → 2 upgrader. A missing step is an error, nothing is guessed.

use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{new_child_id, parse_child_id};
use crate::marshalling::ResourceData;

pub type UpgradeFn = fn(&mut ResourceData) -> ProviderResult<()>;

/// Upgrades the state of `kind` from `from_version` to `from_version + 1`.
#[derive(Clone, Copy)]
pub struct StateUpgrader {
    pub kind: &'static str,
    pub from_version: u32,
    pub upgrade: UpgradeFn,
}

pub fn state_upgraders() -> Vec<StateUpgrader> {
    vec![StateUpgrader {
        kind: "scaleway_documentdb_privilege",
        from_version: 0,
        upgrade: upgrade_privilege_id_v0,
    }]
}

/// Privileges used to be identified by their instance only, `REGION/INSTANCE` becomes
/// `REGION/INSTANCE/DB/USER`.
fn upgrade_privilege_id_v0(data: &mut ResourceData) -> ProviderResult<()> {
    let raw_id = match data.id() {
        Some(id) => id.to_string(),
        None => return Ok(()),
    };
    if parse_child_id(&raw_id, 2).is_ok() {
        return Ok(());
    }

    let id = parse_child_id(&raw_id, 0)?;
    let database_name = data
        .get_str("database_name")
        .ok_or_else(|| ProviderError::new_invalid_id(&raw_id, "database_name is missing from the state"))?;
    let user_name = data
        .get_str("user_name")
        .ok_or_else(|| ProviderError::new_invalid_id(&raw_id, "user_name is missing from the state"))?;

    let upgraded = new_child_id(id.scope.as_str(), &id.parent_id, &[database_name, user_name]);
    info!("upgrading documentdb privilege id `{}` to `{}`", raw_id, upgraded);
    data.set_id(upgraded);

    Ok(())
}

/// Runs every upgrader of `kind` needed to bring a state from `from_version` to `to_version`.
pub fn upgrade_state(
    upgraders: &[StateUpgrader],
    kind: &str,
    from_version: u32,
    to_version: u32,
    data: &mut ResourceData,
) -> ProviderResult<()> {
    if from_version > to_version {
        return Err(ProviderError::new_internal(&format!(
            "cannot downgrade the state of {kind} from version {from_version} to {to_version}"
        )));
    }

    for version in from_version..to_version {
        let upgrader = upgraders
            .iter()
            .find(|u| u.kind == kind && u.from_version == version)
            .ok_or_else(|| {
                ProviderError::new_internal(&format!("no state upgrader for {kind} from version {version}"))
            })?;
        (upgrader.upgrade)(data)?;
    }

    Ok(())
}
