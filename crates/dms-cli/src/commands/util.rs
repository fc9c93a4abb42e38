//! Shared helpers for command handlers.

use dms_core::{Dms, DmsElement, DmsElementId};

use crate::error::CliError;

/// Resolve an element argument: `agent/element` ids first, names otherwise.
///
/// Ids come back unloaded; names are looked up remotely and come back loaded.
pub async fn resolve_element(dms: &Dms, identifier: &str) -> Result<DmsElement, CliError> {
    if let Ok(id) = identifier.parse::<DmsElementId>() {
        return Ok(dms.element(id));
    }
    Ok(dms.element_by_name(identifier).await?)
}

/// Refuse a destructive action unless `--yes` was passed.
pub fn confirm(action: &str, yes_flag: bool) -> Result<(), CliError> {
    if yes_flag {
        Ok(())
    } else {
        Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_needs_the_yes_flag() {
        assert!(confirm("delete element", true).is_ok());
        assert!(matches!(
            confirm("delete element", false),
            Err(CliError::NonInteractiveRequiresYes { .. })
        ));
    }
}
