use crate::errors::{ProviderError, ProviderResult};

/// The single entity named exactly `name`. The list may come from a server side filter which also
/// matches names containing `name`, those are ignored.
pub fn select_by_name<T>(what: &str, name: &str, entities: Vec<T>, name_of: impl Fn(&T) -> &str) -> ProviderResult<T> {
    let mut matches: Vec<T> = entities.into_iter().filter(|e| name_of(e) == name).collect();

    match matches.len() {
        0 => Err(ProviderError::new_not_found(&format!("{what} named `{name}`"))),
        1 => Ok(matches.remove(0)),
        count => Err(ProviderError::new_ambiguous(what, name, count)),
    }
}
