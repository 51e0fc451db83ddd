/*!
 * User List Parsing
 * Colon-delimited user names to resolved identifiers and back
 */

use crate::core::traits::UserResolver;
use crate::core::types::UserId;
use log::error;

/// Translate a colon-delimited list of user names into identifiers.
///
/// The list is truncated at the first comma. Names that do not resolve, or
/// that resolve to uid 0, are skipped with a logged error.
#[must_use]
pub fn parse_users(resolver: &dyn UserResolver, list: &str) -> Vec<UserId> {
    let list = match list.split(',').next() {
        Some(head) => head,
        None => list,
    };

    let mut users = Vec::new();
    for tok in list.split(':').filter(|t| !t.is_empty()) {
        match resolver.uid_from_name(tok) {
            Some(uid) if uid != 0 => users.push(uid),
            _ => error!("ignoring invalid user: {}", tok),
        }
    }
    users
}

/// Translate an identifier list back into a colon-delimited name string.
/// Identifiers the reverse lookup cannot name are skipped.
#[must_use]
pub fn print_users(resolver: &dyn UserResolver, uids: &[UserId]) -> String {
    let names: Vec<String> = uids
        .iter()
        .filter_map(|&uid| resolver.name_from_uid(uid))
        .collect();
    names.join(":")
}
