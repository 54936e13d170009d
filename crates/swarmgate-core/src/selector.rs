//! Default backend selection for newly connecting sessions.

use std::collections::BTreeSet;

use crate::routing::RoutingTable;

/// Backends whose id contains this substring are preferred as the default
/// target.
const LOBBY_HINT: &str = "lobby";

/// Picks the default backend from the currently registered set.
///
/// Preference order: the lexicographically smallest id containing `"lobby"`
/// (case-insensitive match, raw lexicographic tie-break), else the smallest
/// registered id, else `None`. Candidates must still be present in the
/// routing table. An empty result is a valid, expected state when no
/// backends exist yet.
pub fn select_default(registered: &BTreeSet<String>, table: &dyn RoutingTable) -> Option<String> {
    let lobby = registered
        .iter()
        .filter(|id| id.to_lowercase().contains(LOBBY_HINT))
        .find(|id| table.is_registered(id));
    if let Some(id) = lobby {
        return Some(id.clone());
    }

    registered
        .iter()
        .find(|id| table.is_registered(id))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{BackendRecord, MemoryRoutingTable};

    fn setup(ids: &[&str]) -> (BTreeSet<String>, MemoryRoutingTable) {
        let table = MemoryRoutingTable::new();
        let mut registered = BTreeSet::new();
        for id in ids {
            registered.insert(id.to_string());
            table.register(BackendRecord {
                id: id.to_string(),
                address: "addr".to_string(),
                port: 25565,
            });
        }
        (registered, table)
    }

    #[test]
    fn test_prefers_smallest_lobby_backend() {
        let (registered, table) = setup(&["arena-1", "lobby-2", "lobby-1"]);
        assert_eq!(
            select_default(&registered, &table),
            Some("lobby-1".to_string())
        );
    }

    #[test]
    fn test_falls_back_to_smallest_registered() {
        let (registered, table) = setup(&["arena-2", "arena-1"]);
        assert_eq!(
            select_default(&registered, &table),
            Some("arena-1".to_string())
        );
    }

    #[test]
    fn test_empty_set_yields_none() {
        let (registered, table) = setup(&[]);
        assert_eq!(select_default(&registered, &table), None);
    }

    #[test]
    fn test_lobby_match_is_case_insensitive() {
        let (registered, table) = setup(&["arena-1", "Lobby-1"]);
        assert_eq!(
            select_default(&registered, &table),
            Some("Lobby-1".to_string())
        );
    }

    #[test]
    fn test_skips_candidates_missing_from_table() {
        let (mut registered, table) = setup(&["arena-1"]);
        // Tracked locally but absent from the routing table.
        registered.insert("lobby-1".to_string());
        assert_eq!(
            select_default(&registered, &table),
            Some("arena-1".to_string())
        );
    }
}
