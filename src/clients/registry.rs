use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::{Client, ClientManager, SIMULATED_CLIENT};
use crate::error::{ExchangeError, Result};

impl ClientManager {
    pub fn new(starting_capital: Decimal) -> Self {
        Self {
            clients: HashMap::new(),
            starting_capital,
        }
    }

    pub fn starting_capital(&self) -> Decimal {
        self.starting_capital
    }

    /// Register `id` with the starting capital
    ///
    /// Returns false if the client was already known; its balances are left
    /// alone in that case.
    pub fn add_client(&mut self, id: &str) -> Result<bool> {
        if id == SIMULATED_CLIENT {
            return Err(ExchangeError::ReservedClientId(id.to_string()));
        }
        if self.is_registered(id) {
            return Ok(false);
        }
        self.clients
            .insert(id.to_string(), Client::new(id, self.starting_capital));
        debug!(client = %id, "Registered client");
        Ok(true)
    }

    /// Register every key of a directory export such as
    /// `{"uid1": {...}, "uid2": {...}}`
    pub fn initialize_from_directory(&mut self, users: &serde_json::Value) -> Result<usize> {
        let users = users.as_object().ok_or_else(|| {
            ExchangeError::ClientDirectoryError("expected a JSON object keyed by client id".into())
        })?;

        let mut added = 0;
        for uid in users.keys() {
            if self.add_client(uid)? {
                added += 1;
            }
        }
        info!(added, total = self.clients.len(), "Client directory loaded");
        Ok(added)
    }

    /// Read a directory export from disk and register its clients
    pub fn load_directory(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExchangeError::ClientDirectoryError(format!("{}: {}", path.display(), e))
        })?;
        let users: serde_json::Value = serde_json::from_str(&raw)?;
        self.initialize_from_directory(&users)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    /// Mark a client active or inactive. Unknown ids are ignored.
    pub fn set_client_active(&mut self, id: &str, active: bool) -> bool {
        match self.clients.get_mut(id) {
            Some(client) => {
                client.active = active;
                true
            }
            None => false,
        }
    }

    pub fn get_client(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Clients whose active flag equals `active`, sorted by id
    pub fn get_clients(&self, active: bool) -> Vec<Client> {
        let mut clients: Vec<Client> = self
            .clients
            .values()
            .filter(|c| c.active == active)
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        clients
    }

    /// Capital of every active client, best first
    pub fn results(&self) -> Vec<(String, Decimal)> {
        let mut standings: Vec<(String, Decimal)> = self
            .clients
            .values()
            .filter(|c| c.active)
            .map(|c| (c.id.clone(), c.capital))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        standings
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_add_client_is_idempotent() {
        let mut manager = ClientManager::new(dec!(500));
        assert!(manager.add_client("ABC").unwrap());
        manager.modify_capital("ABC", dec!(-100));
        assert!(!manager.add_client("ABC").unwrap());
        assert_eq!(manager.get_capital("ABC"), dec!(400));
        assert!(!manager.get_client("ABC").unwrap().active);
    }

    #[test]
    fn test_simulated_id_is_reserved() {
        let mut manager = ClientManager::default();
        assert!(matches!(
            manager.add_client(SIMULATED_CLIENT),
            Err(ExchangeError::ReservedClientId(_))
        ));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_initialize_from_directory() {
        let mut manager = ClientManager::default();
        let users = serde_json::json!({
            "alice": {"name": "Alice"},
            "bob": {"name": "Bob"}
        });
        assert_eq!(manager.initialize_from_directory(&users).unwrap(), 2);
        assert!(manager.is_registered("alice"));
        assert_eq!(manager.get_capital("bob"), manager.starting_capital());

        let not_an_object = serde_json::json!(["alice"]);
        assert!(manager.initialize_from_directory(&not_an_object).is_err());
    }

    #[test]
    fn test_load_directory_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"u1": {{}}, "u2": {{}}, "u3": {{}}}}"#).unwrap();

        let mut manager = ClientManager::default();
        assert_eq!(manager.load_directory(file.path()).unwrap(), 3);
        assert_eq!(manager.len(), 3);

        let missing = manager.load_directory("/nonexistent/clients.json");
        assert!(matches!(missing, Err(ExchangeError::ClientDirectoryError(_))));
    }

    #[test]
    fn test_active_filter_and_results() {
        let mut manager = ClientManager::new(dec!(10));
        for id in ["c", "a", "b"] {
            manager.add_client(id).unwrap();
        }
        assert!(manager.set_client_active("a", true));
        assert!(manager.set_client_active("c", true));
        assert!(!manager.set_client_active("zzz", true));
        manager.modify_capital("c", dec!(5));

        let active: Vec<String> = manager.get_clients(true).into_iter().map(|c| c.id).collect();
        assert_eq!(active, vec!["a", "c"]);
        let inactive: Vec<String> = manager.get_clients(false).into_iter().map(|c| c.id).collect();
        assert_eq!(inactive, vec!["b"]);

        assert_eq!(
            manager.results(),
            vec![("c".to_string(), dec!(15)), ("a".to_string(), dec!(10))]
        );

        manager.set_client_active("a", false);
        assert_eq!(manager.get_clients(true).len(), 1);
    }
}
