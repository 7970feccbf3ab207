use crate::store::{Collection, DocumentStore, Namespace};

/// The account an engine call acts for, plus the store it reads and writes.
pub struct Session<'a> {
    store: &'a dyn DocumentStore,
    account: String,
}

impl<'a> Session<'a> {
    pub fn new(store: &'a dyn DocumentStore, account: &str) -> Self {
        Self {
            store,
            account: account.to_string(),
        }
    }

    pub fn store(&self) -> &'a dyn DocumentStore {
        self.store
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn catalog(&self) -> Namespace {
        Namespace::new(&self.account, Collection::Catalog)
    }

    pub fn roster(&self) -> Namespace {
        Namespace::new(&self.account, Collection::Roster)
    }
}
