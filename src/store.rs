//! Persistence port for progress cards, one store per entity kind.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use crate::card::StoredCard;
use crate::error::{IoSnafu, Result, SerializationSnafu};

/// Absence of a card means the item was never attempted.
pub trait CardStore<C: StoredCard> {
    fn get(&self, id: &str) -> Result<Option<C>>;

    /// Inserts or replaces the card with the same key.
    fn put(&mut self, card: C) -> Result<()>;

    fn all(&self) -> Result<Vec<C>>;

    /// Cards with `due <= now`.
    fn due(&self, now: DateTime<Utc>) -> Result<Vec<C>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|card| card.is_due(now))
            .collect())
    }

    fn delete(&mut self, id: &str) -> Result<()>;

    fn reset_all(&mut self) -> Result<()>;
}

/// Ordered in-memory store; iteration is by key so seeded selections reproduce.
#[derive(Debug, Clone)]
pub struct MemoryStore<C> {
    cards: BTreeMap<String, C>,
}

impl<C> Default for MemoryStore<C> {
    fn default() -> Self {
        Self {
            cards: BTreeMap::new(),
        }
    }
}

impl<C: StoredCard> MemoryStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl<C: StoredCard> FromIterator<C> for MemoryStore<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self {
            cards: iter
                .into_iter()
                .map(|card| (card.key().to_owned(), card))
                .collect(),
        }
    }
}

impl<C: StoredCard> CardStore<C> for MemoryStore<C> {
    fn get(&self, id: &str) -> Result<Option<C>> {
        Ok(self.cards.get(id).cloned())
    }

    fn put(&mut self, card: C) -> Result<()> {
        self.cards.insert(card.key().to_owned(), card);
        Ok(())
    }

    fn all(&self) -> Result<Vec<C>> {
        Ok(self.cards.values().cloned().collect())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.cards.remove(id);
        Ok(())
    }

    fn reset_all(&mut self) -> Result<()> {
        self.cards.clear();
        Ok(())
    }
}

/// Keeps the whole store as one JSON array on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore<C> {
    path: PathBuf,
    cards: MemoryStore<C>,
}

impl<C> JsonFileStore<C>
where
    C: StoredCard + Serialize + DeserializeOwned,
{
    /// Opens the store at `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let cards = if path.exists() {
            let raw = fs::read_to_string(&path).context(IoSnafu { path: &path })?;
            let cards: Vec<C> =
                serde_json::from_str(&raw).context(SerializationSnafu { path: &path })?;
            debug!("loaded {} cards from {}", cards.len(), path.display());
            cards.into_iter().collect()
        } else {
            MemoryStore::new()
        };
        Ok(Self { path, cards })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let cards = self.cards.all()?;
        let raw = serde_json::to_string_pretty(&cards).context(SerializationSnafu {
            path: &self.path,
        })?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).context(IoSnafu { path: dir })?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw).context(IoSnafu { path: &tmp })?;
        fs::rename(&tmp, &self.path).context(IoSnafu { path: &self.path })
    }
}

impl<C> CardStore<C> for JsonFileStore<C>
where
    C: StoredCard + Serialize + DeserializeOwned,
{
    fn get(&self, id: &str) -> Result<Option<C>> {
        self.cards.get(id)
    }

    fn put(&mut self, card: C) -> Result<()> {
        self.cards.put(card)?;
        self.flush()
    }

    fn all(&self) -> Result<Vec<C>> {
        self.cards.all()
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.cards.delete(id)?;
        self.flush()
    }

    fn reset_all(&mut self) -> Result<()> {
        self.cards.reset_all()?;
        self.flush()
    }
}

/// Deletes every card whose item is no longer part of the content.
/// Returns how many were removed.
pub fn prune_unknown<C, S>(store: &mut S, known: &HashSet<&str>) -> Result<usize>
where
    C: StoredCard,
    S: CardStore<C> + ?Sized,
{
    let stale = store
        .all()?
        .into_iter()
        .filter(|card| !known.contains(card.key()))
        .collect::<Vec<_>>();
    for card in &stale {
        info!("removing card for unknown item {}", card.key());
        store.delete(card.key())?;
    }
    Ok(stale.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{GoalCard, ProgressCard};
    use crate::test_helpers::{at, temp_path};
    use chrono::Duration;

    fn card_due(id: &str, due: DateTime<Utc>) -> ProgressCard {
        let mut card = ProgressCard::new(id, at(0));
        card.card.due = due;
        card
    }

    #[test]
    fn memory_store_round_trip() -> Result<()> {
        let mut store: MemoryStore<ProgressCard> = MemoryStore::new();
        assert!(store.get("a")?.is_none());
        store.put(ProgressCard::new("a", at(0)))?;
        store.put(ProgressCard::new("b", at(0)))?;
        assert_eq!(store.len(), 2);
        store.delete("a")?;
        assert!(store.get("a")?.is_none());
        store.reset_all()?;
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn due_is_inclusive_of_now() -> Result<()> {
        let now = at(100);
        let store: MemoryStore<ProgressCard> = [
            card_due("past", now - Duration::seconds(1)),
            card_due("exact", now),
            card_due("future", now + Duration::seconds(1)),
        ]
        .into_iter()
        .collect();
        let due = store.due(now)?;
        let ids = due.iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["exact", "past"]);
        Ok(())
    }

    #[test]
    fn put_overwrites_same_key() -> Result<()> {
        let mut store: MemoryStore<GoalCard> = MemoryStore::new();
        store.put(GoalCard::new("malta", at(0)))?;
        let mut updated = GoalCard::new("malta", at(0));
        updated.streak = 3;
        store.put(updated)?;
        assert_eq!(store.all()?.len(), 1);
        assert_eq!(store.get("malta")?.unwrap().streak, 3);
        Ok(())
    }

    #[test]
    fn json_store_survives_reopen() -> Result<()> {
        let path = temp_path("json_store_survives_reopen");
        {
            let mut store = JsonFileStore::<ProgressCard>::open(&path)?;
            let mut card = ProgressCard::new("malta-1", at(0));
            card.leveling.level = 2;
            store.put(card)?;
            store.put(ProgressCard::new("malta-2", at(0)))?;
            store.delete("malta-2")?;
        }
        let store = JsonFileStore::<ProgressCard>::open(&path)?;
        let cards = store.all()?;
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].leveling.level, 2);
        fs::remove_file(&path).ok();
        Ok(())
    }

    #[test]
    fn json_store_rejects_garbage() {
        let path = temp_path("json_store_rejects_garbage");
        fs::write(&path, "not json").unwrap();
        let result = JsonFileStore::<ProgressCard>::open(&path);
        assert!(matches!(
            result,
            Err(crate::DrillError::Serialization { .. })
        ));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn prune_removes_only_unknown_items() -> Result<()> {
        let mut store: MemoryStore<ProgressCard> = ["Malta", "Atlantis", "Italy"]
            .into_iter()
            .map(|id| ProgressCard::new(id, at(0)))
            .collect();
        let known = HashSet::from(["Malta", "Italy"]);
        assert_eq!(prune_unknown(&mut store, &known)?, 1);
        assert!(store.get("Atlantis")?.is_none());
        assert_eq!(store.len(), 2);
        Ok(())
    }
}
