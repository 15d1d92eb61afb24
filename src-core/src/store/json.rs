use super::{CardStore, StoreError, StoreResult};
use crate::error::ValidationError;
use crate::models::{Card, CardUpdate, Group, Settings};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

const CARDS_FILE: &str = "cards.json";
const GROUPS_FILE: &str = "groups.json";
const SETTINGS_FILE: &str = "settings.json";

/// Stores cards, groups and settings as pretty-printed JSON files in one directory.
///
/// Files are read on every call, so edits made by other tools show up on the next access.
pub struct JsonStore {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> StoreResult<T> {
    if !path.exists() {
        return Ok(T::default());
    }

    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Serialization {
        path: path.to_path_buf(),
        source,
    })
}

fn write_pretty<W: Write, T: Serialize + ?Sized>(target: W, path: &Path, value: &T) -> StoreResult<()> {
    let mut writer = BufWriter::new(target);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StoreError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes straight to `path`. Used for exports, which may target any file.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    write_pretty(file, path, value)
}

/// Writes a sibling temp file and renames it over `path`, so a failed write leaves
/// the previous contents in place.
fn replace_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
    write_pretty(temp.as_file_mut(), path, value)?;
    temp.as_file().sync_all().map_err(io_error)?;
    temp.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

fn validate_import(cards: &[Card]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(cards.len());
    for card in cards {
        card.validate()?;
        if !seen.insert(card.id.as_str()) {
            return Err(ValidationError::DuplicateCardId(card.id.clone()));
        }
    }
    Ok(())
}

impl JsonStore {
    /// Opens (and creates if needed) the data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|source| StoreError::Io {
            path: data_dir.clone(),
            source,
        })?;

        log::debug!("Using data directory {}", data_dir.display());
        Ok(JsonStore {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    fn load_cards(&self) -> StoreResult<Vec<Card>> {
        read_json(&self.path(CARDS_FILE))
    }

    fn save_cards(&self, cards: &[Card]) -> StoreResult<()> {
        replace_json(&self.path(CARDS_FILE), cards)
    }

    fn load_groups(&self) -> StoreResult<Vec<Group>> {
        read_json(&self.path(GROUPS_FILE))
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("Failed to lock data directory".to_string()))
    }

    /// Adds a new card or replaces the one with the same id.
    pub fn insert_card(&self, card: Card) -> StoreResult<()> {
        let _guard = self.lock()?;
        let mut cards = self.load_cards()?;
        match cards.iter_mut().find(|existing| existing.id == card.id) {
            Some(existing) => *existing = card,
            None => cards.push(card),
        }
        self.save_cards(&cards)
    }

    /// Writes every card as one flat JSON array.
    pub fn export_cards(&self, path: &Path) -> StoreResult<usize> {
        let cards = self.load_cards()?;
        write_json(path, &cards)?;
        log::info!("Exported {} cards to {}", cards.len(), path.display());
        Ok(cards.len())
    }

    /// Replaces all cards with the contents of a flat JSON array.
    ///
    /// The whole import is rejected, and the stored cards kept, if any card has a bad
    /// side count or shares its id with another.
    pub fn import_cards(&self, path: &Path) -> StoreResult<usize> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cards: Vec<Card> = serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Serialization {
            path: path.to_path_buf(),
            source,
        })?;
        validate_import(&cards).map_err(|source| StoreError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;

        let _guard = self.lock()?;
        self.save_cards(&cards)?;
        log::info!("Imported {} cards from {}", cards.len(), path.display());
        Ok(cards.len())
    }
}

#[async_trait]
impl CardStore for JsonStore {
    async fn list_cards(&self) -> StoreResult<Vec<Card>> {
        self.load_cards()
    }

    async fn get_card(&self, id: &str) -> StoreResult<Option<Card>> {
        Ok(self.load_cards()?.into_iter().find(|card| card.id == id))
    }

    async fn update_card(&self, id: &str, update: CardUpdate) -> StoreResult<Card> {
        let _guard = self.lock()?;
        let mut cards = self.load_cards()?;
        let card = cards
            .iter_mut()
            .find(|card| card.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("card {}", id)))?;
        update.apply_to(card);

        let updated = card.clone();
        self.save_cards(&cards)?;
        Ok(updated)
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        self.load_groups()
    }

    async fn get_group(&self, id: &str) -> StoreResult<Option<Group>> {
        Ok(self.load_groups()?.into_iter().find(|group| group.id == id))
    }

    async fn put_group(&self, group: Group) -> StoreResult<()> {
        let _guard = self.lock()?;
        let mut groups = self.load_groups()?;
        match groups.iter_mut().find(|existing| existing.id == group.id) {
            Some(existing) => *existing = group,
            None => groups.push(group),
        }
        replace_json(&self.path(GROUPS_FILE), &groups)
    }

    async fn get_settings(&self) -> StoreResult<Settings> {
        read_json(&self.path(SETTINGS_FILE))
    }

    async fn put_settings(&self, settings: Settings) -> StoreResult<()> {
        let _guard = self.lock()?;
        replace_json(&self.path(SETTINGS_FILE), &settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::{TimeZone, Utc};
    use serial_test::serial;
    use tempfile::TempDir;
    use tokio_test::block_on;

    fn create_test_store() -> (JsonStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStore::new(temp_dir.path().join("data")).unwrap();
        (store, temp_dir)
    }

    fn create_test_card(front: &str, back: &str, category: Option<Category>) -> Card {
        Card::new(vec![front, back], category).unwrap()
    }

    #[test]
    #[serial]
    fn test_empty_directory_reads_as_empty() {
        let (store, _temp_dir) = create_test_store();
        assert!(block_on(store.list_cards()).unwrap().is_empty());
        assert!(block_on(store.list_groups()).unwrap().is_empty());
        assert_eq!(block_on(store.get_settings()).unwrap(), Settings::default());
    }

    #[test]
    #[serial]
    fn test_update_card_persists() {
        let (store, _temp_dir) = create_test_store();
        let card = create_test_card("hond", "dog", None);
        store.insert_card(card.clone()).unwrap();

        let due = Utc.timestamp_millis_opt(1_750_000_000_000).unwrap();
        let updated = block_on(store.update_card(&card.id, CardUpdate::rating(2, due))).unwrap();
        assert_eq!(updated.rate, Some(2));

        let reopened = JsonStore::new(store.data_dir().to_path_buf()).unwrap();
        let stored = block_on(reopened.get_card(&card.id)).unwrap().unwrap();
        assert_eq!(stored.due_at, Some(due));
        assert_eq!(stored.sides, vec!["hond", "dog"]);
    }

    #[test]
    #[serial]
    fn test_update_card_not_found() {
        let (store, _temp_dir) = create_test_store();
        let result = block_on(store.update_card("nonexistent-id", CardUpdate::rating(1, Utc::now())));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_reported() {
        let (store, _temp_dir) = create_test_store();
        std::fs::write(store.data_dir().join(CARDS_FILE), "{ not json").unwrap();

        let result = block_on(store.list_cards());
        assert!(matches!(result, Err(StoreError::Serialization { .. })));
    }

    #[test]
    #[serial]
    fn test_export_import_round_trip() {
        let (store, temp_dir) = create_test_store();
        let mut rated = create_test_card("Wat?", "What?", Some(Category::QuestionNl));
        rated.sides.push("extra side".to_string());
        rated.rate = Some(0);
        rated.due_at = Some(Utc.timestamp_millis_opt(1_760_000_000_456).unwrap());
        let fresh = create_test_card("kat", "cat", None);
        store.insert_card(rated.clone()).unwrap();
        store.insert_card(fresh.clone()).unwrap();

        let backup = temp_dir.path().join("backup.json");
        assert_eq!(store.export_cards(&backup).unwrap(), 2);

        let (other, _other_dir) = create_test_store();
        other.insert_card(create_test_card("old", "card", None)).unwrap();
        assert_eq!(other.import_cards(&backup).unwrap(), 2);

        let imported = block_on(other.list_cards()).unwrap();
        assert_eq!(imported, vec![rated, fresh]);
    }

    #[test]
    #[serial]
    fn test_import_rejects_non_array() {
        let (store, temp_dir) = create_test_store();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, r#"{"id":"a"}"#).unwrap();
        assert!(store.import_cards(&path).is_err());
    }

    #[test]
    #[serial]
    fn test_import_rejects_duplicate_ids() {
        let (store, temp_dir) = create_test_store();
        let existing = create_test_card("old", "card", None);
        store.insert_card(existing.clone()).unwrap();

        let card = create_test_card("hond", "dog", None);
        let mut twin = create_test_card("kat", "cat", None);
        twin.id = card.id.clone();
        let path = temp_dir.path().join("twins.json");
        std::fs::write(&path, serde_json::to_string(&vec![card, twin]).unwrap()).unwrap();

        let result = store.import_cards(&path);
        assert!(matches!(
            result,
            Err(StoreError::Invalid {
                source: ValidationError::DuplicateCardId(_),
                ..
            })
        ));
        assert_eq!(block_on(store.list_cards()).unwrap(), vec![existing]);
    }

    #[test]
    #[serial]
    fn test_import_rejects_bad_side_count() {
        let (store, temp_dir) = create_test_store();
        let mut lonely = create_test_card("hond", "dog", None);
        lonely.sides.truncate(1);
        let path = temp_dir.path().join("lonely.json");
        std::fs::write(&path, serde_json::to_string(&vec![lonely]).unwrap()).unwrap();

        let result = store.import_cards(&path);
        assert!(matches!(
            result,
            Err(StoreError::Invalid {
                source: ValidationError::SideCount(1),
                ..
            })
        ));
        assert!(block_on(store.list_cards()).unwrap().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn test_export_to_full_device_fails() {
        let (store, _temp_dir) = create_test_store();
        store.insert_card(create_test_card("hond", "dog", None)).unwrap();

        let result = store.export_cards(Path::new("/dev/full"));
        assert!(matches!(result, Err(StoreError::Io { .. })));
    }

    #[test]
    #[serial]
    fn test_writes_leave_no_temp_files() {
        let (store, _temp_dir) = create_test_store();
        let card = create_test_card("hond", "dog", None);
        store.insert_card(card.clone()).unwrap();
        block_on(store.update_card(&card.id, CardUpdate::rating(3, Utc::now()))).unwrap();
        block_on(store.put_settings(Settings::default())).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(store.data_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![CARDS_FILE, SETTINGS_FILE]);
    }

    #[test]
    #[serial]
    fn test_groups_and_settings_persist() {
        let (store, _temp_dir) = create_test_store();
        let mut group = Group {
            id: "g1".to_string(),
            name: "Nov 12 dog".to_string(),
            card_ids: Default::default(),
        };
        group.card_ids.insert("a".to_string());
        block_on(store.put_group(group.clone())).unwrap();
        block_on(store.put_settings(Settings {
            default_group_id: Some("g1".to_string()),
            ..Settings::default()
        }))
        .unwrap();

        let reopened = JsonStore::new(store.data_dir().to_path_buf()).unwrap();
        assert_eq!(block_on(reopened.get_group("g1")).unwrap(), Some(group));
        assert_eq!(block_on(reopened.get_settings()).unwrap().default_group_id.as_deref(), Some("g1"));
    }
}
