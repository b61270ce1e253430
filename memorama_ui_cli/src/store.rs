use std::{fs, io, path::PathBuf, str::FromStr};

use chrono::{DateTime, Local};
use log::warn;
use thiserror::Error;

use memorama_core::{
    console::CardStyle,
    difficulty::Difficulty,
    save::{SaveError, SaveFormat, SavedGame},
};

const AUTOSAVE_NAME: &str = "autosave";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Save(#[from] SaveError),
}

/// One entry of the saved-game history listing.
pub struct SaveEntry {
    pub name: String,
    pub format: SaveFormat,
    pub state: SavedGame,
    pub modified: DateTime<Local>,
}

/// Directory-backed save storage: named manual saves in any of the three
/// formats, one autosave slot for resuming, and the player settings.
pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open("memorama_saves")
    }

    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(SaveStore { dir })
    }

    fn path_for(&self, name: &str, format: SaveFormat) -> PathBuf {
        self.dir.join(format!("{}.{}", name, format.extension()))
    }

    pub fn save(&self, name: &str, format: SaveFormat, state: &SavedGame) -> Result<(), StoreError> {
        fs::write(self.path_for(name, format), state.to_string(format)?)?;
        Ok(())
    }

    pub fn load(&self, name: &str, format: SaveFormat) -> Result<SavedGame, StoreError> {
        let text = fs::read_to_string(self.path_for(name, format))?;
        Ok(SavedGame::from_str(&text, format)?)
    }

    /// Names of all manual saves, regardless of format, for overwrite hints.
    pub fn save_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .read_save_files()
            .into_iter()
            .map(|(name, _, _)| name)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Manual saves, newest first, optionally filtered to one difficulty
    /// (the history view only offers games matching the board in play).
    pub fn entries(&self, difficulty: Option<Difficulty>) -> Vec<SaveEntry> {
        let mut entries: Vec<SaveEntry> = self
            .read_save_files()
            .into_iter()
            .filter_map(|(name, format, modified)| {
                let state = match self.load(&name, format) {
                    Ok(state) => state,
                    Err(e) => {
                        warn!("skipping unreadable save {name}.{}: {e}", format.extension());
                        return None;
                    }
                };
                Some(SaveEntry {
                    name,
                    format,
                    state,
                    modified,
                })
            })
            .filter(|entry| difficulty.map_or(true, |d| entry.state.difficulty == d))
            .collect();
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        entries
    }

    fn read_save_files(&self) -> Vec<(String, SaveFormat, DateTime<Local>)> {
        let Ok(dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        dir.filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            let format = SaveFormat::from_extension(path.extension()?.to_str()?)?;
            let name = path.file_stem()?.to_str()?.to_string();
            if name == AUTOSAVE_NAME {
                return None;
            }
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((name, format, DateTime::<Local>::from(modified)))
        })
        .collect()
    }

    // --- autosave slot --------------------------------------------------

    pub fn autosave(&self, state: &SavedGame) -> Result<(), StoreError> {
        self.save(AUTOSAVE_NAME, SaveFormat::Json, state)
    }

    /// The unfinished game to resume, if any. An unreadable autosave is
    /// cleared rather than surfaced; a corrupt slot must never block the
    /// next start.
    pub fn take_autosave(&self) -> Option<SavedGame> {
        let path = self.path_for(AUTOSAVE_NAME, SaveFormat::Json);
        if !path.exists() {
            return None;
        }
        match self.load(AUTOSAVE_NAME, SaveFormat::Json) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("clearing unreadable autosave: {e}");
                self.clear_autosave();
                None
            }
        }
    }

    pub fn clear_autosave(&self) {
        let path = self.path_for(AUTOSAVE_NAME, SaveFormat::Json);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("cannot clear autosave: {e}");
            }
        }
    }

    // --- settings -------------------------------------------------------

    fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn card_style(&self) -> CardStyle {
        let Ok(text) = fs::read_to_string(self.settings_path()) else {
            return CardStyle::Numbers;
        };
        serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v["cardStyle"].as_str().and_then(|s| CardStyle::from_str(s).ok()))
            .unwrap_or(CardStyle::Numbers)
    }

    pub fn set_card_style(&self, style: CardStyle) -> Result<(), StoreError> {
        let settings = serde_json::json!({ "cardStyle": style.to_string() });
        fs::write(self.settings_path(), settings.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use memorama_core::{
        console::CardStyle,
        difficulty::Difficulty,
        game::MemoryGame,
        save::{SaveFormat, SavedGame},
    };
    use rand::{rngs::StdRng, SeedableRng};

    use super::SaveStore;

    fn snapshot(difficulty: Difficulty) -> SavedGame {
        let mut rng = StdRng::seed_from_u64(1);
        SavedGame::capture(&MemoryGame::new_solo(difficulty, &mut rng), 10)
    }

    #[test]
    fn saves_round_trip_in_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::open(dir.path()).unwrap();
        let state = snapshot(Difficulty::Easy);
        for format in [SaveFormat::Json, SaveFormat::Xml, SaveFormat::Txt] {
            store.save("round", format, &state).unwrap();
            assert_eq!(store.load("round", format).unwrap(), state);
        }
    }

    #[test]
    fn history_filters_by_difficulty_and_skips_the_autosave() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::open(dir.path()).unwrap();
        store
            .save("easy_game", SaveFormat::Json, &snapshot(Difficulty::Easy))
            .unwrap();
        store
            .save("hard_game", SaveFormat::Txt, &snapshot(Difficulty::Hard))
            .unwrap();
        store.autosave(&snapshot(Difficulty::Easy)).unwrap();

        let easy = store.entries(Some(Difficulty::Easy));
        assert_eq!(easy.len(), 1);
        assert_eq!(easy[0].name, "easy_game");

        let all = store.entries(None);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn autosave_slot_resumes_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::open(dir.path()).unwrap();
        assert!(store.take_autosave().is_none());

        let state = snapshot(Difficulty::Medium);
        store.autosave(&state).unwrap();
        assert_eq!(store.take_autosave().unwrap(), state);

        store.clear_autosave();
        assert!(store.take_autosave().is_none());
    }

    #[test]
    fn card_style_defaults_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::open(dir.path()).unwrap();
        assert_eq!(store.card_style(), CardStyle::Numbers);
        store.set_card_style(CardStyle::Letters).unwrap();
        assert_eq!(store.card_style(), CardStyle::Letters);
    }
}
