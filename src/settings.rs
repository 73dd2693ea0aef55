// ============================================
// src/settings.rs
// 画面の設定 (進行状況とは別のキーに保存)
// ============================================

use serde::{Deserialize, Serialize};

use crate::catalog::KanaSet;
use crate::storage::Storage;

pub const SETTINGS_KEY: &str = "kanawiz-settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// 出題するかなの文字セット
    pub enabled_sets: Vec<KanaSet>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled_sets: vec![KanaSet::Hiragana],
        }
    }
}

impl Settings {
    /// 読み込みに失敗したらデフォルト
    pub fn load(storage: &impl Storage) -> Self {
        match storage.get(SETTINGS_KEY) {
            Ok(Some(text)) => match serde_json::from_str::<Settings>(&text) {
                Ok(settings) if !settings.enabled_sets.is_empty() => settings,
                Ok(_) => Self::default(),
                Err(e) => {
                    log::error!("設定の読み込みに失敗しました: {e}");
                    Self::default()
                }
            },
            Ok(None) => Self::default(),
            Err(e) => {
                log::error!("設定の読み込みに失敗しました: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut impl Storage) {
        let result = serde_json::to_string(self)
            .map_err(|e| e.to_string())
            .and_then(|json| storage.set(SETTINGS_KEY, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            log::error!("設定の保存に失敗しました: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn defaults_to_hiragana() {
        assert_eq!(Settings::load(&MemoryStorage::default()).enabled_sets, vec![KanaSet::Hiragana]);
    }

    #[test]
    fn saved_sets_come_back() {
        let mut storage = MemoryStorage::default();
        let settings = Settings {
            enabled_sets: vec![KanaSet::Hiragana, KanaSet::Katakana],
        };
        settings.save(&mut storage);
        assert_eq!(
            storage.get(SETTINGS_KEY).unwrap().as_deref(),
            Some(r#"{"enabledSets":["hiragana","katakana"]}"#)
        );
        assert_eq!(Settings::load(&storage), settings);
    }

    #[test]
    fn broken_or_empty_settings_fall_back() {
        let storage = MemoryStorage::with_entry(SETTINGS_KEY, "not json");
        assert_eq!(Settings::load(&storage), Settings::default());
        let storage = MemoryStorage::with_entry(SETTINGS_KEY, r#"{"enabledSets":[]}"#);
        assert_eq!(Settings::load(&storage), Settings::default());
    }
}
