// ============================================
// src/store.rs
// 進行状況 (スター・単語レベル・コイン・パック) の保存と読み込み
// ============================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::mastery::{self, AnswerOutcome, CharacterProgress, Domain};
use crate::storage::Storage;
use crate::word_level::{self, WordOutcome, WordProgress};

pub const PROGRESS_KEY: &str = "kanawiz-progress";
pub const CURRENT_VERSION: u32 = 2;

fn current_version() -> u32 {
    CURRENT_VERSION
}

/// 保存される進行状況の全体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub coins: u32,
    #[serde(default)]
    pub kana_progress: BTreeMap<String, CharacterProgress>,
    #[serde(default)]
    pub kanji_progress: BTreeMap<String, CharacterProgress>,
    #[serde(default)]
    pub word_progress: BTreeMap<String, WordProgress>,
    #[serde(default)]
    pub unlocked_packs: Vec<String>,
}

impl ProgressState {
    /// すべての文字を初期値で埋めた状態
    pub fn new(catalog: &Catalog) -> Self {
        let mut state = Self {
            version: CURRENT_VERSION,
            coins: 0,
            kana_progress: BTreeMap::new(),
            kanji_progress: BTreeMap::new(),
            word_progress: BTreeMap::new(),
            unlocked_packs: Vec::new(),
        };
        state.fill_defaults(catalog);
        state
    }

    /// データにあるのに記録がない文字を初期値で追加する (既存の記録はそのまま)
    fn fill_defaults(&mut self, catalog: &Catalog) {
        for kana in catalog.kana {
            self.kana_progress
                .entry(kana.character.to_string())
                .or_insert_with(|| CharacterProgress::new(Domain::Kana));
        }
        for kanji in catalog.kanji {
            self.kanji_progress
                .entry(kanji.character.to_string())
                .or_insert_with(|| CharacterProgress::new(Domain::Kanji));
        }
    }

    fn characters(&self, domain: Domain) -> &BTreeMap<String, CharacterProgress> {
        match domain {
            Domain::Kana => &self.kana_progress,
            Domain::Kanji => &self.kanji_progress,
        }
    }

    fn characters_mut(&mut self, domain: Domain) -> &mut BTreeMap<String, CharacterProgress> {
        match domain {
            Domain::Kana => &mut self.kana_progress,
            Domain::Kanji => &mut self.kanji_progress,
        }
    }
}

/// エクスポートファイルの形 (進行状況 + exportDate)
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    #[serde(flatten)]
    state: &'a ProgressState,
    export_date: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("JSON として読み込めません: {0}")]
    Json(#[from] serde_json::Error),
    #[error("エクスポートファイルではありません (exportDate がありません)")]
    MissingExportDate,
    #[error("exportDate が日時ではありません: {0}")]
    InvalidExportDate(String),
    #[error("進行状況の形式が正しくありません: {0}")]
    InvalidState(#[source] serde_json::Error),
}

// MARK:セーブデータの版の判定と移行

/// 版番号を調べる。`version` があればそれを信じる
fn detect_version(raw: &Value) -> u32 {
    if let Some(version) = raw.get("version").and_then(Value::as_u64) {
        return u32::try_from(version).unwrap_or(u32::MAX);
    }

    // 版番号がない場合だけ、かなの記録の形から推測する
    // (serde_json::Map はキー順なので「最初」は保存順ではなく文字コード順。推測用なので問題ない)
    let first = raw
        .get("kanaProgress")
        .and_then(Value::as_object)
        .and_then(|records| records.values().next());
    match first {
        Some(record) if record.get("level").is_some_and(Value::is_number) => 1,
        Some(record) if record.get("kana").is_none() => 1,
        _ => CURRENT_VERSION,
    }
}

/// v1: 文字ごとに level を1つだけ持つ形式。文字の記録は引き継げないので捨てる
fn migrate_v1_to_v2(mut raw: Value) -> Value {
    log::info!("古い形式のセーブデータを移行します (v1 -> v2)。文字ごとの記録はリセットされます");
    if let Some(fields) = raw.as_object_mut() {
        fields.remove("kanaProgress");
        fields.remove("kanjiProgress");
        fields.insert("version".to_string(), Value::from(2));
    }
    raw
}

fn migrate(mut raw: Value) -> Value {
    let version = detect_version(&raw);
    if version > CURRENT_VERSION {
        log::warn!("新しい版 (v{version}) のセーブデータです。v{CURRENT_VERSION} として読み込みます");
    }
    if version < 2 {
        raw = migrate_v1_to_v2(raw);
    }
    raw
}

/// 保存された JSON を今の形式の状態にする
fn parse_saved(raw: Value) -> Result<ProgressState, serde_json::Error> {
    let mut state: ProgressState = serde_json::from_value(migrate(raw))?;
    state.version = CURRENT_VERSION;
    Ok(state)
}

/// 進行状況を持ち、保存先への読み書きを担当する
pub struct ProgressStore<S: Storage> {
    storage: S,
    catalog: Catalog,
    state: ProgressState,
}

impl<S: Storage> ProgressStore<S> {
    /// MARK:保存先から読み込む (失敗したら初期状態)
    pub fn load(storage: S, catalog: Catalog) -> Self {
        let saved = match storage.get(PROGRESS_KEY) {
            Ok(Some(text)) => serde_json::from_str::<Value>(&text).and_then(parse_saved).map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                log::error!("進行状況の読み込みに失敗しました: {e}");
                Ok(None)
            }
        };

        let state = match saved {
            Ok(Some(mut state)) => {
                state.fill_defaults(&catalog);
                state
            }
            Ok(None) => ProgressState::new(&catalog),
            Err(e) => {
                log::error!("セーブデータが壊れています。初期状態から始めます: {e}");
                ProgressState::new(&catalog)
            }
        };

        Self {
            storage,
            catalog,
            state,
        }
    }

    /// MARK:保存する (失敗してもログに出すだけ)
    pub fn save(&mut self) {
        let json = match serde_json::to_string(&self.state) {
            Ok(json) => json,
            Err(e) => {
                log::error!("進行状況の書き出しに失敗しました: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.set(PROGRESS_KEY, &json) {
            log::error!("進行状況の保存に失敗しました: {e}");
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn coins(&self) -> u32 {
        self.state.coins
    }

    pub fn character(&self, domain: Domain, character: &str) -> Option<&CharacterProgress> {
        self.state.characters(domain).get(character)
    }

    /// まだ出題されていない単語は初期値
    pub fn word(&self, word: &str) -> WordProgress {
        self.state.word_progress.get(word).copied().unwrap_or_default()
    }

    pub fn is_unlocked(&self, pack_id: &str) -> bool {
        self.state.unlocked_packs.iter().any(|id| id == pack_id)
    }

    /// そのクイズ種別でスターを獲得済みの文字数
    pub fn star_count(&self, domain: Domain, quiz_type: &str) -> usize {
        self.state
            .characters(domain)
            .values()
            .filter(|p| p.is_earned(quiz_type))
            .count()
    }

    /// 文字の回答を記録する。スター獲得ならコインも加算
    pub fn record_answer(
        &mut self,
        domain: Domain,
        character: &str,
        quiz_type: &str,
        is_correct: bool,
    ) -> AnswerOutcome {
        let records = self.state.characters_mut(domain);
        let current = records
            .get(character)
            .cloned()
            .unwrap_or_else(|| CharacterProgress::new(domain));
        let (updated, outcome) = mastery::record_answer(&current, quiz_type, is_correct);
        records.insert(character.to_string(), updated);

        self.state.coins = self.state.coins.saturating_add(outcome.coins());
        if let AnswerOutcome::StarEarned { coins } = outcome {
            log::info!("スター獲得: {character} ({quiz_type}) +{coins}コイン");
        }
        self.save();
        outcome
    }

    /// 単語の回答を記録する
    pub fn record_word_answer(&mut self, word: &str, is_correct: bool) -> WordOutcome {
        let (updated, outcome) = word_level::record_word_answer(&self.word(word), is_correct);
        self.state.word_progress.insert(word.to_string(), updated);
        self.state.coins = self.state.coins.saturating_add(outcome.coins());
        self.save();
        outcome
    }

    /// パックを購入する。購入済みかコイン不足なら何もせず false
    pub fn purchase_pack(&mut self, pack_id: &str, price: u32) -> bool {
        if self.is_unlocked(pack_id) || self.state.coins < price {
            return false;
        }
        self.state.coins -= price;
        self.state.unlocked_packs.push(pack_id.to_string());
        log::info!("パック購入: {pack_id} (-{price}コイン)");
        self.save();
        true
    }

    /// MARK:エクスポート (進行状況 + exportDate の JSON)
    pub fn export_progress(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ExportDocument {
            state: &self.state,
            export_date: Utc::now(),
        })
    }

    /// MARK:インポート。全体を読み込めたときだけ置き換える
    pub fn import_progress(&mut self, text: &str) -> Result<(), ImportError> {
        let raw: Value = serde_json::from_str(text)?;
        let export_date = raw
            .get("exportDate")
            .and_then(Value::as_str)
            .ok_or(ImportError::MissingExportDate)?;
        DateTime::parse_from_rfc3339(export_date)
            .map_err(|_| ImportError::InvalidExportDate(export_date.to_string()))?;

        let mut state = parse_saved(raw).map_err(ImportError::InvalidState)?;
        state.fill_defaults(&self.catalog);
        self.state = state;
        self.save();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mastery::QuizTypeProgress;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn fresh() -> ProgressStore<MemoryStorage> {
        ProgressStore::load(MemoryStorage::default(), Catalog::builtin())
    }

    fn stored(value: Value) -> ProgressStore<MemoryStorage> {
        let storage = MemoryStorage::with_entry(PROGRESS_KEY, &value.to_string());
        ProgressStore::load(storage, Catalog::builtin())
    }

    fn saved_state(store: &ProgressStore<MemoryStorage>) -> Value {
        let text = store.storage().get(PROGRESS_KEY).unwrap().unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn first_run_covers_every_character() {
        let store = fresh();
        let catalog = Catalog::builtin();
        assert_eq!(store.state().kana_progress.len(), catalog.kana.len());
        assert_eq!(store.state().kanji_progress.len(), catalog.kanji.len());
        assert_eq!(
            store.character(Domain::Kana, "あ"),
            Some(&CharacterProgress::new(Domain::Kana))
        );
        assert_eq!(store.coins(), 0);
    }

    #[test]
    fn twenty_correct_kana_answers_pay_twenty_coins() {
        let mut store = fresh();
        for _ in 0..20 {
            store.record_answer(Domain::Kana, "あ", "kana", true);
        }
        assert_eq!(
            store.character(Domain::Kana, "あ").unwrap().get("kana"),
            QuizTypeProgress {
                consecutive_correct: 0,
                earned: true,
                total_correct: 20,
                total_attempts: 20,
            }
        );
        assert_eq!(store.coins(), 20);

        let outcome = store.record_answer(Domain::Kana, "あ", "kana", true);
        assert_eq!(outcome, AnswerOutcome::AlreadyEarned);
        assert_eq!(store.coins(), 20);
        assert_eq!(store.star_count(Domain::Kana, "kana"), 1);

        let saved = saved_state(&store);
        assert_eq!(saved["coins"], 20);
        assert_eq!(
            saved["kanaProgress"]["あ"]["kana"],
            json!({"consecutiveCorrect": 0, "earned": true, "totalCorrect": 21, "totalAttempts": 21})
        );
    }

    #[test]
    fn unknown_characters_are_created_lazily() {
        let mut store = fresh();
        store.record_answer(Domain::Kanji, "雨", "onyomi", false);
        let record = store.character(Domain::Kanji, "雨").unwrap();
        assert_eq!(record.get("onyomi").total_attempts, 1);
        assert_eq!(record.get("meaning"), QuizTypeProgress::default());
    }

    #[test]
    fn word_answers_climb_levels() {
        let mut store = fresh();
        store.record_word_answer("猫", true);
        assert_eq!(store.record_word_answer("猫", true), WordOutcome::LeveledUp { level: 1 });
        assert_eq!(store.word("猫").level, 1);
        assert_eq!(store.record_word_answer("猫", false), WordOutcome::LeveledDown { level: 0 });
        assert_eq!(saved_state(&store)["wordProgress"]["猫"]["totalAttempts"], 3);
    }

    #[test]
    fn mastering_a_word_pays_coins() {
        let mut store = stored(json!({
            "version": 2,
            "coins": 1,
            "wordProgress": {"犬": {"level": 4, "consecutiveCorrect": 5, "totalCorrect": 40, "totalAttempts": 50}}
        }));
        assert_eq!(store.record_word_answer("犬", true), WordOutcome::LeveledUp { level: 5 });
        assert_eq!(store.coins(), 1 + word_level::MASTERY_COIN_REWARD);
    }

    #[test]
    fn load_merges_missing_characters() {
        let mut kana = serde_json::Map::new();
        let mut a = CharacterProgress::new(Domain::Kana);
        for _ in 0..3 {
            a = mastery::record_answer(&a, "reverse", true).0;
        }
        kana.insert("あ".into(), serde_json::to_value(&a).unwrap());
        kana.insert("ゐ".into(), serde_json::to_value(CharacterProgress::new(Domain::Kana)).unwrap());

        let store = stored(json!({"version": 2, "coins": 7, "kanaProgress": kana}));
        assert_eq!(store.character(Domain::Kana, "あ"), Some(&a));
        assert_eq!(
            store.character(Domain::Kana, "い"),
            Some(&CharacterProgress::new(Domain::Kana))
        );
        // データにない文字の記録も残す
        assert!(store.character(Domain::Kana, "ゐ").is_some());
        assert_eq!(store.coins(), 7);
    }

    #[test]
    fn untagged_level_records_are_migrated() {
        let store = stored(json!({
            "coins": 55,
            "kanaProgress": {"あ": {"level": 3, "consecutiveCorrect": 2}},
            "wordProgress": {"猫": {"level": 2, "consecutiveCorrect": 1, "totalCorrect": 9, "totalAttempts": 12}},
            "unlockedPacks": ["food"]
        }));
        assert_eq!(store.state().version, CURRENT_VERSION);
        assert_eq!(store.coins(), 55);
        assert_eq!(
            store.character(Domain::Kana, "あ"),
            Some(&CharacterProgress::new(Domain::Kana))
        );
        assert_eq!(store.word("猫").level, 2);
        assert!(store.is_unlocked("food"));
    }

    #[test]
    fn untagged_records_without_kana_entry_are_migrated() {
        let store = stored(json!({
            "coins": 12,
            "kanaProgress": {"あ": {"reverse": {"consecutiveCorrect": 6, "totalCorrect": 6, "totalAttempts": 6}}},
            "wordProgress": {"犬": {"level": 1, "consecutiveCorrect": 2, "totalCorrect": 4, "totalAttempts": 5}},
            "unlockedPacks": ["travel"]
        }));
        assert_eq!(store.state().version, CURRENT_VERSION);
        assert_eq!(
            store.character(Domain::Kana, "あ"),
            Some(&CharacterProgress::new(Domain::Kana))
        );
        assert_eq!(store.coins(), 12);
        assert_eq!(
            store.word("犬"),
            WordProgress {
                level: 1,
                consecutive_correct: 2,
                total_correct: 4,
                total_attempts: 5,
            }
        );
        assert_eq!(store.state().unlocked_packs, vec!["travel".to_string()]);
    }

    #[test]
    fn huge_coin_balance_does_not_overflow() {
        let mut store = fresh();
        let near_max = json!({
            "version": 2,
            "coins": u32::MAX - 5,
            "exportDate": "2026-01-01T00:00:00Z",
            "kanaProgress": {"あ": {"kana": {"consecutiveCorrect": 19, "totalCorrect": 19, "totalAttempts": 19}}},
            "wordProgress": {"犬": {"level": 4, "consecutiveCorrect": 5}}
        });
        store.import_progress(&near_max.to_string()).unwrap();

        let outcome = store.record_answer(Domain::Kana, "あ", "kana", true);
        assert_eq!(outcome, AnswerOutcome::StarEarned { coins: 20 });
        assert_eq!(store.coins(), u32::MAX);

        assert_eq!(store.record_word_answer("犬", true), WordOutcome::LeveledUp { level: 5 });
        assert_eq!(store.coins(), u32::MAX);
        assert_eq!(saved_state(&store)["coins"], u32::MAX);
    }

    #[test]
    fn version_tag_wins_over_shape() {
        // version があれば形による推測はしない
        let store = stored(json!({
            "version": 2,
            "kanaProgress": {"あ": {"reverse": {"consecutiveCorrect": 4, "totalAttempts": 4, "totalCorrect": 4}}}
        }));
        assert_eq!(store.character(Domain::Kana, "あ").unwrap().get("reverse").consecutive_correct, 4);

        let store = stored(json!({
            "version": 1,
            "coins": 3,
            "kanaProgress": {"あ": {"kana": {"consecutiveCorrect": 4}}}
        }));
        assert_eq!(store.character(Domain::Kana, "あ").unwrap().get("kana").consecutive_correct, 0);
        assert_eq!(store.coins(), 3);
    }

    #[test]
    fn corrupted_save_falls_back_to_defaults() {
        let storage = MemoryStorage::with_entry(PROGRESS_KEY, "{not json");
        let store = ProgressStore::load(storage, Catalog::builtin());
        assert_eq!(store.state(), &ProgressState::new(&Catalog::builtin()));

        let store = stored(json!([1, 2, 3]));
        assert_eq!(store.coins(), 0);
    }

    #[test]
    fn purchase_needs_enough_coins() {
        let mut store = stored(json!({"version": 2, "coins": 39}));
        assert!(!store.purchase_pack("food", 40));
        assert_eq!(store.coins(), 39);
        assert!(store.state().unlocked_packs.is_empty());

        store.state.coins = 100;
        assert!(store.purchase_pack("food", 40));
        assert_eq!(store.coins(), 60);
        assert!(!store.purchase_pack("food", 40));
        assert_eq!(store.coins(), 60);
        assert_eq!(store.state().unlocked_packs, vec!["food".to_string()]);
        assert_eq!(saved_state(&store)["unlockedPacks"], json!(["food"]));
    }

    #[test]
    fn export_then_import_restores_state() {
        let mut store = fresh();
        for _ in 0..20 {
            store.record_answer(Domain::Kana, "か", "reverse", true);
        }
        store.record_answer(Domain::Kanji, "日", "meaning", true);
        store.record_word_answer("海", true);
        store.purchase_pack("food", 15);
        let before = store.state().clone();
        let exported = store.export_progress().unwrap();

        let raw: Value = serde_json::from_str(&exported).unwrap();
        assert!(DateTime::parse_from_rfc3339(raw["exportDate"].as_str().unwrap()).is_ok());

        let mut other = fresh();
        other.import_progress(&exported).unwrap();
        assert_eq!(other.state(), &before);
        assert_eq!(saved_state(&other)["coins"], 5);
    }

    #[test]
    fn import_rejects_files_without_export_date() {
        let mut store = fresh();
        store.record_word_answer("海", true);
        let before = store.state().clone();

        let no_date = json!({"version": 2, "coins": 999}).to_string();
        assert!(matches!(store.import_progress(&no_date), Err(ImportError::MissingExportDate)));

        let bad_date = json!({"version": 2, "coins": 999, "exportDate": "yesterday"}).to_string();
        assert!(matches!(store.import_progress(&bad_date), Err(ImportError::InvalidExportDate(_))));

        let bad_shape = json!({"coins": "lots", "exportDate": "2026-01-01T00:00:00Z"}).to_string();
        assert!(matches!(store.import_progress(&bad_shape), Err(ImportError::InvalidState(_))));

        assert!(matches!(store.import_progress("]["), Err(ImportError::Json(_))));
        assert_eq!(store.state(), &before);
    }
}
