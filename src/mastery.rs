// ============================================
// src/mastery.rs
// 文字ごと・クイズ種別ごとのスター（習得）判定ロジック
// ============================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// スター獲得に必要な連続正解数
pub const STAR_THRESHOLD: u32 = 20;
/// スター獲得時のコイン報酬
pub const STAR_COIN_REWARD: u32 = 20;

/// かなのクイズ種別
pub const KANA_QUIZ_TYPES: &[&str] = &["kana", "reverse", "handwriting"];
/// 漢字のクイズ種別
pub const KANJI_QUIZ_TYPES: &[&str] = &["meaning", "reverse", "onyomi", "kunyomi"];

/// 文字の種類（かな / 漢字）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Kana,
    Kanji,
}

impl Domain {
    /// この種類で使われるクイズ種別の一覧
    pub fn quiz_types(self) -> &'static [&'static str] {
        match self {
            Domain::Kana => KANA_QUIZ_TYPES,
            Domain::Kanji => KANJI_QUIZ_TYPES,
        }
    }
}

/// 1つの (文字, クイズ種別) の記録
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizTypeProgress {
    pub consecutive_correct: u32,
    pub earned: bool,
    pub total_correct: u32,
    pub total_attempts: u32,
}

/// 1文字ぶんの記録 (クイズ種別名 -> 記録)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterProgress(BTreeMap<String, QuizTypeProgress>);

impl CharacterProgress {
    /// すべてのクイズ種別を初期値で埋めた記録を作る
    pub fn new(domain: Domain) -> Self {
        Self(
            domain
                .quiz_types()
                .iter()
                .map(|t| (t.to_string(), QuizTypeProgress::default()))
                .collect(),
        )
    }

    /// 記録がなければ初期値を返す
    pub fn get(&self, quiz_type: &str) -> QuizTypeProgress {
        self.0.get(quiz_type).copied().unwrap_or_default()
    }

    pub fn is_earned(&self, quiz_type: &str) -> bool {
        self.get(quiz_type).earned
    }
}

/// 1回の回答結果 (UI のフィードバック用)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// 正解したが、すでにスター獲得済み
    AlreadyEarned,
    /// 連続正解が伸びた
    Streak { count: u32 },
    /// スターを獲得した
    StarEarned { coins: u32 },
    /// 不正解で連続正解が途切れた
    StreakLost { lost: u32 },
    /// 不正解 (途切れる連続正解はなかった)
    Missed,
}

impl AnswerOutcome {
    pub fn coins(self) -> u32 {
        match self {
            AnswerOutcome::StarEarned { coins } => coins,
            _ => 0,
        }
    }
}

/// 回答を記録して、新しい記録と結果を返す
pub fn record_answer(
    progress: &CharacterProgress,
    quiz_type: &str,
    is_correct: bool,
) -> (CharacterProgress, AnswerOutcome) {
    let mut current = progress.get(quiz_type);
    current.total_attempts = current.total_attempts.saturating_add(1);

    let outcome = if is_correct {
        current.total_correct = current.total_correct.saturating_add(1);
        if current.earned {
            AnswerOutcome::AlreadyEarned
        } else {
            current.consecutive_correct = current.consecutive_correct.saturating_add(1);
            if current.consecutive_correct >= STAR_THRESHOLD {
                current.earned = true;
                current.consecutive_correct = 0;
                AnswerOutcome::StarEarned {
                    coins: STAR_COIN_REWARD,
                }
            } else {
                AnswerOutcome::Streak {
                    count: current.consecutive_correct,
                }
            }
        }
    } else {
        let lost = current.consecutive_correct;
        current.consecutive_correct = 0;
        if lost > 0 {
            AnswerOutcome::StreakLost { lost }
        } else {
            AnswerOutcome::Missed
        }
    };

    let mut updated = progress.clone();
    updated.0.insert(quiz_type.to_string(), current);
    (updated, outcome)
}

/// 出題の重み (確率ではなく相対的な偏り)
pub fn selection_weight(progress: &CharacterProgress, quiz_type: &str) -> f64 {
    let p = progress.get(quiz_type);
    if p.total_attempts == 0 {
        3.0 // 未出題を優先
    } else if p.earned {
        0.3 // 習得済みもたまに復習
    } else if p.consecutive_correct > 0 {
        1.5
    } else {
        2.0
    }
}
