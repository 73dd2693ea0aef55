// ============================================
// src/word_level.rs
// 単語のレベル (0〜5) を管理するロジック
// ============================================

use serde::{Deserialize, Serialize};

/// 最高レベル (これ以上は上がらない)
pub const MAX_LEVEL: u32 = 5;
/// 最高レベルに到達したときのコイン報酬
pub const MASTERY_COIN_REWARD: u32 = 10;

/// レベルごとの、次のレベルに上がるのに必要な連続正解数
const LEVEL_UP_THRESHOLDS: [u32; MAX_LEVEL as usize] = [2, 3, 4, 5, 6];

/// レベルごとの出題の重み
const LEVEL_WEIGHTS: [f64; MAX_LEVEL as usize + 1] = [3.0, 2.5, 2.0, 1.5, 1.0, 0.3];

/// 1単語ぶんの記録
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordProgress {
    pub level: u32,
    pub consecutive_correct: u32,
    pub total_correct: u32,
    pub total_attempts: u32,
}

impl WordProgress {
    pub fn is_mastered(&self) -> bool {
        self.level >= MAX_LEVEL
    }
}

/// 単語の回答結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOutcome {
    /// すでに最高レベル
    Mastered,
    /// 連続正解が伸びた (まだレベルアップしない)
    Streak { count: u32, needed: u32 },
    LeveledUp { level: u32 },
    LeveledDown { level: u32 },
    /// 不正解だがレベル0なので下がらない
    Missed,
}

impl WordOutcome {
    pub fn coins(self) -> u32 {
        match self {
            WordOutcome::LeveledUp { level } if level == MAX_LEVEL => MASTERY_COIN_REWARD,
            _ => 0,
        }
    }
}

/// `level` から次のレベルへの必要連続正解数。最高レベルなら `None`
pub fn level_up_threshold(level: u32) -> Option<u32> {
    LEVEL_UP_THRESHOLDS.get(level as usize).copied()
}

/// 回答を記録して、新しい記録と結果を返す
pub fn record_word_answer(progress: &WordProgress, is_correct: bool) -> (WordProgress, WordOutcome) {
    let mut next = *progress;
    next.total_attempts = next.total_attempts.saturating_add(1);

    if !is_correct {
        next.consecutive_correct = 0;
        if next.level > 0 {
            next.level -= 1;
            return (next, WordOutcome::LeveledDown { level: next.level });
        }
        return (next, WordOutcome::Missed);
    }

    next.total_correct = next.total_correct.saturating_add(1);
    let Some(needed) = level_up_threshold(next.level) else {
        return (next, WordOutcome::Mastered);
    };

    next.consecutive_correct = next.consecutive_correct.saturating_add(1);
    if next.consecutive_correct >= needed {
        next.level += 1;
        next.consecutive_correct = 0;
        (next, WordOutcome::LeveledUp { level: next.level })
    } else {
        let count = next.consecutive_correct;
        (next, WordOutcome::Streak { count, needed })
    }
}

/// レベルごとの出題の重み
pub fn word_selection_weight(level: u32) -> f64 {
    LEVEL_WEIGHTS[level.min(MAX_LEVEL) as usize]
}
