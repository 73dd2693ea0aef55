// ============================================
// src/quiz.rs
// 出題 (重み付きランダム) と回答の記録
// ============================================

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::mastery::{self, AnswerOutcome, CharacterProgress, Domain, STAR_THRESHOLD};
use crate::settings::Settings;
use crate::storage::Storage;
use crate::store::ProgressStore;
use crate::word_level::{self, WordOutcome};

/// 選択肢の数
pub const CHOICE_COUNT: usize = 4;

/// クイズの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum QuizMode {
    /// ローマ字を見て、かなを選ぶ
    Kana,
    /// かなを見て、ローマ字を選ぶ
    Reverse,
    /// 漢字を見て、意味を選ぶ
    Meaning,
    /// 意味を見て、漢字を選ぶ
    KanjiReverse,
    /// 漢字を見て、音読みを選ぶ
    Onyomi,
    /// 漢字を見て、訓読みを選ぶ
    Kunyomi,
    /// 単語を見て、意味を選ぶ
    Words,
}

impl QuizMode {
    /// 文字のクイズなら (種類, クイズ種別名)
    pub fn character_quiz(self) -> Option<(Domain, &'static str)> {
        match self {
            QuizMode::Kana => Some((Domain::Kana, "kana")),
            QuizMode::Reverse => Some((Domain::Kana, "reverse")),
            QuizMode::Meaning => Some((Domain::Kanji, "meaning")),
            QuizMode::KanjiReverse => Some((Domain::Kanji, "reverse")),
            QuizMode::Onyomi => Some((Domain::Kanji, "onyomi")),
            QuizMode::Kunyomi => Some((Domain::Kanji, "kunyomi")),
            QuizMode::Words => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            QuizMode::Kana => "かな",
            QuizMode::Reverse => "かな → ローマ字",
            QuizMode::Meaning => "漢字の意味",
            QuizMode::KanjiReverse => "意味 → 漢字",
            QuizMode::Onyomi => "音読み",
            QuizMode::Kunyomi => "訓読み",
            QuizMode::Words => "単語",
        }
    }
}

/// 何についての問題か
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Character {
        domain: Domain,
        character: &'static str,
        quiz_type: &'static str,
    },
    Word(&'static str),
}

#[derive(Debug, Clone)]
pub struct Question {
    pub prompt: String,
    /// 読みがななど (単語クイズのみ)
    pub hint: Option<String>,
    pub choices: Vec<String>,
    /// 正解の選択肢の位置
    pub answer: usize,
    pub target: Target,
}

/// 出題候補
struct Candidate {
    target: Target,
    prompt: &'static str,
    hint: Option<&'static str>,
    answer: &'static str,
    weight: f64,
}

fn candidates<S: Storage>(store: &ProgressStore<S>, settings: &Settings, mode: QuizMode) -> Vec<Candidate> {
    let catalog = *store.catalog();

    let Some((domain, quiz_type)) = mode.character_quiz() else {
        let unlocked = store.state().unlocked_packs.iter().map(String::as_str);
        return catalog
            .words_with_packs(unlocked)
            .into_iter()
            .map(|w| Candidate {
                target: Target::Word(w.word),
                prompt: w.word,
                hint: Some(w.reading),
                answer: w.meaning,
                weight: word_level::word_selection_weight(store.word(w.word).level),
            })
            .collect();
    };

    let weight = |character: &str| match store.character(domain, character) {
        Some(progress) => mastery::selection_weight(progress, quiz_type),
        None => mastery::selection_weight(&CharacterProgress::new(domain), quiz_type),
    };
    let target = |character: &'static str| Target::Character {
        domain,
        character,
        quiz_type,
    };

    match mode {
        QuizMode::Kana | QuizMode::Reverse => catalog
            .kana_in(&settings.enabled_sets)
            .into_iter()
            .map(|k| {
                let (prompt, answer) = if mode == QuizMode::Kana {
                    (k.romaji, k.character)
                } else {
                    (k.character, k.romaji)
                };
                Candidate {
                    target: target(k.character),
                    prompt,
                    hint: None,
                    answer,
                    weight: weight(k.character),
                }
            })
            .collect(),
        _ => catalog
            .kanji
            .iter()
            .map(|k| {
                let (prompt, answer) = match mode {
                    QuizMode::Meaning => (k.character, k.meaning),
                    QuizMode::KanjiReverse => (k.meaning, k.character),
                    QuizMode::Onyomi => (k.character, k.onyomi),
                    _ => (k.character, k.kunyomi),
                };
                Candidate {
                    target: target(k.character),
                    prompt,
                    hint: None,
                    answer,
                    weight: weight(k.character),
                }
            })
            .collect(),
    }
}

/// 次の問題を作る。候補がなければ `None`
pub fn next_question<S: Storage, R: Rng + ?Sized>(
    store: &ProgressStore<S>,
    settings: &Settings,
    mode: QuizMode,
    rng: &mut R,
) -> Option<Question> {
    let pool = candidates(store, settings, mode);
    let picked = pool.choose_weighted(rng, |c| c.weight).ok()?;

    // 同じ答え・同じ問題文の候補は選択肢に入れない
    let mut others: Vec<&str> = pool
        .iter()
        .filter(|c| c.answer != picked.answer && c.prompt != picked.prompt)
        .map(|c| c.answer)
        .collect();
    others.sort_unstable();
    others.dedup();

    let mut choices: Vec<String> = others
        .choose_multiple(rng, CHOICE_COUNT - 1)
        .map(|s| s.to_string())
        .collect();
    choices.push(picked.answer.to_string());
    choices.shuffle(rng);
    let answer = choices.iter().position(|c| c == picked.answer)?;

    Some(Question {
        prompt: picked.prompt.to_string(),
        hint: picked.hint.map(str::to_string),
        choices,
        answer,
        target: picked.target,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerResult {
    Character(AnswerOutcome),
    Word(WordOutcome),
}

/// 回答後のフィードバック
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub correct: bool,
    /// 正解の選択肢
    pub answer: String,
    pub result: AnswerResult,
}

impl Feedback {
    pub fn coins(&self) -> u32 {
        match self.result {
            AnswerResult::Character(outcome) => outcome.coins(),
            AnswerResult::Word(outcome) => outcome.coins(),
        }
    }

    pub fn message(&self) -> String {
        let miss = format!("不正解… 正解は「{}」", self.answer);
        match self.result {
            AnswerResult::Character(outcome) => match outcome {
                AnswerOutcome::StarEarned { coins } => format!("⭐ スター獲得！ +{coins}コイン"),
                AnswerOutcome::Streak { count } => format!("正解！ 連続 {count}/{STAR_THRESHOLD}"),
                AnswerOutcome::AlreadyEarned => "正解！ (⭐ 獲得済み)".to_string(),
                AnswerOutcome::StreakLost { lost } => format!("{miss} (連続 {lost} が途切れました)"),
                AnswerOutcome::Missed => miss,
            },
            AnswerResult::Word(outcome) => match outcome {
                WordOutcome::LeveledUp { level } if self.coins() > 0 => {
                    format!("🎉 マスター！ Lv.{level} +{}コイン", self.coins())
                }
                WordOutcome::LeveledUp { level } => format!("レベルアップ！ Lv.{level}"),
                WordOutcome::Streak { count, needed } => {
                    format!("正解！ 次のレベルまで {count}/{needed}")
                }
                WordOutcome::Mastered => "正解！ (マスター済み)".to_string(),
                WordOutcome::LeveledDown { level } => format!("{miss} (Lv.{level} に下がりました)"),
                WordOutcome::Missed => miss,
            },
        }
    }
}

/// 選んだ選択肢を記録する
pub fn submit<S: Storage>(store: &mut ProgressStore<S>, question: &Question, choice: usize) -> Feedback {
    let correct = choice == question.answer;
    let result = match question.target {
        Target::Character {
            domain,
            character,
            quiz_type,
        } => AnswerResult::Character(store.record_answer(domain, character, quiz_type, correct)),
        Target::Word(word) => AnswerResult::Word(store.record_word_answer(word, correct)),
    };
    Feedback {
        correct,
        answer: question.choices[question.answer].clone(),
        result,
    }
}
