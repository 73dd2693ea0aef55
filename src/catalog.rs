/*
 * src/catalog.rs
 * 出題データ (かな・漢字・単語・単語パック) を管理するモジュール
 */

/// かな1文字
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Kana {
    pub character: &'static str,
    pub romaji: &'static str,
    pub set: KanaSet,
}

/// かなの文字セット
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KanaSet {
    Hiragana,
    Katakana,
}

/// 漢字1文字
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Kanji {
    pub character: &'static str,
    pub meaning: &'static str,
    pub onyomi: &'static str,
    pub kunyomi: &'static str,
}

/// 単語
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Word {
    pub word: &'static str,
    pub reading: &'static str,
    pub meaning: &'static str,
}

/// コインで買える単語パック
#[derive(Debug, Copy, Clone)]
pub struct Pack {
    pub id: &'static str,
    pub name: &'static str,
    pub price: u32,
    pub words: &'static [Word],
}

/// 出題データ一式
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    pub kana: &'static [Kana],
    pub kanji: &'static [Kanji],
    pub words: &'static [Word],
    pub packs: &'static [Pack],
}

impl Catalog {
    /// 組み込みのデータ
    pub fn builtin() -> Self {
        Self {
            kana: KANA_LIST,
            kanji: KANJI_LIST,
            words: WORD_LIST,
            packs: PACK_LIST,
        }
    }

    pub fn kana_in(&self, sets: &[KanaSet]) -> Vec<&'static Kana> {
        self.kana.iter().filter(|k| sets.contains(&k.set)).collect()
    }

    pub fn is_kana(&self, character: &str) -> bool {
        self.kana.iter().any(|k| k.character == character)
    }

    pub fn pack(&self, id: &str) -> Option<&'static Pack> {
        self.packs.iter().find(|p| p.id == id)
    }

    /// 基本の単語 + 解放済みパックの単語
    pub fn words_with_packs<'a>(&self, unlocked: impl IntoIterator<Item = &'a str>) -> Vec<&'static Word> {
        let mut words: Vec<&'static Word> = self.words.iter().collect();
        for id in unlocked {
            if let Some(pack) = self.pack(id) {
                words.extend(pack.words.iter());
            }
        }
        words
    }
}

macro_rules! kana {
    ($set:ident; $($ch:literal => $ro:literal),* $(,)?) => {
        &[$(Kana { character: $ch, romaji: $ro, set: KanaSet::$set }),*]
    };
}

const HIRAGANA: &[Kana] = kana![Hiragana;
    "あ" => "a", "い" => "i", "う" => "u", "え" => "e", "お" => "o",
    "か" => "ka", "き" => "ki", "く" => "ku", "け" => "ke", "こ" => "ko",
    "さ" => "sa", "し" => "shi", "す" => "su", "せ" => "se", "そ" => "so",
    "た" => "ta", "ち" => "chi", "つ" => "tsu", "て" => "te", "と" => "to",
    "な" => "na", "に" => "ni", "ぬ" => "nu", "ね" => "ne", "の" => "no",
    "は" => "ha", "ひ" => "hi", "ふ" => "fu", "へ" => "he", "ほ" => "ho",
    "ま" => "ma", "み" => "mi", "む" => "mu", "め" => "me", "も" => "mo",
    "や" => "ya", "ゆ" => "yu", "よ" => "yo",
    "ら" => "ra", "り" => "ri", "る" => "ru", "れ" => "re", "ろ" => "ro",
    "わ" => "wa", "を" => "wo", "ん" => "n",
];

const KATAKANA: &[Kana] = kana![Katakana;
    "ア" => "a", "イ" => "i", "ウ" => "u", "エ" => "e", "オ" => "o",
    "カ" => "ka", "キ" => "ki", "ク" => "ku", "ケ" => "ke", "コ" => "ko",
    "サ" => "sa", "シ" => "shi", "ス" => "su", "セ" => "se", "ソ" => "so",
    "タ" => "ta", "チ" => "chi", "ツ" => "tsu", "テ" => "te", "ト" => "to",
    "ナ" => "na", "ニ" => "ni", "ヌ" => "nu", "ネ" => "ne", "ノ" => "no",
    "ハ" => "ha", "ヒ" => "hi", "フ" => "fu", "ヘ" => "he", "ホ" => "ho",
    "マ" => "ma", "ミ" => "mi", "ム" => "mu", "メ" => "me", "モ" => "mo",
    "ヤ" => "ya", "ユ" => "yu", "ヨ" => "yo",
    "ラ" => "ra", "リ" => "ri", "ル" => "ru", "レ" => "re", "ロ" => "ro",
    "ワ" => "wa", "ヲ" => "wo", "ン" => "n",
];

/// かな一覧 (ひらがな → カタカナ)
pub const KANA_LIST: &[Kana] = &{
    let mut out = [HIRAGANA[0]; HIRAGANA.len() + KATAKANA.len()];
    let mut i = 0;
    while i < HIRAGANA.len() {
        out[i] = HIRAGANA[i];
        i += 1;
    }
    let mut j = 0;
    while j < KATAKANA.len() {
        out[HIRAGANA.len() + j] = KATAKANA[j];
        j += 1;
    }
    out
};

/// 漢字一覧
pub const KANJI_LIST: &[Kanji] = &[
    Kanji { character: "日", meaning: "day, sun", onyomi: "ニチ", kunyomi: "ひ" },
    Kanji { character: "月", meaning: "month, moon", onyomi: "ゲツ", kunyomi: "つき" },
    Kanji { character: "火", meaning: "fire", onyomi: "カ", kunyomi: "ひ" },
    Kanji { character: "水", meaning: "water", onyomi: "スイ", kunyomi: "みず" },
    Kanji { character: "木", meaning: "tree", onyomi: "モク", kunyomi: "き" },
    Kanji { character: "金", meaning: "gold, money", onyomi: "キン", kunyomi: "かね" },
    Kanji { character: "土", meaning: "earth", onyomi: "ド", kunyomi: "つち" },
    Kanji { character: "山", meaning: "mountain", onyomi: "サン", kunyomi: "やま" },
    Kanji { character: "川", meaning: "river", onyomi: "セン", kunyomi: "かわ" },
    Kanji { character: "人", meaning: "person", onyomi: "ジン", kunyomi: "ひと" },
    Kanji { character: "口", meaning: "mouth", onyomi: "コウ", kunyomi: "くち" },
    Kanji { character: "目", meaning: "eye", onyomi: "モク", kunyomi: "め" },
    Kanji { character: "手", meaning: "hand", onyomi: "シュ", kunyomi: "て" },
    Kanji { character: "大", meaning: "big", onyomi: "ダイ", kunyomi: "おお" },
    Kanji { character: "小", meaning: "small", onyomi: "ショウ", kunyomi: "ちい" },
    Kanji { character: "空", meaning: "sky", onyomi: "クウ", kunyomi: "そら" },
];

/// 基本の単語
pub const WORD_LIST: &[Word] = &[
    Word { word: "猫", reading: "ねこ", meaning: "cat" },
    Word { word: "犬", reading: "いぬ", meaning: "dog" },
    Word { word: "空", reading: "そら", meaning: "sky" },
    Word { word: "海", reading: "うみ", meaning: "sea" },
    Word { word: "山", reading: "やま", meaning: "mountain" },
    Word { word: "川", reading: "かわ", meaning: "river" },
    Word { word: "車", reading: "くるま", meaning: "car" },
    Word { word: "電話", reading: "でんわ", meaning: "telephone" },
    Word { word: "時計", reading: "とけい", meaning: "clock" },
    Word { word: "図書館", reading: "としょかん", meaning: "library" },
    Word { word: "新幹線", reading: "しんかんせん", meaning: "bullet train" },
    Word { word: "水", reading: "みず", meaning: "water" },
];

/// 単語パック
pub const PACK_LIST: &[Pack] = &[
    Pack {
        id: "food",
        name: "たべもの",
        price: 40,
        words: &[
            Word { word: "林檎", reading: "りんご", meaning: "apple" },
            Word { word: "蜜柑", reading: "みかん", meaning: "mandarin orange" },
            Word { word: "ご飯", reading: "ごはん", meaning: "rice, meal" },
            Word { word: "魚", reading: "さかな", meaning: "fish" },
            Word { word: "卵", reading: "たまご", meaning: "egg" },
            Word { word: "お茶", reading: "おちゃ", meaning: "green tea" },
        ],
    },
    Pack {
        id: "travel",
        name: "りょこう",
        price: 80,
        words: &[
            Word { word: "飛行機", reading: "ひこうき", meaning: "airplane" },
            Word { word: "駅", reading: "えき", meaning: "station" },
            Word { word: "切符", reading: "きっぷ", meaning: "ticket" },
            Word { word: "水族館", reading: "すいぞくかん", meaning: "aquarium" },
            Word { word: "遊園地", reading: "ゆうえんち", meaning: "amusement park" },
            Word { word: "駐車場", reading: "ちゅうしゃじょう", meaning: "parking lot" },
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn kana_list_has_both_sets() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.kana.len(), 92);
        assert_eq!(catalog.kana_in(&[KanaSet::Hiragana]).len(), 46);
        assert_eq!(catalog.kana_in(&[KanaSet::Katakana])[0].character, "ア");
    }

    #[test]
    fn characters_are_unique() {
        let catalog = Catalog::builtin();
        let kana: HashSet<_> = catalog.kana.iter().map(|k| k.character).collect();
        assert_eq!(kana.len(), catalog.kana.len());
        let kanji: HashSet<_> = catalog.kanji.iter().map(|k| k.character).collect();
        assert_eq!(kanji.len(), catalog.kanji.len());
    }

    #[test]
    fn only_listed_kana_count_as_kana() {
        let catalog = Catalog::builtin();
        assert!(catalog.is_kana("あ"));
        assert!(catalog.is_kana("ン"));
        assert!(!catalog.is_kana("日"));
        assert!(!catalog.is_kana("a"));
        assert!(!catalog.is_kana(""));
    }

    #[test]
    fn unlocked_packs_add_words() {
        let catalog = Catalog::builtin();
        let base = catalog.words_with_packs([]).len();
        let with_food = catalog.words_with_packs(["food", "unknown"]);
        assert_eq!(with_food.len(), base + 6);
        assert!(with_food.iter().any(|w| w.word == "卵"));
    }
}
