//! English trigger words and their CJK synonyms.
//!
//! The importer appends synonyms to an entry's keys. The engine folds them
//! back into the word they came from when counting matched keys, so an
//! expanded key still counts once.

use std::collections::HashSet;

/// English word → CJK synonyms. Lookups are ASCII case-insensitive.
static SYNONYMS: &[(&str, &[&str])] = &[
    ("weather", &["天气", "气候", "下雨", "晴天"]),
    ("rain", &["雨", "下雨", "雨天"]),
    ("snow", &["雪", "下雪"]),
    ("travel", &["旅行", "旅游", "出行"]),
    ("trip", &["旅行", "出游"]),
    ("food", &["食物", "美食", "吃饭"]),
    ("eat", &["吃", "吃饭"]),
    ("drink", &["喝", "饮料"]),
    ("home", &["家", "回家"]),
    ("school", &["学校", "上学"]),
    ("work", &["工作", "上班"]),
    ("money", &["钱", "金钱"]),
    ("friend", &["朋友", "好友"]),
    ("family", &["家人", "家庭"]),
    ("love", &["爱", "喜欢", "爱情"]),
    ("music", &["音乐", "歌曲"]),
    ("movie", &["电影"]),
    ("game", &["游戏"]),
    ("sleep", &["睡觉", "休息"]),
    ("birthday", &["生日"]),
    ("hospital", &["医院", "看病"]),
    ("city", &["城市"]),
    ("beach", &["海滩", "沙滩", "海边"]),
    ("mountain", &["山", "爬山"]),
    ("cat", &["猫", "猫咪"]),
    ("dog", &["狗", "小狗"]),
];

/// CJK synonyms for an English word, or an empty slice.
pub fn synonyms_for(word: &str) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(english, _)| english.eq_ignore_ascii_case(word))
        .map(|(_, cjk)| *cjk)
        .unwrap_or(&[])
}

/// The key `key` stands for: the first other key in `keys` that lists it as
/// a synonym, or `key` itself.
pub fn concept_of<'a>(key: &'a str, keys: &'a [String]) -> &'a str {
    keys.iter()
        .map(String::as_str)
        .find(|other| *other != key && synonyms_for(other).iter().any(|s| *s == key))
        .unwrap_or(key)
}

/// Number of distinct concepts among `matched`, folding synonyms of `keys`
/// into their source word. Blank keys are ignored.
pub fn distinct_concepts<'a>(matched: impl IntoIterator<Item = &'a String>, keys: &'a [String]) -> usize {
    matched
        .into_iter()
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .map(|key| concept_of(key, keys))
        .collect::<HashSet<_>>()
        .len()
}
