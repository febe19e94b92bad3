//! End-to-end turns: raw lorebook JSON through the importer and engine.

use serde_json::json;
use worldbook_core::{
    Book, EngineOptions, Importer, Position, ScanContext, WorldBookEngine,
};

fn engine() -> WorldBookEngine {
    WorldBookEngine::new(EngineOptions::default().with_seed(7))
}

#[test]
fn test_constant_outranks_higher_priority_match() {
    let book = Importer::import(&json!({"entries": [
        {"id": "e1", "keys": ["海南"], "priority": 50, "content": "海南是热带岛屿。"},
        {"id": "e2", "constant": true, "priority": 10, "content": "世界观：现代。"}
    ]}));

    let result = engine().process(&book, "我想去海南玩");

    assert!(result.is_activated("e1"));
    assert!(result.is_activated("e2"));
    let e1 = result.get("e1").expect("e1 active");
    let e2 = result.get("e2").expect("e2 active");
    assert!(e2.activation_score > e1.activation_score);
    assert_eq!(result.activated_ids()[0], "e2");
}

#[test]
fn test_english_key_matches_cjk_text() {
    let book = Importer::import(&json!([
        {"id": "trip", "keys": ["travel"], "content": "Passports are checked at the border."}
    ]));

    let result = engine().process(&book, "下个月我们去旅行");
    assert_eq!(result.activated_ids(), vec!["trip"]);
}

#[test]
fn test_and_entry_with_expanded_synonyms() {
    let book = Importer::import(&json!([
        {"id": "trip", "keys": ["travel"], "selectiveLogic": "AND",
         "content": "Passports are checked at the border."}
    ]));

    let mut engine = engine();
    assert_eq!(engine.process(&book, "we travel tomorrow").activated_ids(), vec!["trip"]);
    assert_eq!(engine.process(&book, "下个月我们去旅行").activated_ids(), vec!["trip"]);
}

#[test]
fn test_cjk_key_ignores_whole_word_setting() {
    let book = Importer::import(&json!([
        {"id": "t", "keys": ["测试"], "matchWholeWords": true, "content": "Testing lore."}
    ]));
    let mut options = EngineOptions::default().with_seed(1);
    options.match_whole_words = true;

    let result = WorldBookEngine::new(options).process(&book, "这是一个测试句子");
    assert!(result.is_activated("t"));
}

#[test]
fn test_sticky_then_cooldown_across_turns() {
    let book = Importer::import(&json!([
        {"id": "storm", "keys": ["storm"], "sticky": 2, "cooldown": 2, "content": "Thunder rolls."}
    ]));
    let mut engine = engine();

    let turns: Vec<bool> = ["a storm is coming", "calm", "calm", "storm again", "storm again", "storm again"]
        .iter()
        .map(|text| engine.process(&book, *text).is_activated("storm"))
        .collect();

    // active, held, held, cooling, cooling, active
    assert_eq!(turns, vec![true, true, true, false, false, true]);
}

#[test]
fn test_sticky_overrides_zero_probability() {
    let mut book = Importer::import(&json!([
        {"id": "omen", "keys": ["raven"], "sticky": 3, "probability": 100, "content": "A dark omen."}
    ]));
    let mut engine = engine();
    assert!(engine.process(&book, "a raven lands").is_activated("omen"));

    book.entries[0].probability = Some(0.0);
    for _ in 0..3 {
        let result = engine.process(&book, "a raven lands");
        assert!(result.is_activated("omen"));
        assert!(result.get("omen").is_some_and(|a| a.is_sticky_held()));
    }
    assert!(!engine.process(&book, "a raven lands").is_activated("omen"));
}

#[test]
fn test_delay_counts_chat_history() {
    let book = Importer::import(&json!([
        {"id": "late", "keys": ["door"], "delay": 2, "content": "The door was always locked."}
    ]));
    let mut engine = engine();

    let early = ScanContext::new("the door").with_history(["hello"]);
    assert!(!engine.process(&book, early).is_activated("late"));

    let later = ScanContext::new("the door").with_history(["hello", "again"]);
    assert!(engine.process(&book, later).is_activated("late"));
}

#[test]
fn test_prompt_follows_slot_order() {
    let book = Importer::import(&json!([
        {"id": "tail", "constant": true, "position": "after_an", "content": "TAIL"},
        {"id": "head", "constant": true, "position": 2, "content": "HEAD"},
        {"id": "mid", "constant": true, "position": "top", "content": "MID"}
    ]));

    let result = engine().process(&book, "");
    let positions: Vec<&Position> = result.slots.iter().map(|s| &s.position).collect();
    assert_eq!(positions, vec![&Position::BeforeAn, &Position::BeforeChar, &Position::AfterAn]);
    assert_eq!(result.to_prompt_string(), "HEAD\n\nMID\n\nTAIL");
}

#[test]
fn test_book_settings_override_engine() {
    let book = Importer::import(&json!({
        "settings": {"tokenBudget": 10, "contextPercent": 1.0},
        "entries": [
            {"id": "big", "constant": true, "priority": 5, "content": "x".repeat(60)},
            {"id": "small", "constant": true, "content": "tiny"}
        ]
    }));

    let result = engine().process(&book, "");
    assert_eq!(result.activated_ids(), vec!["small"]);
    assert!(result.total_tokens <= 10);
}

#[test]
fn test_reset_forgets_timers() {
    let book = Importer::import(&json!([
        {"id": "c", "keys": ["bell"], "cooldown": 5, "content": "The bell tolls."}
    ]));
    let mut engine = engine();

    assert!(engine.process(&book, "bell").is_activated("c"));
    assert!(!engine.process(&book, "bell").is_activated("c"));

    let before = engine.session_id();
    engine.reset();
    assert_ne!(engine.session_id(), before);
    assert!(engine.process(&book, "bell").is_activated("c"));
}

#[test]
fn test_empty_book() {
    let result = engine().process(&Book::new(), "anything");
    assert!(result.activated_entries.is_empty());
    assert!(result.slots.is_empty());
    assert_eq!(result.total_tokens, 0);
}
