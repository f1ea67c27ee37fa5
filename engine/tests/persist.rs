use std::fs;
use std::path::PathBuf;

use nexus_engine::persist::{CharacterStore, JsonDirStore, MemoryStore, PersistError, rankings};
use nexus_engine::{Character, CharacterSheet, GameData, Stats};

fn named(name: &str, stat: i32) -> Character {
    Character::new(name, CharacterSheet::plain("Elves", "Archery", Stats::uniform(stat)), GameData::builtin())
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("nexus-store-{}-{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn memory_store_last_write_wins() {
    let mut store = MemoryStore::new();
    assert_eq!(store.load("a").expect("load"), None);

    let mut c = named("Ayla", 40);
    store.save("a", &c).expect("save");
    c.xp = 55;
    store.save("a", &c).expect("save");

    assert_eq!(store.load("a").expect("load").map(|c| c.xp), Some(55));
    assert_eq!(store.list_all().expect("list").len(), 1);
}

#[test]
fn json_dir_store_round_trips_characters() {
    let dir = scratch_dir("roundtrip");
    let mut store = JsonDirStore::new(dir.clone());
    assert!(store.list_all().expect("empty root").is_empty());

    let c = named("Ayla", 45);
    store.save("ayla", &c).expect("save");
    assert!(dir.join("ayla.json").exists());
    assert_eq!(store.load("ayla").expect("load"), Some(c));
    assert_eq!(store.load("nobody").expect("load"), None);

    fs::write(dir.join("broken.json"), "{ not json").expect("write");
    fs::write(dir.join("notes.txt"), "ignored").expect("write");
    let all = store.list_all().expect("list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].0, "ayla");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn json_dir_store_rejects_path_like_ids() {
    let mut store = JsonDirStore::new(scratch_dir("ids"));
    let c = named("Ayla", 40);
    for bad in ["", ".", "..", "../escape", "a/b", "a\\b"] {
        assert!(matches!(store.save(bad, &c), Err(PersistError::InvalidId(_))), "id {:?}", bad);
    }
}

#[test]
fn rankings_sort_by_rating() {
    let mut store = MemoryStore::new();
    store.save("low", &named("Low", 20)).expect("save");
    store.save("high", &named("High", 80)).expect("save");
    store.save("mid", &named("Mid", 50)).expect("save");

    let order: Vec<String> = rankings(&store).expect("rank").into_iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec!["high", "mid", "low"]);
}
