//! Identifier minting across whole works

mod common;

use common::{generator, mint_work, ID_PATTERN};
use graphscribe::id::{self, BaseMode, IdError, IdGenerator, IdLevel, Identifier};
use std::collections::HashSet;

#[test]
fn ten_thousand_entities_are_unique_and_well_formed() {
    let shape = regex_lite::Regex::new(ID_PATTERN).unwrap();
    let mut ids = IdGenerator::new(BaseMode::Semantic);
    let work = ids.new_work_id("Kokoro", "corpus/kokoro.txt").unwrap();

    let mut seen = HashSet::new();
    for _ in 0..10_000 {
        let entity = ids.new_child_id(&work, IdLevel::Entity, None).unwrap();
        assert!(shape.is_match(entity.as_str()), "bad shape: {}", entity);
        assert!(seen.insert(entity.into_string()));
    }
    assert_eq!(seen.len(), 10_000);
    assert_eq!(ids.counters().counter(&work, IdLevel::Entity), 10_000);
}

#[test]
fn every_minted_id_parses_back() {
    let mut ids = generator();
    let minted = mint_work(&mut ids, "Kokoro", 3, 4);
    let shape = regex_lite::Regex::new(ID_PATTERN).unwrap();

    assert_eq!(id::hierarchy_level(minted.work.as_str()).unwrap(), 0);
    assert_eq!(id::hierarchy_level(minted.entity.as_str()).unwrap(), 2);
    for (i, (seg, sens)) in minted.segments.iter().enumerate() {
        assert!(shape.is_match(seg.as_str()));
        assert_eq!(id::hierarchy_level(seg.as_str()).unwrap(), 1);
        assert_eq!(id::ordinal(seg.as_str()).unwrap(), i as u32 + 1);
        for (j, sen) in sens.iter().enumerate() {
            let parsed = sen.parse().unwrap();
            assert_eq!(parsed.kind(), IdLevel::Sentence);
            assert_eq!(parsed.level(), 2);
            assert_eq!(parsed.ordinal(), Some(j as u32 + 1));
            assert_eq!(sen.work_base(), minted.work.work_base());
            let reparsed: Identifier = sen.as_str().parse().unwrap();
            assert_eq!(&reparsed, sen);
        }
    }
}

#[test]
fn lineage_holds_within_a_work_and_not_across() {
    let mut ids = generator();
    let kokoro = mint_work(&mut ids, "Kokoro", 2, 2);
    let botchan = mint_work(&mut ids, "Botchan", 2, 2);

    let (seg, sens) = &kokoro.segments[1];
    assert!(id::same_lineage(kokoro.work.as_str(), sens[1].as_str()));
    assert!(id::same_lineage(seg.as_str(), kokoro.entity.as_str()));
    assert!(!id::same_lineage(kokoro.work.as_str(), botchan.work.as_str()));
    assert!(!id::same_lineage(sens[0].as_str(), botchan.entity.as_str()));

    assert!(ids.same_lineage_strict(&sens[0], &kokoro.entity));
    assert!(!ids.same_lineage_strict(&sens[0], &botchan.entity));
}

#[test]
fn semantic_bases_are_stable_across_generators() {
    let a = generator().new_work_id("Kokoro", "corpus/kokoro.txt").unwrap();
    let b = IdGenerator::new(BaseMode::Semantic)
        .new_work_id("Kokoro", "corpus/kokoro.txt")
        .unwrap();
    assert_eq!(a.work_base(), b.work_base());
}

#[test]
fn remint_at_same_instant_is_a_collision() {
    let mut ids = generator();
    ids.new_work_id("Kokoro", "corpus/kokoro.txt").unwrap();
    assert!(matches!(
        ids.new_work_id("Kokoro", "corpus/kokoro.txt"),
        Err(IdError::Collision(_))
    ));
}

#[test]
fn children_only_under_permitted_parents() {
    let mut ids = generator();
    let minted = mint_work(&mut ids, "Kokoro", 1, 1);
    assert!(matches!(
        ids.new_child_id(&minted.entity, IdLevel::Tag, None),
        Err(IdError::InvalidParent { .. })
    ));
    assert!(matches!(
        ids.new_child_id(&minted.work, IdLevel::Sentence, None),
        Err(IdError::InvalidParent { .. })
    ));
}
