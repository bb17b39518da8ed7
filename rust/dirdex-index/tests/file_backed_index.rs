use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use dirdex_common::Cursor;
use dirdex_index::{IndexConfig, IndexTable, StringMarshaller, is_not_redirect};
use dirdex_testkit::data_gen;

type StringIndex = IndexTable<String, StringMarshaller>;

fn open(dir: &Path, attribute: &str, duplicate_limit: usize) -> anyhow::Result<StringIndex> {
    let config = IndexConfig::new(attribute)
        .with_working_directory(dir)
        .with_duplicate_limit(duplicate_limit)
        .with_cache_size(4);
    Ok(IndexTable::open(config, StringMarshaller)?)
}

fn ids(index: &mut StringIndex, value: &str) -> anyhow::Result<Vec<u64>> {
    let mut cursor = index.lookup(&value.to_string())?;
    Ok(cursor.iter().collect::<dirdex_common::Result<Vec<_>>>()?)
}

fn expected_postings(
    entries: &[data_gen::SampleEntry],
    attribute: &str,
) -> BTreeMap<String, BTreeSet<u64>> {
    let mut postings: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
    for entry in entries {
        for value in entry.values(attribute) {
            postings.entry(value.clone()).or_default().insert(entry.id);
        }
    }
    postings
}

#[test]
fn test_sample_entries_survive_reopen() -> anyhow::Result<()> {
    let entries = data_gen::load_sample_entries()?;
    let scratch = dirdex_testkit::dirs::scratch_dir("dirdex-index-")?;

    for attribute in ["objectClass", "ou", "l"] {
        let mut index = open(scratch.path(), attribute, 4)?;
        for entry in &entries {
            for value in entry.values(attribute) {
                index.add(value, entry.id)?;
            }
        }
        index.close()?;
    }
    assert!(scratch.path().join("ou").join("forward.tbl").is_file());

    for attribute in ["objectClass", "ou", "l"] {
        let postings = expected_postings(&entries, attribute);
        let mut index = open(scratch.path(), attribute, 4)?;
        let total: usize = postings.values().map(BTreeSet::len).sum();
        assert_eq!(index.count(), total as u64, "{attribute}");

        for (value, expected) in &postings {
            assert_eq!(ids(&mut index, value)?, expected.iter().copied().collect::<Vec<_>>());
            let slot = index
                .raw_forward_slot(value)?
                .expect("indexed value has a slot");
            assert_eq!(!is_not_redirect(Some(&slot)), expected.len() > 4, "{value}");
        }
        for entry in &entries {
            let values = entry.values(attribute);
            match values.iter().min() {
                Some(smallest) => assert_eq!(&index.reverse_lookup(entry.id)?, smallest),
                None => assert!(index.reverse_lookup(entry.id).unwrap_err().is_not_found()),
            }
        }
        index.close()?;
    }
    Ok(())
}

#[test]
fn test_skewed_workload_with_removals() -> anyhow::Result<()> {
    let scratch = dirdex_testkit::dirs::scratch_dir("dirdex-index-")?;
    let entry_ids = data_gen::shuffled_ids(3000, 11);
    let values = data_gen::vocabulary("dept", 40);
    let pairs = data_gen::skewed_pairs(&entry_ids, &values, 12);

    let mut model: BTreeMap<String, BTreeSet<u64>> = BTreeMap::new();
    {
        let mut index = open(scratch.path(), "department", 16)?;
        for (value, id) in &pairs {
            index.add(value, *id)?;
            model.entry(value.clone()).or_default().insert(*id);
        }
        index.sync()?;
        // Every third entry leaves the directory.
        for id in entry_ids.iter().copied().filter(|id| id % 3 == 0) {
            assert_eq!(index.drop_entry(id)?, 1);
            for ids in model.values_mut() {
                ids.remove(&id);
            }
        }
        index.close()?;
    }

    let mut index = open(scratch.path(), "department", 16)?;
    let total: usize = model.values().map(BTreeSet::len).sum();
    assert_eq!(index.count(), total as u64);
    for value in &values {
        let expected = model
            .get(value)
            .map(|ids| ids.iter().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        assert_eq!(ids(&mut index, value)?, expected, "{value}");
        assert_eq!(index.count_of(value)?, expected.len());
    }
    let entries = index.entries()?;
    assert_eq!(entries.len(), total);
    assert!(entries.windows(2).all(|w| (&w[0].value, w[0].id) < (&w[1].value, w[1].id)));
    Ok(())
}
