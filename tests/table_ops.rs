use std::collections::BTreeMap;

use bucketmap::{hash, Table};

proptest::proptest! {
    #[test]
    fn table_matches_model_after_inserts(entries in proptest::collection::vec(("[a-d]{1,6}", 0..10_000u32), 0..64)) {
        let mut model: BTreeMap<String, u32> = BTreeMap::new();
        let table = Table::new();

        for (name, salary) in entries.iter() {
            model.insert(name.clone(), *salary);
            table.insert(name, *salary);
        }

        // One record per distinct name, each holding the salary of its
        // most recent insert.
        assert_eq!(table.len(), model.len());
        for (name, salary) in model.iter() {
            let rec = table.search(name).expect("model record missing from table");
            assert_eq!(rec.salary, *salary);
            assert_eq!(rec.hash, hash::one_at_a_time(name));
        }
    }

    #[test]
    fn table_matches_model_with_deletes(ops in proptest::collection::vec((0..3u8, "[a-c]{1,4}", 0..1000u32), 0..128)) {
        let mut model: BTreeMap<String, u32> = BTreeMap::new();
        let table = Table::new();

        for (sel, name, salary) in ops.iter() {
            match sel {
                0 | 1 => {
                    model.insert(name.clone(), *salary);
                    table.insert(name, *salary);
                }
                _ => {
                    let model_had = model.remove(name).is_some();
                    let table_had = table.delete(name);
                    assert_eq!(table_had, model_had);
                }
            }
        }

        assert_eq!(table.len(), model.len());
        for (name, salary) in model.iter() {
            assert_eq!(table.search(name).map(|r| r.salary), Some(*salary));
        }
    }

    #[test]
    fn snapshot_always_sorted(entries in proptest::collection::vec(("[a-e]{1,5}", 0..1000u32), 0..64)) {
        let table = Table::new();
        for (name, salary) in entries.iter() {
            table.insert(name, *salary);
        }
        let rows = table.snapshot();
        assert!(rows.windows(2).all(|w| w[0].hash <= w[1].hash));
    }
}

#[test]
fn concurrent_inserts_then_deletes_drain_table() {
    let table = Table::new();
    let threads = 8;
    let per_thread = 64;

    std::thread::scope(|s| {
        for t in 0..threads {
            let table = &table;
            s.spawn(move || {
                for k in 0..per_thread {
                    table.insert(&format!("t{}-{}", t, k), k);
                }
            });
        }
    });
    assert_eq!(table.len(), threads * per_thread as usize);

    std::thread::scope(|s| {
        for t in 0..threads {
            let table = &table;
            s.spawn(move || {
                for k in 0..per_thread {
                    assert!(table.delete(&format!("t{}-{}", t, k)));
                }
            });
        }
    });
    assert!(table.is_empty());
}

#[test]
fn mixed_load_keeps_consistency() {
    // Inserts, searches and deletes over a shared key space, concurrently.
    // Every surviving record must hold a salary some insert wrote for it.
    let table = Table::new();

    std::thread::scope(|s| {
        for t in 0..4 {
            let table = &table;
            s.spawn(move || {
                for k in 0..100u32 {
                    let name = format!("shared-{}", k % 10);
                    table.insert(&name, t * 1000 + k);
                    table.search(&name);
                    if k % 3 == 0 {
                        table.delete(&name);
                    }
                }
            });
        }
    });

    for rec in table.snapshot() {
        assert!(rec.name.starts_with("shared-"));
        assert_eq!(rec.hash, hash::one_at_a_time(&rec.name));
    }
    assert!(table.len() <= 10);
}
