#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;

use squaremap::SquareMap as TestMap;
use std::collections::BTreeMap as ModelMap;

#[derive(Debug, Arbitrary)]
enum Command {
    Insert { key: u8, value: u8 },
    Remove { key: u8 },
    Get { key: u8 },
    GetMut { key: u8, value: u8 },
    GetKeyValue { key: u8 },
    ContainsKey { key: u8 },
    Find { key: u8 },
    EntryOrInsert { key: u8, value: u8 },
    EntryRemove { key: u8 },
    FirstKeyValue,
    LastKeyValue,
    Len,
    IsEmpty,
    Iter,
    IterMut,
    Keys,
    Values,
    ValuesMut,
    Merge,
    Clear,
    Reserve { additional: u8 },
    ShrinkToFit,
    RebuildFromModel,
    Clone,
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let commands = match Vec::<Command>::arbitrary(&mut unstructured) {
        Ok(c) => c,
        Err(_) => return,
    };

    let mut map: TestMap<u8, u8> = TestMap::new();
    let mut model: ModelMap<u8, u8> = ModelMap::new();

    for command in commands {
        map.validate();

        match command {
            Command::Insert { key, value } => {
                assert_eq!(map.insert(key, value), model.insert(key, value));
            }
            Command::Remove { key } => {
                assert_eq!(map.remove(&key), model.remove(&key));
            }
            Command::Get { key } => {
                assert_eq!(map.get(&key), model.get(&key));
            }
            Command::GetMut { key, value } => {
                let updated = match map.get_mut(&key) {
                    Some(v) => {
                        *v = value;
                        true
                    }
                    None => false,
                };
                match model.get_mut(&key) {
                    Some(v) => {
                        *v = value;
                        assert!(updated);
                    }
                    None => assert!(!updated),
                }
            }
            Command::GetKeyValue { key } => {
                assert_eq!(map.get_key_value(&key), model.get_key_value(&key));
            }
            Command::ContainsKey { key } => {
                assert_eq!(map.contains_key(&key), model.contains_key(&key));
            }
            Command::Find { key } => {
                // A hit yields the entry and everything after it, in order;
                // a miss (including an erased key) yields nothing.
                if model.contains_key(&key) {
                    assert!(map.find(&key).eq(model.range(key..)));
                } else {
                    assert!(map.find(&key).is_end());
                }
            }
            Command::EntryOrInsert { key, value } => {
                let got = *map.entry(key).or_insert(value);
                let expected = *model.entry(key).or_insert(value);
                assert_eq!(got, expected);
            }
            Command::EntryRemove { key } => match map.entry(key) {
                squaremap::Entry::Occupied(entry) => {
                    assert_eq!(Some(entry.remove()), model.remove(&key));
                }
                squaremap::Entry::Vacant(_) => {
                    assert_eq!(model.remove(&key), None);
                }
            },
            Command::FirstKeyValue => {
                assert_eq!(map.first_key_value(), model.first_key_value());
            }
            Command::LastKeyValue => {
                assert_eq!(map.last_key_value(), model.last_key_value());
            }
            Command::Len => {
                assert_eq!(map.len(), model.len());
            }
            Command::IsEmpty => {
                assert_eq!(map.is_empty(), model.is_empty());
            }
            Command::Iter => {
                assert!(map.iter().eq(model.iter()));
            }
            Command::IterMut => {
                map.iter_mut().for_each(|(_, v)| *v = v.wrapping_add(1));
                model.iter_mut().for_each(|(_, v)| *v = v.wrapping_add(1));
            }
            Command::Keys => {
                assert!(map.keys().eq(model.keys()));
            }
            Command::Values => {
                assert!(map.values().eq(model.values()));
            }
            Command::ValuesMut => {
                map.values_mut().for_each(|v| *v = v.wrapping_mul(3));
                model.values_mut().for_each(|v| *v = v.wrapping_mul(3));
            }
            Command::Merge => {
                map.merge();
            }
            Command::Clear => {
                map.clear();
                model.clear();
                assert_eq!(map.len(), 0);
            }
            Command::Reserve { additional } => {
                map.reserve(additional as usize);
            }
            Command::ShrinkToFit => {
                map.shrink_to_fit();
            }
            Command::RebuildFromModel => {
                let flat: Vec<(u8, u8)> = model.iter().map(|(k, v)| (*k, *v)).collect();
                map.replace(flat);
            }
            Command::Clone => {
                let cloned = map.clone();
                cloned.validate();
                assert!(cloned.iter().eq(map.iter()));
            }
        }

        // Lockstep check after every command.
        assert!(map.iter().eq(model.iter()));
        assert_eq!(map.len(), model.len());
    }
});
