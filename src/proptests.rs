use crate::node::NodeId;
use crate::{format, parse_addr, parse_prefix, AddressBits, BitKey, PrefixTrie};
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Check every structural invariant of the trie.
pub(crate) fn validate_trie<B: AddressBits, V>(t: &PrefixTrie<B, V>) {
    let mut stack: Vec<(NodeId, Option<(BitKey<B>, usize)>)> = Vec::new();
    if let Some(root) = t.root_id() {
        stack.push((root, None));
    }

    let mut value_count = 0usize;
    let mut node_count = 0usize;
    while let Some((id, parent)) = stack.pop() {
        node_count += 1;
        let node = t.node(id);
        let key = node.key;

        assert_eq!(
            key,
            BitKey::new(key.bits(), key.prefix_len()),
            "bits past the prefix length must be clear"
        );

        if let Some((parent_key, bit)) = parent {
            assert!(
                parent_key.contains(&key),
                "{parent_key:?} must contain child {key:?}"
            );
            assert!(key.prefix_len() > parent_key.prefix_len());
            assert_eq!(
                key.bit(parent_key.prefix_len()),
                bit,
                "{key:?} hangs from the wrong slot"
            );
        }

        if node.value.is_some() {
            value_count += 1;
        } else {
            assert_eq!(
                node.child_count(),
                2,
                "value-less node {key:?} must be a branch point"
            );
        }

        for (bit, child) in node.children.iter().enumerate() {
            if let Some(child) = child {
                stack.push((*child, Some((key, bit))));
            }
        }
    }

    assert_eq!(value_count, t.len(), "reachable values must match len");
    assert_eq!(node_count, t.node_count(), "every live node must be reachable");
}

/// Pre-order (key, holds value) listing of every node.
fn shape<B: AddressBits, V>(t: &PrefixTrie<B, V>) -> Vec<(BitKey<B>, bool)> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = t.root_id().into_iter().collect();
    while let Some(id) = stack.pop() {
        let node = t.node(id);
        out.push((node.key, node.value.is_some()));
        stack.extend(node.children.iter().rev().flatten());
    }
    out
}

/// Brute-force longest match over a model map.
fn model_longest(m: &BTreeMap<BitKey<u32>, u16>, addr: u32) -> Option<(BitKey<u32>, u16)> {
    let host = BitKey::host(addr);
    m.iter()
        .filter(|(k, _)| k.contains(&host))
        .max_by_key(|(k, _)| k.prefix_len())
        .map(|(k, v)| (*k, *v))
}

// Keys share a small 6-bit top so random ops collide and nest often.
fn bits_strategy() -> impl Strategy<Value = u32> {
    (0u32..64, 0u32..4).prop_map(|(hi, lo)| (hi << 26) | lo)
}

fn prefix_strategy() -> impl Strategy<Value = BitKey<u32>> {
    (bits_strategy(), 0u8..=32).prop_map(|(bits, len)| BitKey::new(bits, len))
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 50)]
    Insert {
        #[proptest(strategy = "prefix_strategy()")]
        key: BitKey<u32>,
        value: u16,
    },
    #[proptest(weight = 20)]
    Remove {
        #[proptest(strategy = "prefix_strategy()")]
        key: BitKey<u32>,
    },
    #[proptest(weight = 10)]
    Get {
        #[proptest(strategy = "prefix_strategy()")]
        key: BitKey<u32>,
    },
    #[proptest(weight = 20)]
    Lookup {
        #[proptest(strategy = "bits_strategy()")]
        addr: u32,
    },
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=500)) {
        let mut t: PrefixTrie<u32, u16> = PrefixTrie::new();
        let mut m: BTreeMap<BitKey<u32>, u16> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert { key, value } => {
                    prop_assert_eq!(t.insert(key, value), m.insert(key, value));
                }
                Op::Remove { key } => {
                    let before = t.len();
                    let removed = t.remove(&key);
                    prop_assert_eq!(removed, m.remove(&key));
                    prop_assert_eq!(t.get(&key), None);
                    prop_assert_eq!(before - t.len(), usize::from(removed.is_some()));
                }
                Op::Get { key } => {
                    prop_assert_eq!(t.get(&key).copied(), m.get(&key).copied());
                }
                Op::Lookup { addr } => {
                    let got = t.longest_match_addr(addr).map(|(k, v)| (k, *v));
                    prop_assert_eq!(got, model_longest(&m, addr));
                }
            }
            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(&t);
        let got: Vec<(BitKey<u32>, u16)> = t.iter().map(|(k, v)| (k, *v)).collect();
        let mut expected: Vec<(BitKey<u32>, u16)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        expected.sort_by_key(|(k, _)| (k.bits(), k.prefix_len()));
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_order_independence(
        (keys, shuffled) in prop::collection::vec(prefix_strategy(), 0..64)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let a: PrefixTrie<u32, ()> = keys.iter().map(|k| (*k, ())).collect();
        let b: PrefixTrie<u32, ()> = shuffled.iter().map(|k| (*k, ())).collect();
        validate_trie(&a);
        validate_trie(&b);
        prop_assert_eq!(shape(&a), shape(&b));
        prop_assert_eq!(a.node_count(), b.node_count());
    }

    #[test]
    fn prop_lpm_matches_brute_force(
        prefixes in prop::collection::vec((prefix_strategy(), any::<u16>()), 0..128),
        addrs in prop::collection::vec(bits_strategy(), 1..64),
    ) {
        let mut t: PrefixTrie<u32, u16> = PrefixTrie::new();
        let mut m = BTreeMap::new();
        for (key, value) in prefixes {
            t.insert(key, value);
            m.insert(key, value);
        }
        for addr in addrs {
            let got = t.longest_match_addr(addr).map(|(k, v)| (k, *v));
            prop_assert_eq!(got, model_longest(&m, addr));

            // `matches` ends at the longest match and lists only containing prefixes.
            let all: Vec<BitKey<u32>> = t.matches(BitKey::host(addr)).map(|(k, _)| k).collect();
            prop_assert_eq!(all.last().copied(), got.map(|(k, _)| k));
            prop_assert!(all.windows(2).all(|w| w[0].prefix_len() < w[1].prefix_len()));
        }
    }

    #[test]
    fn prop_round_trip_v4(bits in any::<u32>(), len in 0u8..=32) {
        let key = BitKey::new(bits, len);
        let text = format(&key);
        prop_assert_eq!(parse_prefix::<u32>(&text), Ok(key));
        prop_assert_eq!(format(&parse_prefix::<u32>(&text).unwrap()), text);
    }

    #[test]
    fn prop_round_trip_v6(bits in any::<u128>(), len in 0u8..=128) {
        let key = BitKey::new(bits, len);
        let text = format(&key);
        prop_assert_eq!(parse_prefix::<u128>(&text), Ok(key));
        prop_assert_eq!(format(&parse_prefix::<u128>(&text).unwrap()), text);
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<BitKey<u32>> {
    [
        "0.0.0.0/0",
        "10.0.0.0/8",
        "10.1.0.0/16",
        "10.2.0.0/16",
        "10.1.1.0/24",
        "10.1.1.1/32",
    ]
    .iter()
    .map(|p| parse_prefix(p).unwrap())
    .collect()
}

const PROBES: &[&str] = &[
    "10.1.1.1", "10.1.1.2", "10.1.2.1", "10.2.0.1", "10.3.0.1", "11.0.0.1",
];

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_set();
    let reference: PrefixTrie<u32, usize> = keys.iter().map(|k| (*k, 0)).collect();
    let reference_shape = shape(&reference);

    for_each_permutation(&keys, |perm| {
        let mut t: PrefixTrie<u32, BitKey<u32>> = PrefixTrie::new();
        for k in perm {
            assert_eq!(t.insert(k, k), None);
        }

        validate_trie(&t);
        assert_eq!(shape(&t), reference_shape);
        for probe in PROBES {
            let addr = parse_addr::<u32>(probe).unwrap();
            let got = t.longest_match(&addr).map(|(k, v)| (k, *v));
            let expected = reference.longest_match(&addr).map(|(k, _)| (k, k));
            assert_eq!(got, expected, "probe {probe}");
        }
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base: PrefixTrie<u32, usize> = PrefixTrie::new();
    let mut base_map = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(base.insert(*k, i), base_map.insert(*k, i));
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.remove(&k), m.remove(&k));
            assert_eq!(t.len(), m.len());
            validate_trie(&t);

            // Shape after removal equals a fresh build of what is left.
            let fresh: PrefixTrie<u32, usize> = m.iter().map(|(k, v)| (*k, *v)).collect();
            assert_eq!(shape(&t), shape(&fresh));
        }
        assert_eq!(t.len(), 0);
        assert_eq!(t.node_count(), 0);
        assert!(t.root_id().is_none());
    });
}
