//! LC-trie integration tests: randomized brute-force agreement,
//! serialization round trips, and text compilation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use netforge::{Ipv4Key, Ipv6Key, LcTrie, PrefixEntry, PrefixKey};

fn v4(text: &str) -> Ipv4Key {
    Ipv4Key::parse_addr(text).unwrap()
}

/// Brute-force membership: does any prefix cover the address?
fn brute_force<K: PrefixKey>(prefixes: &[PrefixEntry<K>], ip: K) -> bool {
    prefixes.iter().any(|p| p.covers(ip))
}

/// A deterministic set of non-overlapping IPv4 prefixes: /8s drawn from one
/// first-octet range, /16s and /24s from others.
fn random_v4_prefixes(rng: &mut StdRng, count: usize) -> Vec<PrefixEntry<Ipv4Key>> {
    let mut seen = std::collections::HashSet::new();
    let mut prefixes = Vec::new();
    while prefixes.len() < count {
        let (key, len) = match rng.gen_range(0..3) {
            0 => {
                let a = rng.gen_range(1u32..=60);
                (a << 24, 8)
            }
            1 => {
                let a = rng.gen_range(64u32..=150);
                let b = rng.gen_range(0u32..=255);
                ((a << 24) | (b << 16), 16)
            }
            _ => {
                let a = rng.gen_range(151u32..=220);
                let b = rng.gen_range(0u32..=255);
                let c = rng.gen_range(0u32..=255);
                ((a << 24) | (b << 16) | (c << 8), 24)
            }
        };
        if seen.insert((key, len)) {
            prefixes.push(PrefixEntry::new(key, len));
        }
    }
    prefixes
}

#[test]
fn trie_agrees_with_brute_force_v4() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let prefixes = random_v4_prefixes(&mut rng, 400);

    let mut trie = LcTrie::new();
    trie.build(prefixes.clone()).unwrap();

    let mut positives = 0;
    for _ in 0..20_000 {
        let ip: u32 = rng.gen();
        let expected = brute_force(&prefixes, ip);
        if expected {
            positives += 1;
        }
        assert_eq!(
            trie.search(ip),
            expected,
            "mismatch for {}",
            ip.format_addr()
        );
    }
    // The prefix mix must actually exercise the positive path.
    assert!(positives > 100, "only {} positive probes", positives);

    // Probe addresses derived from the prefixes themselves: inside each
    // prefix and just outside its span.
    for prefix in prefixes.iter().take(100) {
        let inside = prefix.key() | (1 << (32 - prefix.len() - 1).min(31));
        assert_eq!(trie.search(inside), brute_force(&prefixes, inside));
        let outside = prefix.key() ^ (1 << (32 - prefix.len()));
        assert_eq!(trie.search(outside), brute_force(&prefixes, outside));
    }
}

#[test]
fn trie_agrees_with_brute_force_v6() {
    let mut rng = StdRng::seed_from_u64(0xdead_6);

    // Non-overlapping by construction: distinct /48 site prefixes under
    // one documentation /32, plus distinct /64s under a disjoint /32.
    let mut seen = std::collections::HashSet::new();
    let mut prefixes: Vec<PrefixEntry<Ipv6Key>> = Vec::new();
    while prefixes.len() < 200 {
        let (key, len) = if prefixes.len() % 2 == 0 {
            let site: u128 = rng.gen_range(0..=0xffff);
            ((0x2001_0db8u128 << 96) | (site << 80), 48)
        } else {
            let subnet: u128 = rng.gen_range(0..=0xffff_ffff);
            ((0x2001_0dc8u128 << 96) | (subnet << 64), 64)
        };
        if seen.insert((key, len)) {
            prefixes.push(PrefixEntry::new(key, len));
        }
    }

    let mut trie = LcTrie::new();
    trie.build(prefixes.clone()).unwrap();

    for _ in 0..5_000 {
        // Bias probes toward the populated /16 neighborhoods.
        let ip: u128 = if rng.gen_bool(0.5) {
            let tail: u128 = rng.gen::<u64>() as u128 | ((rng.gen::<u64>() as u128) << 64);
            (0x2001_0db8u128 << 96) | (tail >> 32)
        } else {
            rng.gen::<u128>()
        };
        assert_eq!(trie.search(ip), brute_force(&prefixes, ip));
    }

    for prefix in prefixes.iter().take(50) {
        let inside = prefix.key() | 1u128;
        assert_eq!(trie.search(inside), brute_force(&prefixes, inside));
    }
}

#[test]
fn trie_with_wide_root_agrees_with_default() {
    let mut rng = StdRng::seed_from_u64(7);
    let prefixes = random_v4_prefixes(&mut rng, 300);

    let mut plain = LcTrie::new();
    plain.build(prefixes.clone()).unwrap();
    let mut wide = LcTrie::with_params(0.25, 16).unwrap();
    wide.build(prefixes).unwrap();
    assert_eq!(wide.stats().root_branch, 16);

    for _ in 0..5_000 {
        let ip: u32 = rng.gen();
        assert_eq!(plain.search(ip), wide.search(ip), "{}", ip.format_addr());
    }
}

#[test]
fn serialization_round_trip_preserves_search() {
    let mut rng = StdRng::seed_from_u64(42);
    let prefixes = random_v4_prefixes(&mut rng, 250);

    let mut trie = LcTrie::with_params(0.5, 8).unwrap();
    trie.build(prefixes).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefixes.lct");
    trie.save(&path).unwrap();
    let loaded = LcTrie::<Ipv4Key>::load(&path).unwrap();

    assert_eq!(loaded.entry_count(), trie.entry_count());
    assert_eq!(loaded.stats(), trie.stats());
    for _ in 0..10_000 {
        let ip: u32 = rng.gen();
        assert_eq!(trie.search(ip), loaded.search(ip), "{}", ip.format_addr());
    }
}

#[test]
fn serialization_round_trip_v6() {
    let mut trie: LcTrie<Ipv6Key> = LcTrie::new();
    trie.build(vec![
        PrefixEntry::parse("2001:4c40:1::/48").unwrap(),
        PrefixEntry::parse("2001:1598:1:6667:a00:20ff:fec0::/112").unwrap(),
        PrefixEntry::parse("fd00::/8").unwrap(),
    ])
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefixes6.lct");
    trie.save(&path).unwrap();
    let loaded = LcTrie::<Ipv6Key>::load(&path).unwrap();

    for probe in [
        "2001:4c40:1::1",
        "2001:4c40:2::1",
        "2001:1598:1:6667:a00:20ff:fec0:99",
        "2001:1598:1:6667:a00:20ff:fec1:0",
        "fd12::1",
        "fe00::1",
    ] {
        let ip = Ipv6Key::parse_addr(probe).unwrap();
        assert_eq!(trie.search(ip), loaded.search(ip), "{}", probe);
    }
}

#[test]
fn load_missing_file_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.lct");
    assert!(LcTrie::<Ipv4Key>::load(&path).is_err());
}

#[test]
fn load_rejects_truncated_file() {
    let mut trie: LcTrie<Ipv4Key> = LcTrie::new();
    trie.build(vec![PrefixEntry::parse("10.0.0.0/8").unwrap()])
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("whole.lct");
    trie.save(&path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let cut = dir.path().join("cut.lct");
    std::fs::write(&cut, &bytes[..bytes.len() - 4]).unwrap();
    assert!(LcTrie::<Ipv4Key>::load(&cut).is_err());
}

#[test]
fn compile_from_prefix_list_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefixes.txt");
    std::fs::write(&path, "10.0.0.0/8\n10.1.0.0/16\n192.168.1.0/24\n172.16.99.1\n").unwrap();

    let mut trie: LcTrie<Ipv4Key> = LcTrie::new();
    trie.compile_from_path(&path).unwrap();
    assert_eq!(trie.entry_count(), 4);

    assert!(trie.search(v4("10.1.2.3")));
    assert!(trie.search(v4("192.168.1.200")));
    assert!(trie.search(v4("172.16.99.1")));
    assert!(!trie.search(v4("11.0.0.0")));
    assert!(!trie.search(v4("172.16.99.2")));
}

#[test]
fn compile_failure_has_no_partial_effect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.txt");
    std::fs::write(&path, "10.0.0.0/8\nnot-an-address/16\n").unwrap();

    let mut trie: LcTrie<Ipv4Key> = LcTrie::new();
    trie.build(vec![PrefixEntry::parse("20.0.0.0/8").unwrap()])
        .unwrap();
    assert!(trie.compile_from_path(&path).is_err());

    // The earlier contents are intact.
    assert!(trie.search(v4("20.1.2.3")));
    assert!(!trie.search(v4("10.1.2.3")));
}

#[test]
fn concrete_nested_prefix_scenario() {
    let mut trie: LcTrie<Ipv4Key> = LcTrie::new();
    trie.compile_from_reader(std::io::Cursor::new("10.0.0.0/8\n10.1.0.0/16\n"))
        .unwrap();
    assert!(trie.search(v4("10.1.2.3")));
    assert!(!trie.search(v4("11.0.0.0")));
}

#[test]
fn stats_reflect_structure() {
    let mut rng = StdRng::seed_from_u64(99);
    let prefixes = random_v4_prefixes(&mut rng, 500);
    let count = {
        let mut dedup: Vec<_> = prefixes.clone();
        dedup.sort();
        dedup.dedup();
        dedup.len()
    };

    let mut trie = LcTrie::new();
    trie.build(prefixes).unwrap();

    let stats = trie.stats();
    assert_eq!(stats.entries, count);
    assert!(stats.leaves >= stats.entries);
    assert!(stats.internal_nodes >= 1);
    assert_eq!(stats.trie_bytes, (stats.leaves + stats.internal_nodes) * 4);
    assert!(stats.max_leaf_depth >= 1);
    assert!(stats.avg_leaf_depth > 0.0);
    assert!(stats.avg_leaf_depth <= stats.max_leaf_depth as f64);
}
