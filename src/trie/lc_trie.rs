//! Level-compressed trie construction, search, and persistence

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use once_cell::sync::OnceCell;

use crate::error::{NetforgeError, Result};
use crate::io::{DataInput, DataOutput, ReaderDataInput, WriterDataOutput};
use crate::trie::key::PrefixKey;
use crate::trie::node::TrieNode;

const FILE_MAGIC: &[u8; 4] = b"NFLC";
const FORMAT_VERSION: u8 = 1;

/// One prefix in the accepted set: an address key plus a length in bits
///
/// The key is normalized on construction (bits beyond the prefix length are
/// cleared), so `10.1.2.3/8` and `10.0.0.0/8` denote the same prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrefixEntry<K: PrefixKey> {
    key: K,
    len: u32,
}

impl<K: PrefixKey> PrefixEntry<K> {
    /// Create an entry, masking the key to its prefix length
    ///
    /// Lengths beyond the key width are clamped to the full width.
    pub fn new(key: K, len: u32) -> Self {
        let len = len.min(K::BITS);
        Self {
            key: key.mask_to(len),
            len,
        }
    }

    /// Parse a CIDR entry: `<address>[/<prefix-length>]`, the length
    /// defaulting to the full address width
    pub fn parse(text: &str) -> Result<Self> {
        let (addr_text, len) = match text.split_once('/') {
            Some((addr, len_text)) => {
                let len: u32 = len_text.parse().map_err(|_| {
                    NetforgeError::invalid_data(format!("bad prefix length in {:?}", text))
                })?;
                (addr, len)
            }
            None => (text, K::BITS),
        };
        if len > K::BITS {
            return Err(NetforgeError::invalid_data(format!(
                "prefix length {} exceeds {} bits",
                len,
                K::BITS
            )));
        }
        Ok(Self::new(K::parse_addr(addr_text)?, len))
    }

    /// The (masked) address key
    pub fn key(&self) -> K {
        self.key
    }

    /// The prefix length in bits
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this entry covers the given address
    pub fn covers(&self, ip: K) -> bool {
        self.key.xor(ip).extract(0, self.len).is_zero()
    }
}

/// Diagnostic statistics for a compiled trie
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrieStats {
    /// Number of prefixes in the base array
    pub entries: usize,
    /// Leaf nodes in the trie array
    pub leaves: usize,
    /// Internal nodes in the trie array
    pub internal_nodes: usize,
    /// Bytes used by the trie array
    pub trie_bytes: usize,
    /// Bytes used by the base array
    pub base_bytes: usize,
    /// Total memory footprint in bytes
    pub total_bytes: usize,
    /// Longest root-to-leaf path
    pub max_leaf_depth: usize,
    /// Mean root-to-leaf path length
    pub avg_leaf_depth: f64,
    /// Effective branching factor of the root node
    pub root_branch: u32,
}

/// Level-compressed trie for IP-prefix set membership
///
/// Compiled once from a prefix list with [`build`](Self::build) and immutable
/// afterwards, so any number of threads may [`search`](Self::search)
/// concurrently without locking. To change the prefix set, build a fresh trie
/// and swap it in under a [`Synchronizer`](crate::sync::Synchronizer).
///
/// The branch compression follows S. Nilsson and G. Karlsson, "Fast address
/// lookup for Internet routers" (1998): each node consumes `branch` address
/// bits at once after skipping the `skip` bits its subtree shares, and a
/// fill factor governs how aggressively sparse levels are widened.
#[derive(Debug, Clone)]
pub struct LcTrie<K: PrefixKey> {
    trie: Vec<TrieNode>,
    base: Vec<PrefixEntry<K>>,
    fill_factor: f64,
    root_branch: u32,
    stats_cache: OnceCell<TrieStats>,
}

impl<K: PrefixKey> Default for LcTrie<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PrefixKey> LcTrie<K> {
    /// Hard cap on the number of prefixes one trie can hold
    pub const MAX_ENTRIES: usize = 1 << 19;

    /// Create an empty trie with default compilation parameters
    /// (fill factor 0.5, no root branching override)
    pub fn new() -> Self {
        Self {
            trie: Vec::new(),
            base: Vec::new(),
            fill_factor: 0.5,
            root_branch: 0,
            stats_cache: OnceCell::new(),
        }
    }

    /// Create an empty trie with explicit compilation parameters
    ///
    /// `fill_factor` is the minimum fraction of occupied buckets required to
    /// accept a branching width, in `(0, 1]`. A nonzero
    /// `root_branching_factor` forces that width at the root, which trades
    /// memory for one wide first step; 0 lets the fill factor decide.
    pub fn with_params(fill_factor: f64, root_branching_factor: u32) -> Result<Self> {
        if !(fill_factor > 0.0 && fill_factor <= 1.0) {
            return Err(NetforgeError::configuration(format!(
                "fill factor must be in (0, 1], got {}",
                fill_factor
            )));
        }
        if root_branching_factor > TrieNode::MAX_BRANCH {
            return Err(NetforgeError::configuration(format!(
                "root branching factor {} exceeds maximum {}",
                root_branching_factor,
                TrieNode::MAX_BRANCH
            )));
        }
        Ok(Self {
            fill_factor,
            root_branch: root_branching_factor,
            ..Self::new()
        })
    }

    /// Number of prefixes in the compiled set
    pub fn entry_count(&self) -> usize {
        self.base.len()
    }

    /// Whether the trie has been compiled with any prefixes
    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    /// Compile the trie from a set of prefixes
    ///
    /// Sorts and deduplicates the input; entries sharing a masked key
    /// collapse to the most general (shortest) prefix, which changes no
    /// membership answer. Fails without touching the current contents if the
    /// input exceeds [`MAX_ENTRIES`](Self::MAX_ENTRIES) or the compiled
    /// trie outgrows its 20-bit node addressing.
    pub fn build(&mut self, entries: Vec<PrefixEntry<K>>) -> Result<()> {
        if entries.len() > Self::MAX_ENTRIES {
            return Err(NetforgeError::capacity(entries.len(), Self::MAX_ENTRIES));
        }

        let mut base = entries;
        base.sort_unstable();
        // Sorted by (key, len), the most general form of a key comes first.
        base.dedup_by(|next, kept| next.key == kept.key);

        if base.is_empty() {
            self.trie = Vec::new();
            self.base = Vec::new();
            self.stats_cache = OnceCell::new();
            return Ok(());
        }

        // The internal node count cannot exceed the entry count, but empty
        // buckets and replicated leaves pad the node array; grow it on
        // demand and trim to the exact size afterwards.
        let mut trie = Vec::with_capacity(2 * base.len() + 16);
        let mut next_free = 1usize;
        build_recursive(
            &mut trie,
            &base,
            self.fill_factor,
            self.root_branch,
            0,
            0,
            base.len(),
            0,
            &mut next_free,
        )?;
        trie.truncate(next_free);

        log::debug!(
            "compiled LC-trie: {} entries, {} nodes",
            base.len(),
            trie.len()
        );
        self.trie = trie;
        self.base = base;
        self.stats_cache = OnceCell::new();
        Ok(())
    }

    /// Test whether `ip` falls within any prefix of the compiled set
    pub fn search(&self, ip: K) -> bool {
        if self.trie.is_empty() {
            return false;
        }

        let mut node = self.trie[0];
        let mut pos = node.skip();
        let mut branch = node.branch();
        let mut addr = node.addr();
        while branch != 0 {
            node = self.trie[addr as usize + ip.extract(pos, branch).low_u32() as usize];
            pos += branch + node.skip();
            branch = node.branch();
            addr = node.addr();
        }

        // The leaf is only a candidate; confirm against its stored prefix.
        self.base[addr as usize].covers(ip)
    }

    /// Compile from CIDR text, one `<address>[/<len>]` entry per line
    ///
    /// Any malformed line fails the whole compilation and leaves the current
    /// contents untouched.
    pub fn compile_from_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if entries.len() >= Self::MAX_ENTRIES {
                return Err(NetforgeError::capacity(entries.len() + 1, Self::MAX_ENTRIES));
            }
            entries.push(PrefixEntry::parse(text)?);
        }
        self.build(entries)
    }

    /// Compile from a prefix-list file
    pub fn compile_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path)?;
        self.compile_from_reader(BufReader::new(file))
    }

    /// Persist the compiled trie to a gzip-compressed binary stream
    pub fn save_to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = WriterDataOutput::new(GzEncoder::new(writer, Compression::default()));
        out.write_bytes(FILE_MAGIC)?;
        out.write_u8(FORMAT_VERSION)?;
        out.write_u8(K::BITS as u8)?;
        out.write_u64(self.fill_factor.to_bits())?;
        out.write_u8(self.root_branch as u8)?;

        out.write_var_u64(self.trie.len() as u64)?;
        for node in &self.trie {
            out.write_u32(node.raw())?;
        }
        out.write_var_u64(self.base.len() as u64)?;
        for entry in &self.base {
            entry.key.write_key(&mut out)?;
            out.write_u8(entry.len as u8)?;
        }

        let mut writer = out.into_inner().finish()?;
        writer.flush()?;
        Ok(())
    }

    /// Persist the compiled trie to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.save_to_writer(BufWriter::new(file))
    }

    /// Load a trie persisted by [`save`](Self::save)
    ///
    /// Validates the image before constructing anything, so a corrupt or
    /// truncated stream yields an error and no trie.
    pub fn load_from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut input = ReaderDataInput::new(GzDecoder::new(reader));

        let mut magic = [0u8; 4];
        input.read_bytes(&mut magic)?;
        if &magic != FILE_MAGIC {
            return Err(NetforgeError::invalid_data("not an LC-trie image"));
        }
        let version = input.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(NetforgeError::invalid_data(format!(
                "unsupported LC-trie image version {}",
                version
            )));
        }
        let width = u32::from(input.read_u8()?);
        if width != K::BITS {
            return Err(NetforgeError::invalid_data(format!(
                "key width mismatch: image has {} bits, expected {}",
                width,
                K::BITS
            )));
        }
        let fill_factor = f64::from_bits(input.read_u64()?);
        if !(fill_factor > 0.0 && fill_factor <= 1.0) {
            return Err(NetforgeError::invalid_data("fill factor out of range"));
        }
        let root_branch = u32::from(input.read_u8()?);
        if root_branch > TrieNode::MAX_BRANCH {
            return Err(NetforgeError::invalid_data("root branching factor out of range"));
        }

        let trie_len = input.read_var_u64()? as usize;
        if trie_len > TrieNode::MAX_ADDR as usize + 1 {
            return Err(NetforgeError::invalid_data("trie node count out of range"));
        }
        let mut trie = Vec::with_capacity(trie_len);
        for _ in 0..trie_len {
            trie.push(TrieNode::from_raw(input.read_u32()?));
        }

        let base_len = input.read_var_u64()? as usize;
        if base_len > Self::MAX_ENTRIES {
            return Err(NetforgeError::invalid_data("entry count out of range"));
        }
        let mut base = Vec::with_capacity(base_len);
        for _ in 0..base_len {
            let key = K::read_key(&mut input)?;
            let len = u32::from(input.read_u8()?);
            if len > K::BITS {
                return Err(NetforgeError::invalid_data("prefix length out of range"));
            }
            base.push(PrefixEntry::new(key, len));
        }

        if trie.is_empty() != base.is_empty() {
            return Err(NetforgeError::invalid_data("inconsistent LC-trie image"));
        }
        for node in &trie {
            if node.branch() == 0 {
                if node.addr() as usize >= base.len() {
                    return Err(NetforgeError::invalid_data("leaf references missing entry"));
                }
            } else if node.addr() as usize + (1usize << node.branch()) > trie.len() {
                return Err(NetforgeError::invalid_data("node references missing children"));
            }
        }

        Ok(Self {
            trie,
            base,
            fill_factor,
            root_branch,
            stats_cache: OnceCell::new(),
        })
    }

    /// Load a trie from a file written by [`save`](Self::save)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::load_from_reader(BufReader::new(file))
    }

    /// Diagnostic statistics, computed lazily and cached until the next
    /// [`build`](Self::build)
    pub fn stats(&self) -> TrieStats {
        self.stats_cache.get_or_init(|| self.compute_stats()).clone()
    }

    fn compute_stats(&self) -> TrieStats {
        if self.trie.is_empty() {
            return TrieStats::default();
        }

        let mut leaves = 0usize;
        let mut internal_nodes = 0usize;
        for node in &self.trie {
            if node.branch() == 0 {
                leaves += 1;
            } else {
                internal_nodes += 1;
            }
        }

        let mut total_depth = 0u64;
        let mut max_leaf_depth = 0usize;
        self.measure_depth(self.trie[0], 0, &mut total_depth, &mut max_leaf_depth);

        let trie_bytes = self.trie.len() * std::mem::size_of::<TrieNode>();
        let base_bytes = self.base.len() * std::mem::size_of::<PrefixEntry<K>>();
        TrieStats {
            entries: self.base.len(),
            leaves,
            internal_nodes,
            trie_bytes,
            base_bytes,
            total_bytes: trie_bytes + base_bytes,
            max_leaf_depth,
            avg_leaf_depth: if leaves > 0 {
                total_depth as f64 / leaves as f64
            } else {
                0.0
            },
            root_branch: self.trie[0].branch(),
        }
    }

    fn measure_depth(&self, node: TrieNode, depth: usize, total: &mut u64, max: &mut usize) {
        if node.branch() == 0 {
            *total += depth as u64;
            if depth > *max {
                *max = depth;
            }
            return;
        }
        for i in 0..(1usize << node.branch()) {
            let child = node.addr() as usize + i;
            if child >= self.trie.len() {
                break;
            }
            self.measure_depth(self.trie[child], depth + 1, total, max);
        }
    }
}

/// Pick the branching factor and new common-prefix length for the subtree
/// covering `base[first .. first + n]`, whose entries share their first
/// `prefix` bits.
fn compute_branch<K: PrefixKey>(
    base: &[PrefixEntry<K>],
    fill_factor: f64,
    root_branch: u32,
    prefix: u32,
    first: usize,
    n: usize,
) -> (u32, u32) {
    // The new common prefix ends at the first bit where the lowest and
    // highest entries of the sorted range diverge.
    let low = base[first].key().remove(prefix);
    let high = base[first + n - 1].key().remove(prefix);
    debug_assert!(low != high);
    let mut new_prefix = prefix;
    while low.extract(new_prefix, 1) == high.extract(new_prefix, 1) {
        new_prefix += 1;
    }

    // Two entries always branch on a single bit.
    if n == 2 {
        return (1, new_prefix);
    }

    // A caller-supplied width wins at the root.
    if root_branch > 0 && prefix == 0 && first == 0 {
        return (root_branch.min(K::BITS - new_prefix).max(1), new_prefix);
    }

    // Widen while at least `fill_factor` of the 2^b buckets stay occupied
    // and the bits fit in the address width.
    let mut b = 1u32;
    loop {
        b += 1;
        if b > TrieNode::MAX_BRANCH
            || new_prefix + b > K::BITS
            || (n as f64) < fill_factor * (1u64 << b) as f64
        {
            break;
        }
        let buckets = 1u32 << b;
        let mut occupied = 0u32;
        let mut i = first;
        for pattern in 0..buckets {
            let mut found = false;
            while i < first + n && base[i].key().extract(new_prefix, b).low_u32() == pattern {
                i += 1;
                found = true;
            }
            if found {
                occupied += 1;
            }
        }
        if f64::from(occupied) < fill_factor * f64::from(buckets) {
            break;
        }
    }
    (b - 1, new_prefix)
}

/// Recursively compile the subtree covering `base[first .. first + n]` into
/// `trie[pos]`, reserving child blocks from `next_free`.
#[allow(clippy::too_many_arguments)]
fn build_recursive<K: PrefixKey>(
    trie: &mut Vec<TrieNode>,
    base: &[PrefixEntry<K>],
    fill_factor: f64,
    root_branch: u32,
    prefix: u32,
    first: usize,
    n: usize,
    pos: usize,
    next_free: &mut usize,
) -> Result<()> {
    if n == 1 {
        ensure_slots(trie, pos + 1);
        trie[pos] = TrieNode::leaf(first as u32);
        return Ok(());
    }

    let (branch, new_prefix) = compute_branch(base, fill_factor, root_branch, prefix, first, n);
    let addr = *next_free;
    if addr > TrieNode::MAX_ADDR as usize {
        return Err(NetforgeError::capacity(addr, TrieNode::MAX_ADDR as usize));
    }
    ensure_slots(trie, pos + 1);
    trie[pos] = TrieNode::internal(branch, new_prefix - prefix, addr as u32);
    *next_free += 1usize << branch;
    ensure_slots(trie, *next_free);

    let block = 1u32 << branch;
    let mut p = first;
    for pattern in 0..block {
        let mut k = 0usize;
        while p + k < first + n
            && base[p + k].key().extract(new_prefix, branch).low_u32() == pattern
        {
            k += 1;
        }

        if k == 0 {
            // Empty bucket: plant a leaf on a neighboring entry. A lookup
            // landing here fails the leaf's prefix comparison unless that
            // entry genuinely covers the address.
            let fallback = if p == first + n { p - 1 } else { p };
            build_recursive(
                trie,
                base,
                fill_factor,
                root_branch,
                new_prefix + branch,
                fallback,
                1,
                addr + pattern as usize,
                next_free,
            )?;
        } else if k == 1 && u64::from(base[p].len()) < u64::from(new_prefix) + u64::from(branch) {
            // The entry's prefix ends inside this branch: replicate its leaf
            // across every pattern consistent with the shorter prefix. Keys
            // are masked to their length, so the run stays in this block.
            let spare = (new_prefix + branch - base[p].len()).min(branch);
            let end = (pattern + (1u32 << spare)).min(block);
            for slot in pattern..end {
                build_recursive(
                    trie,
                    base,
                    fill_factor,
                    root_branch,
                    new_prefix + branch,
                    p,
                    1,
                    addr + slot as usize,
                    next_free,
                )?;
            }
        } else {
            build_recursive(
                trie,
                base,
                fill_factor,
                root_branch,
                new_prefix + branch,
                p,
                k,
                addr + pattern as usize,
                next_free,
            )?;
        }

        p += k;
    }
    Ok(())
}

fn ensure_slots(trie: &mut Vec<TrieNode>, len: usize) {
    if trie.len() < len {
        trie.resize(len, TrieNode::leaf(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::key::{Ipv4Key, Ipv6Key};

    fn v4(text: &str) -> Ipv4Key {
        Ipv4Key::parse_addr(text).unwrap()
    }

    fn entries_v4(prefixes: &[&str]) -> Vec<PrefixEntry<Ipv4Key>> {
        prefixes.iter().map(|p| PrefixEntry::parse(p).unwrap()).collect()
    }

    #[test]
    fn test_empty_trie_matches_nothing() {
        let trie: LcTrie<Ipv4Key> = LcTrie::new();
        assert!(trie.is_empty());
        assert!(!trie.search(v4("10.0.0.1")));
    }

    #[test]
    fn test_single_prefix() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&["192.168.0.0/16"])).unwrap();
        assert!(trie.search(v4("192.168.42.1")));
        assert!(!trie.search(v4("192.169.0.1")));
        assert_eq!(trie.entry_count(), 1);
    }

    #[test]
    fn test_nested_prefix_scenario() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&["10.0.0.0/8", "10.1.0.0/16"])).unwrap();
        assert!(trie.search(v4("10.1.2.3")));
        assert!(trie.search(v4("10.200.0.1")));
        assert!(!trie.search(v4("11.0.0.0")));
    }

    #[test]
    fn test_duplicate_and_subsumed_entries_collapse() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&[
            "10.0.0.0/8",
            "10.0.0.0/8",
            // Same masked key, longer prefix: collapses to the /8.
            "10.0.0.0/16",
        ]))
        .unwrap();
        assert_eq!(trie.entry_count(), 1);
        assert!(trie.search(v4("10.250.0.1")));
    }

    #[test]
    fn test_host_bits_normalized() {
        let mut trie = LcTrie::new();
        trie.build(vec![PrefixEntry::new(v4("10.1.2.3"), 8)]).unwrap();
        assert!(trie.search(v4("10.9.9.9")));
        assert!(!trie.search(v4("11.1.2.3")));
    }

    #[test]
    fn test_full_length_entries() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&["1.2.3.4", "1.2.3.5", "9.9.9.9"])).unwrap();
        assert!(trie.search(v4("1.2.3.4")));
        assert!(trie.search(v4("1.2.3.5")));
        assert!(trie.search(v4("9.9.9.9")));
        assert!(!trie.search(v4("1.2.3.6")));
        assert!(!trie.search(v4("9.9.9.8")));
    }

    #[test]
    fn test_zero_length_prefix_matches_everything() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&["0.0.0.0/0"])).unwrap();
        assert!(trie.search(v4("255.255.255.255")));
        assert!(trie.search(v4("0.0.0.1")));
        assert!(trie.search(v4("127.0.0.1")));
    }

    #[test]
    fn test_root_branching_override() {
        let entries = entries_v4(&[
            "10.0.0.0/8",
            "11.0.0.0/8",
            "12.0.0.0/8",
            "13.0.0.0/8",
            "128.10.0.0/16",
            "128.11.0.0/16",
            "200.1.2.0/24",
            "201.1.2.0/24",
        ]);

        let mut plain = LcTrie::new();
        plain.build(entries.clone()).unwrap();
        let mut wide = LcTrie::with_params(0.5, 8).unwrap();
        wide.build(entries).unwrap();
        assert_eq!(wide.stats().root_branch, 8);

        for probe in [
            "10.1.1.1", "11.0.0.1", "13.255.0.1", "14.0.0.1", "128.10.3.4", "128.12.0.1",
            "200.1.2.3", "200.1.3.3", "201.1.2.200",
        ] {
            assert_eq!(plain.search(v4(probe)), wide.search(v4(probe)), "{}", probe);
        }
    }

    #[test]
    fn test_capacity_limit() {
        let mut trie: LcTrie<Ipv4Key> = LcTrie::new();
        let oversized = vec![PrefixEntry::new(0u32, 32); LcTrie::<Ipv4Key>::MAX_ENTRIES + 1];
        let err = trie.build(oversized).unwrap_err();
        assert_eq!(err.category(), "capacity");
        // The failed build left nothing behind.
        assert!(trie.is_empty());
    }

    #[test]
    fn test_invalid_params() {
        assert!(LcTrie::<Ipv4Key>::with_params(0.0, 0).is_err());
        assert!(LcTrie::<Ipv4Key>::with_params(1.5, 0).is_err());
        assert!(LcTrie::<Ipv4Key>::with_params(0.5, 32).is_err());
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&["10.0.0.0/8"])).unwrap();
        assert!(trie.search(v4("10.0.0.1")));

        trie.build(entries_v4(&["20.0.0.0/8"])).unwrap();
        assert!(!trie.search(v4("10.0.0.1")));
        assert!(trie.search(v4("20.0.0.1")));
    }

    #[test]
    fn test_ipv6_prefixes() {
        let mut trie: LcTrie<Ipv6Key> = LcTrie::new();
        trie.build(vec![
            PrefixEntry::parse("2001:db8::/32").unwrap(),
            PrefixEntry::parse("2001:1598:1:6667::/64").unwrap(),
            PrefixEntry::parse("fe80::/10").unwrap(),
        ])
        .unwrap();

        let probe = |text: &str| trie.search(Ipv6Key::parse_addr(text).unwrap());
        assert!(probe("2001:db8:1234::1"));
        assert!(probe("2001:1598:1:6667:a00:20ff:fec0:1"));
        assert!(probe("fe80::42"));
        assert!(!probe("2001:db9::1"));
        assert!(!probe("2001:1598:1:6668::1"));
        assert!(!probe("::1"));
    }

    #[test]
    fn test_stats_cached_until_rebuild() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&["10.0.0.0/8", "10.1.0.0/16", "172.16.0.0/12"]))
            .unwrap();

        let stats = trie.stats();
        assert_eq!(stats.entries, 3);
        assert!(stats.leaves >= 3);
        assert!(stats.max_leaf_depth >= 1);
        assert!(stats.total_bytes > 0);
        assert_eq!(trie.stats(), stats);

        trie.build(entries_v4(&["10.0.0.0/8"])).unwrap();
        assert_eq!(trie.stats().entries, 1);
    }

    #[test]
    fn test_compile_from_reader() {
        let text = "10.0.0.0/8\n192.168.1.0/24\n172.16.5.4\n";
        let mut trie = LcTrie::new();
        trie.compile_from_reader(std::io::Cursor::new(text)).unwrap();
        assert_eq!(trie.entry_count(), 3);
        assert!(trie.search(v4("192.168.1.77")));
        assert!(trie.search(v4("172.16.5.4")));
        assert!(!trie.search(v4("172.16.5.5")));
    }

    #[test]
    fn test_compile_rejects_malformed_lines() {
        let mut trie: LcTrie<Ipv4Key> = LcTrie::new();
        trie.build(entries_v4(&["10.0.0.0/8"])).unwrap();

        for bad in ["10.0.0.0/33\n", "10.0.0/8\n", "banana\n", "10.0.0.0/x\n"] {
            let err = trie.compile_from_reader(std::io::Cursor::new(bad)).unwrap_err();
            assert_eq!(err.category(), "data", "{:?}", bad);
        }
        // The failed compiles left the previous contents in place.
        assert!(trie.search(v4("10.1.1.1")));
    }

    #[test]
    fn test_save_load_round_trip_in_memory() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&["10.0.0.0/8", "10.1.0.0/16", "192.168.0.0/16"]))
            .unwrap();

        let mut image = Vec::new();
        trie.save_to_writer(&mut image).unwrap();
        let loaded = LcTrie::<Ipv4Key>::load_from_reader(image.as_slice()).unwrap();

        for probe in ["10.1.2.3", "10.77.0.1", "192.168.9.9", "11.0.0.0", "192.169.0.1"] {
            assert_eq!(trie.search(v4(probe)), loaded.search(v4(probe)), "{}", probe);
        }
        assert_eq!(loaded.stats(), trie.stats());
    }

    #[test]
    fn test_load_rejects_corrupt_images() {
        let mut trie = LcTrie::new();
        trie.build(entries_v4(&["10.0.0.0/8"])).unwrap();
        let mut image = Vec::new();
        trie.save_to_writer(&mut image).unwrap();

        // Truncated stream.
        let truncated = &image[..image.len() / 2];
        assert!(LcTrie::<Ipv4Key>::load_from_reader(truncated).is_err());

        // Not gzip at all.
        assert!(LcTrie::<Ipv4Key>::load_from_reader(&b"garbage"[..]).is_err());

        // Wrong key width.
        assert!(LcTrie::<Ipv6Key>::load_from_reader(image.as_slice()).is_err());
    }
}
