//! Merkle tree over an ordered leaf list.
//!
//! The leaf list is the only persistent state. The combiner tree above it is
//! thrown away and rebuilt from scratch whenever the leaves change, so the
//! header depends on nothing but the leaves, their order and the hash function.

use crate::error::{decode_record, ConfigurationError, IntegrityError, Result};
use crate::hash::{canonical_join, Digest, HashFunction};
use crate::transaction::{Transaction, TransactionRecord};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// A raw item at the base of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafItem {
    Transaction(Transaction),
    /// Opaque textual payload, hashed as-is.
    Text(String),
}

impl LeafItem {
    /// The string this item contributes to its leaf combiner's pre-image.
    pub fn canonical_string(&self) -> String {
        match self {
            LeafItem::Transaction(tx) => tx.canonical_encoding(),
            LeafItem::Text(text) => text.clone(),
        }
    }

    /// Get the transaction, if this item is one.
    pub fn as_transaction(&self) -> Option<&Transaction> {
        match self {
            LeafItem::Transaction(tx) => Some(tx),
            LeafItem::Text(_) => None,
        }
    }

    /// Convert to the persisted form.
    pub fn to_record(&self) -> LeafRecord {
        match self {
            LeafItem::Transaction(tx) => LeafRecord::Transaction(tx.to_record()),
            LeafItem::Text(text) => LeafRecord::Text(text.clone()),
        }
    }

    /// Rebuild an item from its record.
    pub fn from_record(record: &LeafRecord) -> Result<Self> {
        Ok(match record {
            LeafRecord::Transaction(tx) => LeafItem::Transaction(Transaction::from_record(tx)?),
            LeafRecord::Text(text) => LeafItem::Text(text.clone()),
        })
    }
}

impl From<Transaction> for LeafItem {
    fn from(tx: Transaction) -> Self {
        LeafItem::Transaction(tx)
    }
}

impl From<String> for LeafItem {
    fn from(text: String) -> Self {
        LeafItem::Text(text)
    }
}

impl From<&str> for LeafItem {
    fn from(text: &str) -> Self {
        LeafItem::Text(text.to_string())
    }
}

/// Persisted form of a [`LeafItem`]: a transaction record or a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeafRecord {
    Transaction(TransactionRecord),
    Text(String),
}

/// A hashed pair in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Combiner {
    /// Bottom level: two raw items.
    Leaf {
        left: LeafItem,
        right: LeafItem,
        hash_function: HashFunction,
        digest: Digest,
    },
    /// Two combiners of equal height.
    Node {
        left: Box<Combiner>,
        right: Box<Combiner>,
        hash_function: HashFunction,
        digest: Digest,
        height: usize,
    },
}

impl Combiner {
    /// Combine two raw items.
    pub fn leaf(left: LeafItem, right: LeafItem, hash_function: HashFunction) -> Self {
        let digest = hash_function.digest_str(&canonical_join(&[
            left.canonical_string().as_str(),
            right.canonical_string().as_str(),
            hash_function.name(),
        ]));
        Combiner::Leaf {
            left,
            right,
            hash_function,
            digest,
        }
    }

    /// Combine two combiners. Both must share `hash_function` and have the same height.
    pub fn node(
        left: Combiner,
        right: Combiner,
        hash_function: HashFunction,
    ) -> std::result::Result<Self, ConfigurationError> {
        for child in [&left, &right] {
            if child.hash_function() != hash_function {
                return Err(ConfigurationError::HashFunctionMismatch {
                    expected: hash_function.name().to_string(),
                    found: child.hash_function().name().to_string(),
                });
            }
        }
        if left.height() != right.height() {
            return Err(ConfigurationError::UnbalancedCombiner {
                left: left.height(),
                right: right.height(),
            });
        }
        let digest = hash_function.digest_str(&canonical_join(&[
            left.digest().to_hex().as_str(),
            right.digest().to_hex().as_str(),
            hash_function.name(),
        ]));
        let height = left.height() + 1;
        Ok(Combiner::Node {
            left: Box::new(left),
            right: Box::new(right),
            hash_function,
            digest,
            height,
        })
    }

    /// Get the height of the combiner; a leaf combiner is 1.
    pub fn height(&self) -> usize {
        match self {
            Combiner::Leaf { .. } => 1,
            Combiner::Node { height, .. } => *height,
        }
    }

    /// Get the digest of the combiner.
    pub fn digest(&self) -> &Digest {
        match self {
            Combiner::Leaf { digest, .. } | Combiner::Node { digest, .. } => digest,
        }
    }

    /// Get the hash function of the combiner.
    pub fn hash_function(&self) -> HashFunction {
        match self {
            Combiner::Leaf { hash_function, .. } | Combiner::Node { hash_function, .. } => {
                *hash_function
            }
        }
    }

    /// Convert to the persisted form.
    pub fn to_record(&self) -> CombinerRecord {
        let (left, right) = match self {
            Combiner::Leaf { left, right, .. } => (
                ChildRecord::Leaf(left.to_record()),
                ChildRecord::Leaf(right.to_record()),
            ),
            Combiner::Node { left, right, .. } => (
                ChildRecord::Combiner(Box::new(left.to_record())),
                ChildRecord::Combiner(Box::new(right.to_record())),
            ),
        };
        CombinerRecord {
            left,
            right,
            hash_function: self.hash_function().name().to_string(),
            digest: self.digest().to_hex(),
        }
    }

    /// Rebuild a combiner chain from its record, recomputing every digest on the way up.
    pub fn from_record(record: &CombinerRecord) -> Result<Self> {
        const ENTITY: &str = "combiner";
        let hash_function = record
            .hash_function
            .parse::<HashFunction>()
            .map_err(|e| IntegrityError::malformed(ENTITY, e))?;

        let combiner = match (&record.left, &record.right) {
            (ChildRecord::Leaf(left), ChildRecord::Leaf(right)) => Combiner::leaf(
                LeafItem::from_record(left)?,
                LeafItem::from_record(right)?,
                hash_function,
            ),
            (ChildRecord::Combiner(left), ChildRecord::Combiner(right)) => Combiner::node(
                Combiner::from_record(left)?,
                Combiner::from_record(right)?,
                hash_function,
            )
            .map_err(|e| IntegrityError::malformed(ENTITY, e))?,
            _ => {
                return Err(IntegrityError::malformed(
                    ENTITY,
                    "children mix raw items and combiners",
                )
                .into())
            }
        };

        let computed = combiner.digest().to_hex();
        if computed != record.digest {
            return Err(IntegrityError::DigestMismatch {
                entity: ENTITY,
                stored: record.digest.clone(),
                computed,
            }
            .into());
        }
        Ok(combiner)
    }
}

/// Persisted form of a [`Combiner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CombinerRecord {
    pub left: ChildRecord,
    pub right: ChildRecord,
    pub hash_function: String,
    pub digest: String,
}

/// A combiner's child: nested combiner above the bottom level, raw item at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildRecord {
    Combiner(Box<CombinerRecord>),
    Leaf(LeafRecord),
}

/// Persisted form of a [`MerkleTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MerkleTreeRecord {
    pub root: CombinerRecord,
    pub leaves: Vec<LeafRecord>,
    pub hash_function: String,
    pub height: usize,
    pub header: String,
}

/// A merkle tree whose header summarises an ordered list of leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: Vec<LeafItem>,
    hash_function: HashFunction,
    root: Combiner,
}

impl MerkleTree {
    /// Build a tree over `leaves`. Fails if there are none.
    pub fn new<I, T>(leaves: I, hash_function: HashFunction) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<LeafItem>,
    {
        let leaves: Vec<LeafItem> = leaves.into_iter().map(Into::into).collect();
        let root = build(&leaves, hash_function)?;
        Ok(Self {
            leaves,
            hash_function,
            root,
        })
    }

    /// Append leaves and rebuild the whole tree.
    pub fn add<I, T>(&mut self, new_leaves: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<LeafItem>,
    {
        let mut leaves = self.leaves.clone();
        leaves.extend(new_leaves.into_iter().map(Into::into));
        self.replace_leaves(leaves)
    }

    /// Swap in a new leaf list. On failure the tree is left untouched.
    pub(crate) fn replace_leaves(&mut self, leaves: Vec<LeafItem>) -> Result<()> {
        self.root = build(&leaves, self.hash_function)?;
        self.leaves = leaves;
        Ok(())
    }

    /// The root digest, also known as the block header.
    pub fn header(&self) -> &Digest {
        self.root.digest()
    }

    /// Levels from the leaves to the root; leaf pairing counts as the first.
    pub fn height(&self) -> usize {
        self.root.height()
    }

    /// Get the root of the merkle tree.
    pub fn root(&self) -> &Combiner {
        &self.root
    }

    /// The stored, unpadded leaves in insertion order.
    pub fn leaves(&self) -> &[LeafItem] {
        &self.leaves
    }

    /// Get the hash function of the merkle tree.
    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// Get the number of stored leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Always false: a tree holds at least one leaf.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Alias for [`MerkleTree::len`].
    pub fn number_of_elements(&self) -> usize {
        self.len()
    }

    /// Inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaves.len() {
            return None;
        }

        let mut node = &self.root;
        let mut offset = index;
        let mut siblings = Vec::new();
        let mut directions = Vec::new();

        loop {
            match node {
                Combiner::Node {
                    left,
                    right,
                    height,
                    ..
                } => {
                    let half = 1usize << (height - 1);
                    if offset < half {
                        siblings.push(right.digest().clone());
                        directions.push(true);
                        node = &**left;
                    } else {
                        siblings.push(left.digest().clone());
                        directions.push(false);
                        offset -= half;
                        node = &**right;
                    }
                }
                Combiner::Leaf { left, right, .. } => {
                    let item_on_left = offset == 0;
                    let sibling = if item_on_left { right } else { left };
                    siblings.reverse();
                    directions.reverse();
                    return Some(MerkleProof {
                        leaf_index: index,
                        sibling_item: sibling.canonical_string(),
                        item_on_left,
                        siblings,
                        directions,
                    });
                }
            }
        }
    }

    /// Convert to the persisted form.
    pub fn to_record(&self) -> MerkleTreeRecord {
        MerkleTreeRecord {
            root: self.root.to_record(),
            leaves: self.leaves.iter().map(LeafItem::to_record).collect(),
            hash_function: self.hash_function.name().to_string(),
            height: self.height(),
            header: self.header().to_hex(),
        }
    }

    /// Rebuild a tree from its record and check it against every stored digest.
    pub fn from_record(record: &MerkleTreeRecord) -> Result<Self> {
        const ENTITY: &str = "merkle tree";
        let hash_function = record
            .hash_function
            .parse::<HashFunction>()
            .map_err(|e| IntegrityError::malformed(ENTITY, e))?;
        let leaves = record
            .leaves
            .iter()
            .map(LeafItem::from_record)
            .collect::<Result<Vec<_>>>()?;
        if leaves.is_empty() {
            return Err(IntegrityError::malformed(ENTITY, "no leaves").into());
        }

        let tree = Self::new(leaves, hash_function)?;

        let computed = tree.header().to_hex();
        if computed != record.header {
            return Err(IntegrityError::DigestMismatch {
                entity: ENTITY,
                stored: record.header.clone(),
                computed,
            }
            .into());
        }
        if tree.height() != record.height {
            return Err(IntegrityError::HeightMismatch {
                stored: record.height,
                computed: tree.height(),
            }
            .into());
        }

        let root = Combiner::from_record(&record.root)?;
        if root.digest() != tree.header() {
            return Err(IntegrityError::DigestMismatch {
                entity: "merkle root",
                stored: root.digest().to_hex(),
                computed: tree.header().to_hex(),
            }
            .into());
        }

        Ok(tree)
    }

    /// Serialize to a JSON record.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    /// Parse a JSON record and check its digests.
    pub fn from_json(json: &str) -> Result<Self> {
        let record: MerkleTreeRecord = decode_record("merkle tree", json)?;
        Self::from_record(&record)
    }
}

/// Pad, pair and fold `leaves` into a root combiner.
///
/// Combiners are folded front to back: the first two are popped and their
/// parent is appended at the back, until two remain for the root.
fn build(leaves: &[LeafItem], hash_function: HashFunction) -> Result<Combiner> {
    let last = leaves.last().ok_or(ConfigurationError::EmptyLeafSet)?;

    let mut padded: Vec<&LeafItem> = leaves.iter().collect();
    while padded.len() < 2 || !padded.len().is_power_of_two() {
        padded.push(last);
    }

    let mut queue: VecDeque<Combiner> = padded
        .chunks(2)
        .map(|pair| Combiner::leaf(pair[0].clone(), pair[1].clone(), hash_function))
        .collect();

    while queue.len() > 2 {
        if let (Some(left), Some(right)) = (queue.pop_front(), queue.pop_front()) {
            queue.push_back(Combiner::node(left, right, hash_function)?);
        }
    }

    let root = match (queue.pop_front(), queue.pop_front()) {
        (Some(left), Some(right)) => Combiner::node(left, right, hash_function)?,
        (Some(only), None) => only,
        _ => return Err(ConfigurationError::EmptyLeafSet.into()),
    };

    debug!(
        leaves = leaves.len(),
        padded = padded.len(),
        height = root.height(),
        hash_function = %hash_function,
        "rebuilt merkle tree"
    );
    Ok(root)
}

/// Proof that one leaf is part of a tree with a given header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// Position of the leaf in the unpadded leaf list.
    pub leaf_index: usize,
    /// Canonical string of the item paired with the leaf at the bottom level.
    pub sibling_item: String,
    /// Whether the proven item is the left half of its pair.
    pub item_on_left: bool,
    /// Sibling digests from the bottom level up to the root.
    pub siblings: Vec<Digest>,
    /// Direction for each sibling (true = sibling is on the right).
    pub directions: Vec<bool>,
}

impl MerkleProof {
    /// Recompute the root from `item` and check it against `header`.
    pub fn verify(&self, header: &Digest, item: &LeafItem, hash_function: HashFunction) -> bool {
        let item = item.canonical_string();
        let pair = if self.item_on_left {
            [item.as_str(), self.sibling_item.as_str(), hash_function.name()]
        } else {
            [self.sibling_item.as_str(), item.as_str(), hash_function.name()]
        };
        let mut current = hash_function.digest_str(&canonical_join(&pair));

        for (sibling, is_right) in self.siblings.iter().zip(self.directions.iter()) {
            let (left, right) = if *is_right {
                (current.to_hex(), sibling.to_hex())
            } else {
                (sibling.to_hex(), current.to_hex())
            };
            current = hash_function.digest_str(&canonical_join(&[
                left.as_str(),
                right.as_str(),
                hash_function.name(),
            ]));
        }

        current == *header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    fn numbered(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
        range.map(|i| i.to_string()).collect()
    }

    fn h(hf: HashFunction, parts: &[&str]) -> Digest {
        hf.digest_str(&canonical_join(parts))
    }

    #[test]
    fn test_empty_tree_rejected() {
        let err = MerkleTree::new(Vec::<LeafItem>::new(), HashFunction::Sha256).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Configuration(ConfigurationError::EmptyLeafSet)
        ));
    }

    #[test]
    fn test_single_leaf_is_duplicated() {
        let tree = MerkleTree::new(["a"], HashFunction::Sha256).unwrap();
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.header(), &h(HashFunction::Sha256, &["a", "a", "sha256"]));
    }

    #[test]
    fn test_two_leaves_single_combiner() {
        let tree = MerkleTree::new(["a", "b"], HashFunction::Sha1).unwrap();
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.header(), &h(HashFunction::Sha1, &["a", "b", "sha1"]));
    }

    #[test]
    fn test_three_leaves_pad_with_last() {
        let hf = HashFunction::Sha256;
        let tree = MerkleTree::new(["a", "b", "c"], hf).unwrap();

        let ab = h(hf, &["a", "b", "sha256"]);
        let cc = h(hf, &["c", "c", "sha256"]);
        let root = h(hf, &[ab.to_hex().as_str(), cc.to_hex().as_str(), "sha256"]);

        assert_eq!(tree.height(), 2);
        assert_eq!(tree.header(), &root);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_eight_leaves_fold_order() {
        let hf = HashFunction::Sha224;
        let items = numbered(1..=8);
        let tree = MerkleTree::new(items.clone(), hf).unwrap();

        let pairs: Vec<Digest> = items
            .chunks(2)
            .map(|p| h(hf, &[p[0].as_str(), p[1].as_str(), "sha224"]))
            .collect();
        let hex: Vec<String> = pairs.iter().map(Digest::to_hex).collect();
        let n01 = h(hf, &[hex[0].as_str(), hex[1].as_str(), "sha224"]);
        let n23 = h(hf, &[hex[2].as_str(), hex[3].as_str(), "sha224"]);
        let root = h(hf, &[n01.to_hex().as_str(), n23.to_hex().as_str(), "sha224"]);

        assert_eq!(tree.height(), 3);
        assert_eq!(tree.header(), &root);
    }

    #[test]
    fn test_heights() {
        let hf = HashFunction::Sha256;
        let cases = [(1, 1), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4)];
        for (count, height) in cases {
            let tree = MerkleTree::new(numbered(1..=count), hf).unwrap();
            assert_eq!(tree.height(), height as usize, "{count} leaves");
        }
    }

    #[test]
    fn test_add_grows_and_rehashes() {
        let mut headers = Vec::new();
        let mut tree = MerkleTree::new(numbered(1..=15), HashFunction::Sha256).unwrap();
        assert_eq!(tree.height(), 4);
        headers.push(tree.header().clone());

        let steps: [(Vec<String>, usize, usize); 4] = [
            (numbered(16..=16), 16, 4),
            (numbered(17..=19), 19, 5),
            (numbered(20..=32), 32, 5),
            (numbered(33..=33), 33, 6),
        ];
        for (extra, len, height) in steps {
            tree.add(extra).unwrap();
            assert_eq!(tree.len(), len);
            assert_eq!(tree.height(), height);
            assert!(!headers.contains(tree.header()));
            headers.push(tree.header().clone());
        }
    }

    #[test]
    fn test_add_equals_fresh_build() {
        let hf = HashFunction::Sha384;
        let mut grown = MerkleTree::new(numbered(1..=3), hf).unwrap();
        grown.add(numbered(4..=7)).unwrap();
        let fresh = MerkleTree::new(numbered(1..=7), hf).unwrap();
        assert_eq!(grown.header(), fresh.header());
        assert_eq!(grown.leaves(), fresh.leaves());
    }

    #[test]
    fn test_padding_not_stored() {
        let tree = MerkleTree::new(numbered(1..=5), HashFunction::Sha256).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.number_of_elements(), 5);
    }

    #[test]
    fn test_order_matters() {
        let hf = HashFunction::Sha256;
        let a = MerkleTree::new(["x", "y", "z"], hf).unwrap();
        let b = MerkleTree::new(["z", "y", "x"], hf).unwrap();
        assert_ne!(a.header(), b.header());
    }

    #[test]
    fn test_hash_function_matters() {
        let a = MerkleTree::new(["x", "y"], HashFunction::Sha256).unwrap();
        let b = MerkleTree::new(["x", "y"], HashFunction::Sha512).unwrap();
        assert_ne!(a.header(), b.header());
        assert_eq!(b.header().len(), 64);
    }

    #[test]
    fn test_node_rejects_unbalanced_children() {
        let hf = HashFunction::Sha256;
        let leaf = Combiner::leaf("a".into(), "b".into(), hf);
        let deeper = Combiner::node(leaf.clone(), leaf.clone(), hf).unwrap();
        assert_eq!(
            Combiner::node(leaf, deeper, hf).unwrap_err(),
            ConfigurationError::UnbalancedCombiner { left: 1, right: 2 }
        );
    }

    #[test]
    fn test_node_rejects_mixed_hash_functions() {
        let left = Combiner::leaf("a".into(), "b".into(), HashFunction::Sha256);
        let right = Combiner::leaf("c".into(), "d".into(), HashFunction::Sha1);
        assert!(matches!(
            Combiner::node(left, right, HashFunction::Sha256),
            Err(ConfigurationError::HashFunctionMismatch { .. })
        ));
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        let hf = HashFunction::Sha256;
        for count in [1u32, 2, 3, 5, 8, 13] {
            let tree = MerkleTree::new(numbered(1..=count), hf).unwrap();
            for (i, item) in tree.leaves().iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert_eq!(proof.siblings.len(), tree.height() - 1);
                assert!(proof.verify(tree.header(), item, hf), "{count} leaves, index {i}");
            }
        }
    }

    #[test]
    fn test_proof_rejects_foreign_item() {
        let hf = HashFunction::Sha256;
        let tree = MerkleTree::new(numbered(1..=6), hf).unwrap();
        let proof = tree.proof(2).unwrap();
        assert!(!proof.verify(tree.header(), &"99".into(), hf));
        assert!(tree.proof(6).is_none());
    }

    #[test]
    fn test_record_roundtrip() {
        let tree = MerkleTree::new(numbered(1..=5), HashFunction::Sha1).unwrap();
        let restored = MerkleTree::from_json(&tree.to_json().unwrap()).unwrap();
        assert_eq!(restored, tree);
    }

    #[test]
    fn test_record_detects_changed_leaf() {
        let tree = MerkleTree::new(numbered(1..=5), HashFunction::Sha256).unwrap();
        let mut record = tree.to_record();
        record.leaves[3] = LeafRecord::Text("forged".into());
        assert!(matches!(
            MerkleTree::from_record(&record),
            Err(LedgerError::Integrity(IntegrityError::DigestMismatch { .. }))
        ));
    }

    #[test]
    fn test_record_detects_changed_height() {
        let tree = MerkleTree::new(numbered(1..=5), HashFunction::Sha256).unwrap();
        let mut record = tree.to_record();
        record.height = 4;
        assert!(matches!(
            MerkleTree::from_record(&record),
            Err(LedgerError::Integrity(IntegrityError::HeightMismatch {
                stored: 4,
                computed: 3
            }))
        ));
    }

    #[test]
    fn test_record_detects_forged_root() {
        let tree = MerkleTree::new(numbered(1..=4), HashFunction::Sha256).unwrap();
        let other = MerkleTree::new(numbered(5..=8), HashFunction::Sha256).unwrap();
        let mut record = tree.to_record();
        record.root = other.root().to_record();
        assert!(matches!(
            MerkleTree::from_record(&record),
            Err(LedgerError::Integrity(IntegrityError::DigestMismatch {
                entity: "merkle root",
                ..
            }))
        ));
    }

    #[test]
    fn test_combiner_record_detects_changed_digest() {
        let hf = HashFunction::Sha256;
        let leaf = Combiner::leaf("a".into(), "b".into(), hf);
        let node = Combiner::node(leaf.clone(), leaf, hf).unwrap();
        let mut record = node.to_record();
        record.digest = "00".repeat(32);
        assert!(matches!(
            Combiner::from_record(&record),
            Err(LedgerError::Integrity(IntegrityError::DigestMismatch {
                entity: "combiner",
                ..
            }))
        ));
    }

    #[test]
    fn test_combiner_record_rejects_mixed_children() {
        let hf = HashFunction::Sha256;
        let leaf = Combiner::leaf("a".into(), "b".into(), hf);
        let node = Combiner::node(leaf.clone(), leaf, hf).unwrap();
        let mut record = node.to_record();
        record.right = ChildRecord::Leaf(LeafRecord::Text("a".into()));
        assert!(matches!(
            Combiner::from_record(&record),
            Err(LedgerError::Integrity(IntegrityError::MalformedRecord { .. }))
        ));
    }

    #[test]
    fn test_json_with_wrong_child_type_is_malformed() {
        let tree = MerkleTree::new(numbered(1..=3), HashFunction::Sha256).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
        value["leaves"][0] = 12.into();
        assert!(matches!(
            MerkleTree::from_json(&value.to_string()),
            Err(LedgerError::Integrity(IntegrityError::MalformedRecord {
                entity: "merkle tree",
                ..
            }))
        ));
    }
}
