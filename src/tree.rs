use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::crypto::{self, CipherSuite, HpkePublicKey};
use crate::group_context::GroupId;
use crate::leaf_node::LeafNode;
use crate::treemath::{self, LeafCount, LeafIndex, NodeCount, NodeIndex};

const LEAF: u8 = 1;
const PARENT: u8 = 2;

#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
	#[error(transparent)]
	Structure(#[from] treemath::Error),
	#[error(transparent)]
	Codec(#[from] codec::Error),
	#[error(transparent)]
	Crypto(#[from] crypto::Error),
	#[error("node {0:?} is not a populated parent")]
	NotAParent(NodeIndex),
	#[error("the tree can't grow any further")]
	TreeFull,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParentNode {
	pub encryption_key: HpkePublicKey,
	pub parent_hash: Vec<u8>,
	// leaves added below this node after its key was last set
	pub unmerged_leaves: Vec<LeafIndex>,
}

impl Serialize for ParentNode {
	fn encode(&self, w: &mut Writer) {
		self.encryption_key.encode(w);
		w.opaque(&self.parent_hash);
		w.items(&self.unmerged_leaves);
	}
}

impl Deserialize for ParentNode {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			encryption_key: HpkePublicKey::decode(r)?,
			parent_hash: r.opaque()?,
			unmerged_leaves: r.items()?,
		})
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Node {
	Leaf(LeafNode),
	Parent(ParentNode),
}

impl Node {
	// what a child node says about its parent
	fn parent_hash(&self) -> Option<&[u8]> {
		match self {
			Self::Leaf(leaf) => leaf.parent_hash(),
			Self::Parent(parent) => Some(parent.parent_hash.as_slice()),
		}
	}
}

impl Serialize for Node {
	fn encode(&self, w: &mut Writer) {
		match self {
			Self::Leaf(leaf) => {
				w.u8(LEAF);
				leaf.encode(w);
			}
			Self::Parent(parent) => {
				w.u8(PARENT);
				parent.encode(w);
			}
		}
	}
}

impl Deserialize for Node {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		match r.u8()? {
			LEAF => Ok(Self::Leaf(LeafNode::decode(r)?)),
			PARENT => Ok(Self::Parent(ParentNode::decode(r)?)),
			other => Err(codec::Error::UnknownValue {
				field: "node type",
				value: other as u64,
			}),
		}
	}
}

// a full left-balanced tree in array form: leaves at even slots, parents at odd ones;
// its length is always 2^k - 1 (or 0 before the first leaf is added)
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct RatchetTree {
	pub(crate) nodes: Vec<Option<Node>>,
}

impl RatchetTree {
	pub fn new() -> Self {
		Self::default()
	}

	// pads to a full tree and truncates it to the smallest width holding every populated node
	pub fn from_nodes(mut nodes: Vec<Option<Node>>) -> Result<Self, codec::Error> {
		let misplaced = nodes.iter().enumerate().any(|(idx, slot)| {
			matches!(
				(idx % 2, slot),
				(0, Some(Node::Parent(_))) | (1, Some(Node::Leaf(_)))
			)
		});

		if misplaced {
			return Err(codec::Error::Malformed("node type does not match its slot"));
		}

		if !nodes.is_empty() {
			let mut width = 1;

			while width < nodes.len() {
				width = width * 2 + 1;
			}

			nodes.resize(width, None);
		}

		let mut tree = Self { nodes };
		tree.truncate();

		Ok(tree)
	}

	// drops the root's right subtree for as long as it is entirely blank
	pub fn truncate(&mut self) {
		let before = self.nodes.len();

		while self.nodes.len() > 1 && self.nodes[self.nodes.len() / 2 + 1..].iter().all(Option::is_none) {
			self.nodes.truncate(self.nodes.len() / 2);
		}

		if self.nodes.len() == 1 && self.nodes[0].is_none() {
			self.nodes.clear();
		}

		if self.nodes.len() != before {
			trace!(from = before, to = self.nodes.len(), "truncated the tree");
		}
	}

	pub fn num_leaves(&self) -> LeafCount {
		LeafCount(((self.nodes.len() + 1) / 2) as u32)
	}

	pub fn root(&self) -> Result<NodeIndex, Error> {
		Ok(NodeIndex::root(self.num_leaves())?)
	}

	// None for blank and out of range slots alike
	pub fn get(&self, x: NodeIndex) -> Option<&Node> {
		self.nodes.get(x.as_usize()).and_then(Option::as_ref)
	}

	pub fn get_leaf(&self, li: LeafIndex) -> Option<&LeafNode> {
		match self.get(li.into()) {
			Some(Node::Leaf(leaf)) => Some(leaf),
			_ => None,
		}
	}

	fn slot(&self, x: NodeIndex) -> Result<&Option<Node>, Error> {
		self.nodes.get(x.as_usize()).ok_or(Error::Structure(
			treemath::Error::NodeOutOfRange {
				n: x,
				r: NodeCount(self.nodes.len() as u32),
			},
		))
	}

	// the populated nodes covering x's subtree, left to right
	pub fn resolve(&self, x: NodeIndex) -> Result<Vec<NodeIndex>, Error> {
		match self.slot(x)? {
			Some(Node::Leaf(_)) => Ok(vec![x]),
			Some(Node::Parent(parent)) => Ok([x]
				.into_iter()
				.chain(parent.unmerged_leaves.iter().map(|&li| NodeIndex::from(li)))
				.collect()),
			None if x.is_leaf() => Ok(Vec::new()),
			None => {
				let (l, r) = x.children()?;
				let mut res = self.resolve(l)?;
				res.extend(self.resolve(r)?);

				Ok(res)
			}
		}
	}

	// excluded leaves hash as blank and are dropped from every unmerged list
	pub fn compute_tree_hash(
		&self,
		suite: CipherSuite,
		x: NodeIndex,
		excluded: &[LeafIndex],
	) -> Result<Vec<u8>, Error> {
		let slot = self.slot(x)?;
		let mut w = Writer::new();

		if x.is_leaf() {
			let li = LeafIndex::try_from(x)?;
			let leaf = match slot {
				Some(Node::Leaf(leaf)) if !excluded.contains(&li) => Some(leaf),
				_ => None,
			};

			w.u8(LEAF);
			w.u32(li.0);
			w.optional(leaf);
		} else {
			let (l, r) = x.children()?;
			let left = self.compute_tree_hash(suite, l, excluded)?;
			let right = self.compute_tree_hash(suite, r, excluded)?;
			let parent = match slot {
				Some(Node::Parent(parent)) => Some(ParentNode {
					unmerged_leaves: parent
						.unmerged_leaves
						.iter()
						.filter(|li| !excluded.contains(li))
						.copied()
						.collect(),
					..parent.clone()
				}),
				_ => None,
			};

			w.u8(PARENT);
			w.optional(parent.as_ref());
			w.opaque(&left);
			w.opaque(&right);
		}

		Ok(suite.hash(&w.finish()?)?)
	}

	pub fn tree_hash(&self, suite: CipherSuite) -> Result<Vec<u8>, Error> {
		self.compute_tree_hash(suite, self.root()?, &[])
	}

	// Hash(ParentHashInput { encryption_key, parent_hash, original_sibling_tree_hash })
	pub fn compute_parent_hash(
		&self,
		suite: CipherSuite,
		x: NodeIndex,
		original_sibling_tree_hash: &[u8],
	) -> Result<Vec<u8>, Error> {
		let Some(Node::Parent(parent)) = self.slot(x)? else {
			return Err(Error::NotAParent(x));
		};
		let mut w = Writer::new();

		parent.encryption_key.encode(&mut w);
		w.opaque(&parent.parent_hash);
		w.opaque(original_sibling_tree_hash);

		Ok(suite.hash(&w.finish()?)?)
	}

	// every populated parent has to be linked from exactly one of its children's subtrees
	pub fn verify_parent_hashes(&self, suite: CipherSuite) -> bool {
		match self.check_parent_hashes(suite) {
			Ok(valid) => valid,
			Err(err) => {
				warn!(%err, "parent hash verification failed");

				false
			}
		}
	}

	fn check_parent_hashes(&self, suite: CipherSuite) -> Result<bool, Error> {
		for (idx, slot) in self.nodes.iter().enumerate() {
			let Some(Node::Parent(parent)) = slot else {
				continue;
			};

			let x = NodeIndex(idx as u32);
			let (l, r) = x.children()?;
			let links = [(l, r), (r, l)]
				.into_iter()
				.map(|(child, sibling)| self.links_to(suite, x, parent, child, sibling))
				.collect::<Result<Vec<bool>, Error>>()?;

			if links.into_iter().filter(|&linked| linked).count() != 1 {
				warn!(node = x.0, "parent hash mismatch");

				return Ok(false);
			}
		}

		Ok(true)
	}

	// is there a node below `child` whose parent_hash matches x with `sibling` as the original sibling
	fn links_to(
		&self,
		suite: CipherSuite,
		x: NodeIndex,
		parent: &ParentNode,
		child: NodeIndex,
		sibling: NodeIndex,
	) -> Result<bool, Error> {
		let sibling_hash = self.compute_tree_hash(suite, sibling, &parent.unmerged_leaves)?;
		let expected = self.compute_parent_hash(suite, x, &sibling_hash)?;
		let unmerged: Vec<NodeIndex> = parent.unmerged_leaves.iter().map(|&li| li.into()).collect();

		Ok(self
			.resolve(child)?
			.into_iter()
			.filter(|d| !unmerged.contains(d))
			.filter_map(|d| self.get(d))
			.any(|d| d.parent_hash() == Some(expected.as_slice())))
	}

	pub fn verify_leaf_signatures(&self, suite: CipherSuite, group_id: &GroupId) -> bool {
		self.nodes
			.iter()
			.step_by(2)
			.enumerate()
			.all(|(idx, slot)| match slot {
				Some(Node::Leaf(leaf)) => {
					let valid = leaf.verify_signature(suite, group_id, LeafIndex(idx as u32));

					if !valid {
						warn!(leaf = idx, "invalid leaf signature");
					}

					valid
				}
				_ => true,
			})
	}

	// takes the leftmost blank leaf or doubles the tree; the new leaf's direct path is blanked
	pub fn add(&mut self, leaf: LeafNode) -> Result<LeafIndex, Error> {
		let free = self.nodes.iter().step_by(2).position(Option::is_none);
		let (li, len) = match free {
			Some(pos) => (LeafIndex(pos as u32), self.nodes.len()),
			None if self.nodes.is_empty() => (LeafIndex(0), 1),
			None => (LeafIndex(self.num_leaves().0), self.nodes.len() * 2 + 1),
		};
		let nc = u32::try_from(len).or(Err(Error::TreeFull))?;
		let x = NodeIndex::from(li);
		let dp = x.direct_path(LeafCount::try_from(NodeCount(nc))?)?;

		if len != self.nodes.len() {
			debug!(from = self.nodes.len(), to = len, "growing the tree");

			self.nodes.resize(len, None);
		}

		self.nodes[x.as_usize()] = Some(Node::Leaf(leaf));
		dp.iter().for_each(|p| self.nodes[p.as_usize()] = None);

		debug!(leaf = li.0, blanked = dp.len(), "added a leaf");

		Ok(li)
	}
}

// trailing blanks are not sent
impl Serialize for RatchetTree {
	fn encode(&self, w: &mut Writer) {
		let len = self
			.nodes
			.iter()
			.rposition(Option::is_some)
			.map_or(0, |last| last + 1);

		w.vector(|w| {
			self.nodes[..len]
				.iter()
				.for_each(|slot| w.optional(slot.as_ref()))
		});
	}
}

// padded with blanks up to the next full tree
impl Deserialize for RatchetTree {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		let nodes: Vec<Option<Node>> = r.vector(|r| r.optional())?;

		match nodes.last() {
			None => return Err(codec::Error::Malformed("empty ratchet tree")),
			Some(None) => return Err(codec::Error::Malformed("trailing blank node")),
			Some(Some(_)) => (),
		}

		trace!(sent = nodes.len(), "decoded a ratchet tree");

		Self::from_nodes(nodes)
	}
}
