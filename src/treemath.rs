use thiserror::Error;

use crate::codec::{self, Deserialize, Reader, Serialize, Writer};

#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
	#[error("empty tree")]
	EmptyTree,
	#[error("node count is not odd")]
	NodeCountNotOdd,
	#[error("leaves live at even node indices only")]
	LeafNotEvenInNodeSpace,
	#[error("a leaf has no children")]
	LeafCantHaveChildren,
	#[error("node {n:?} is out of range for {r:?}")]
	NodeOutOfRange { n: NodeIndex, r: NodeCount },
	#[error("the root has no parent")]
	RootCantHaveParent,
}

// slots in the array form, leaves and parents alike
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct NodeCount(pub u32);

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct LeafCount(pub u32);

// n leaves take 2n - 1 slots
impl From<LeafCount> for NodeCount {
	fn from(lc: LeafCount) -> Self {
		Self(lc.0.saturating_mul(2).saturating_sub(1))
	}
}

impl TryFrom<NodeCount> for LeafCount {
	type Error = Error;

	fn try_from(nc: NodeCount) -> Result<Self, Self::Error> {
		match nc.0 {
			0 => Ok(Self(0)),
			n if n % 2 == 0 => Err(Error::NodeCountNotOdd),
			n => Ok(Self(n / 2 + 1)),
		}
	}
}

// position among leaves only, which is what goes on the wire
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LeafIndex(pub u32);

impl TryFrom<NodeIndex> for LeafIndex {
	type Error = Error;

	fn try_from(x: NodeIndex) -> Result<Self, Self::Error> {
		if x.is_leaf() {
			Ok(Self(x.0 / 2))
		} else {
			Err(Error::LeafNotEvenInNodeSpace)
		}
	}
}

impl Serialize for LeafIndex {
	fn encode(&self, w: &mut Writer) {
		w.u32(self.0);
	}
}

impl Deserialize for LeafIndex {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self(r.u32()?))
	}
}

// position in the array form: leaves at even slots, parents at odd ones
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeIndex(pub u32);

impl From<LeafIndex> for NodeIndex {
	fn from(li: LeafIndex) -> Self {
		Self(li.0 * 2)
	}
}

impl NodeIndex {
	// the largest 2^k - 1 that fits the tree
	pub fn root(lc: LeafCount) -> Result<Self, Error> {
		let nc = NodeCount::from(lc).0;

		if nc == 0 {
			return Err(Error::EmptyTree);
		}

		let width = u32::BITS - nc.leading_zeros();

		Ok(Self((1 << (width - 1)) - 1))
	}

	pub fn as_usize(&self) -> usize {
		self.0 as usize
	}

	pub fn is_leaf(&self) -> bool {
		self.0 % 2 == 0
	}

	// leaves are at level 0, their parents at 1 and so on
	pub fn level(&self) -> u32 {
		self.0.trailing_ones()
	}

	pub fn left(&self) -> Result<Self, Error> {
		match self.level() {
			0 => Err(Error::LeafCantHaveChildren),
			k => Ok(Self(self.0 ^ (1 << (k - 1)))),
		}
	}

	pub fn right(&self) -> Result<Self, Error> {
		match self.level() {
			0 => Err(Error::LeafCantHaveChildren),
			k => Ok(Self(self.0 ^ (3 << (k - 1)))),
		}
	}

	pub fn children(&self) -> Result<(Self, Self), Error> {
		Ok((self.left()?, self.right()?))
	}

	fn ensure_within(&self, lc: LeafCount) -> Result<(), Error> {
		let r = NodeCount::from(lc);

		if self.0 >= r.0 {
			Err(Error::NodeOutOfRange { n: *self, r })
		} else {
			Ok(())
		}
	}

	pub fn parent(&self, lc: LeafCount) -> Result<Self, Error> {
		if *self == Self::root(lc)? {
			return Err(Error::RootCantHaveParent);
		}

		self.ensure_within(lc)?;

		let k = self.level();

		Ok(Self((self.0 | (1 << k)) & !(1 << (k + 1))))
	}

	pub fn sibling(&self, lc: LeafCount) -> Result<Self, Error> {
		let (l, r) = self.parent(lc)?.children()?;

		Ok(if l == *self { r } else { l })
	}

	// the parent, its parent and so on up to the root; empty for the root itself
	pub fn direct_path(&self, lc: LeafCount) -> Result<Vec<Self>, Error> {
		self.ensure_within(lc)?;

		let root = Self::root(lc)?;
		let mut path = Vec::new();
		let mut x = *self;

		while x != root {
			x = x.parent(lc)?;
			path.push(x);
		}

		Ok(path)
	}

	// the sibling of the node itself and of every direct path node below the root
	pub fn copath(&self, lc: LeafCount) -> Result<Vec<Self>, Error> {
		let dp = self.direct_path(lc)?;
		let root = Self::root(lc)?;

		std::iter::once(*self)
			.chain(dp)
			.filter(|&x| x != root)
			.map(|x| x.sibling(lc))
			.collect()
	}
}
