use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::crypto::HpkePublicKey;
use crate::hpke::HpkeCiphertext;
use crate::leaf_node::LeafNode;
use crate::proposal::{Proposal, ProposalOrRef, ProposalRef};
use crate::tree::{self, RatchetTree};
use crate::treemath::LeafIndex;

#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
	#[error("no proposal for reference {0:?}")]
	UnknownProposalRef(ProposalRef),
	#[error(transparent)]
	Tree(#[from] tree::Error),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UpdatePathNode {
	pub encryption_key: HpkePublicKey,
	// one path secret per node in the copath child's resolution
	pub encrypted_path_secret: Vec<HpkeCiphertext>,
}

impl Serialize for UpdatePathNode {
	fn encode(&self, w: &mut Writer) {
		self.encryption_key.encode(w);
		w.items(&self.encrypted_path_secret);
	}
}

impl Deserialize for UpdatePathNode {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			encryption_key: HpkePublicKey::decode(r)?,
			encrypted_path_secret: r.items()?,
		})
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct UpdatePath {
	pub leaf_node: LeafNode,
	pub nodes: Vec<UpdatePathNode>,
}

impl Serialize for UpdatePath {
	fn encode(&self, w: &mut Writer) {
		self.leaf_node.encode(w);
		w.items(&self.nodes);
	}
}

impl Deserialize for UpdatePath {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			leaf_node: LeafNode::decode(r)?,
			nodes: r.items()?,
		})
	}
}

// the order of proposals is the order they are applied in
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Commit {
	pub proposals: Vec<ProposalOrRef>,
	pub path: Option<UpdatePath>,
}

impl Commit {
	// references are looked up in proposals received earlier in the epoch
	pub fn resolve_proposals(&self, cache: &HashMap<ProposalRef, Proposal>) -> Result<Vec<Proposal>, Error> {
		self.proposals
			.iter()
			.map(|por| match por {
				ProposalOrRef::Proposal(proposal) => Ok(proposal.clone()),
				ProposalOrRef::Reference(reference) => cache
					.get(reference)
					.cloned()
					.ok_or(Error::UnknownProposalRef(reference.clone())),
			})
			.collect()
	}
}

// adds every Add's leaf in order; other proposals are left to the caller.
// the tree is left untouched unless every add succeeds
pub fn apply_adds(proposals: &[Proposal], tree: &mut RatchetTree) -> Result<Vec<LeafIndex>, Error> {
	let mut next = tree.clone();
	let added = proposals
		.iter()
		.filter_map(|proposal| match proposal {
			Proposal::Add { key_package } => Some(key_package.leaf_node.clone()),
			_ => None,
		})
		.map(|leaf| next.add(leaf))
		.collect::<Result<Vec<LeafIndex>, tree::Error>>()?;

	*tree = next;

	debug!(count = added.len(), "applied add proposals");

	Ok(added)
}

impl Serialize for Commit {
	fn encode(&self, w: &mut Writer) {
		w.items(&self.proposals);
		w.optional(self.path.as_ref());
	}
}

impl Deserialize for Commit {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			proposals: r.items()?,
			path: r.optional()?,
		})
	}
}
