use thiserror::Error;
use tracing::warn;

use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::crypto::{self, CipherSuite, SignaturePrivateKey, SignaturePublicKey};
use crate::extension::Extension;
use crate::group_context::GroupContext;
use crate::tree::{self, RatchetTree};
use crate::treemath::LeafIndex;

const SIGN_LABEL: &[u8] = b"GroupInfoTBS";

#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
	#[error("the tree does not hash to the group context's tree hash")]
	TreeHashMismatch,
	#[error("invalid parent hashes")]
	InvalidParentHashes,
	#[error("no signer at leaf {0:?}")]
	UnknownSigner(LeafIndex),
	#[error(transparent)]
	Tree(#[from] tree::Error),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GroupInfo {
	pub group_context: GroupContext,
	pub extensions: Vec<Extension>,
	pub confirmation_tag: Vec<u8>,
	pub signer: LeafIndex,
	pub signature: Vec<u8>,
}

impl GroupInfo {
	fn encode_content(&self, w: &mut Writer) {
		self.group_context.encode(w);
		w.items(&self.extensions);
		w.opaque(&self.confirmation_tag);
		self.signer.encode(w);
	}

	// everything but the signature
	pub fn tbs(&self) -> Result<Vec<u8>, codec::Error> {
		let mut w = Writer::new();
		self.encode_content(&mut w);

		w.finish()
	}

	pub fn sign(&mut self, suite: CipherSuite, key: &SignaturePrivateKey) -> Result<(), crypto::Error> {
		self.signature = suite.sign_with_label(key, SIGN_LABEL, &self.tbs()?)?;

		Ok(())
	}

	pub fn verify(&self, suite: CipherSuite, key: &SignaturePublicKey) -> bool {
		match self.tbs() {
			Ok(tbs) => suite.verify_with_label(key, SIGN_LABEL, &tbs, &self.signature),
			Err(_) => false,
		}
	}

	pub fn signer_key<'a>(&self, tree: &'a RatchetTree) -> Option<&'a SignaturePublicKey> {
		tree.get_leaf(self.signer).map(|leaf| &leaf.signature_key)
	}

	// binds a tree received out of band to this group info; run after a welcome is processed
	pub fn verify_tree(&self, suite: CipherSuite, tree: &RatchetTree) -> Result<(), Error> {
		if tree.tree_hash(suite)? != self.group_context.tree_hash {
			warn!("tree hash mismatch");

			return Err(Error::TreeHashMismatch);
		}

		if !tree.verify_parent_hashes(suite) {
			return Err(Error::InvalidParentHashes);
		}

		if self.signer_key(tree).is_none() {
			return Err(Error::UnknownSigner(self.signer));
		}

		Ok(())
	}
}

impl Serialize for GroupInfo {
	fn encode(&self, w: &mut Writer) {
		self.encode_content(w);
		w.opaque(&self.signature);
	}
}

impl Deserialize for GroupInfo {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			group_context: GroupContext::decode(r)?,
			extensions: r.items()?,
			confirmation_tag: r.opaque()?,
			signer: LeafIndex::decode(r)?,
			signature: r.opaque()?,
		})
	}
}
