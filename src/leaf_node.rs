use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::credential::{Capabilities, Credential, Lifetime};
use crate::crypto::{self, CipherSuite, HpkePublicKey, SignaturePrivateKey, SignaturePublicKey};
use crate::extension::Extension;
use crate::group_context::GroupId;
use crate::treemath::LeafIndex;

const SIGN_LABEL: &[u8] = b"LeafNodeTBS";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LeafNodeSource {
	KeyPackage(Lifetime),
	Update,
	// the parent hash of the first node on the committer's filtered direct path
	Commit(Vec<u8>),
}

impl LeafNodeSource {
	fn tag(&self) -> u8 {
		match self {
			Self::KeyPackage(_) => 1,
			Self::Update => 2,
			Self::Commit(_) => 3,
		}
	}
}

impl Serialize for LeafNodeSource {
	fn encode(&self, w: &mut Writer) {
		w.u8(self.tag());

		match self {
			Self::KeyPackage(lifetime) => lifetime.encode(w),
			Self::Update => (),
			Self::Commit(parent_hash) => w.opaque(parent_hash),
		}
	}
}

impl Deserialize for LeafNodeSource {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		match r.u8()? {
			1 => Ok(Self::KeyPackage(Lifetime::decode(r)?)),
			2 => Ok(Self::Update),
			3 => Ok(Self::Commit(r.opaque()?)),
			other => Err(codec::Error::UnknownValue {
				field: "leaf node source",
				value: other as u64,
			}),
		}
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LeafNode {
	pub encryption_key: HpkePublicKey,
	pub signature_key: SignaturePublicKey,
	pub credential: Credential,
	pub capabilities: Capabilities,
	pub source: LeafNodeSource,
	pub extensions: Vec<Extension>,
	pub signature: Vec<u8>,
}

impl LeafNode {
	// the parent hash a commit source carries, if any
	pub fn parent_hash(&self) -> Option<&[u8]> {
		match &self.source {
			LeafNodeSource::Commit(parent_hash) => Some(parent_hash.as_slice()),
			_ => None,
		}
	}

	fn encode_content(&self, w: &mut Writer) {
		self.encryption_key.encode(w);
		self.signature_key.encode(w);
		self.credential.encode(w);
		self.capabilities.encode(w);
		self.source.encode(w);
		w.items(&self.extensions);
	}

	// group_id and leaf_index are bound for update and commit sources only
	pub fn tbs(&self, group_id: &GroupId, leaf_index: LeafIndex) -> Result<Vec<u8>, codec::Error> {
		let mut w = Writer::new();
		self.encode_content(&mut w);

		match self.source {
			LeafNodeSource::KeyPackage(_) => (),
			LeafNodeSource::Update | LeafNodeSource::Commit(_) => {
				group_id.encode(&mut w);
				leaf_index.encode(&mut w);
			}
		}

		w.finish()
	}

	pub fn sign(
		&mut self,
		suite: CipherSuite,
		key: &SignaturePrivateKey,
		group_id: &GroupId,
		leaf_index: LeafIndex,
	) -> Result<(), crypto::Error> {
		let tbs = self.tbs(group_id, leaf_index)?;
		self.signature = suite.sign_with_label(key, SIGN_LABEL, &tbs)?;

		Ok(())
	}

	pub fn verify_signature(&self, suite: CipherSuite, group_id: &GroupId, leaf_index: LeafIndex) -> bool {
		match self.tbs(group_id, leaf_index) {
			Ok(tbs) => suite.verify_with_label(&self.signature_key, SIGN_LABEL, &tbs, &self.signature),
			Err(_) => false,
		}
	}
}

impl Serialize for LeafNode {
	fn encode(&self, w: &mut Writer) {
		self.encode_content(w);
		w.opaque(&self.signature);
	}
}

impl Deserialize for LeafNode {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			encryption_key: HpkePublicKey::decode(r)?,
			signature_key: SignaturePublicKey::decode(r)?,
			credential: Credential::decode(r)?,
			capabilities: Capabilities::decode(r)?,
			source: LeafNodeSource::decode(r)?,
			extensions: r.items()?,
			signature: r.opaque()?,
		})
	}
}
