use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::crypto::{self, CipherSuite, HpkePublicKey, SignaturePrivateKey};
use crate::extension::Extension;
use crate::group_context::{GroupId, ProtocolVersion};
use crate::key::key;
use crate::leaf_node::{LeafNode, LeafNodeSource};
use crate::treemath::LeafIndex;

const SIGN_LABEL: &[u8] = b"KeyPackageTBS";
const REF_LABEL: &[u8] = b"MLS 1.0 KeyPackage Reference";

// content-derived handle a welcome uses to address its recipients
key!(KeyPackageRef);

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct KeyPackage {
	pub version: ProtocolVersion,
	pub cipher_suite: CipherSuite,
	// the joiner decrypts its welcome secrets with the matching private key
	pub init_key: HpkePublicKey,
	pub leaf_node: LeafNode,
	pub extensions: Vec<Extension>,
	pub signature: Vec<u8>,
}

impl KeyPackage {
	pub fn new(
		cipher_suite: CipherSuite,
		init_key: HpkePublicKey,
		leaf_node: LeafNode,
		extensions: Vec<Extension>,
		ssk: &SignaturePrivateKey,
	) -> Result<Self, crypto::Error> {
		let mut kp = Self {
			version: ProtocolVersion::Mls10,
			cipher_suite,
			init_key,
			leaf_node,
			extensions,
			signature: Vec::new(),
		};
		kp.signature = cipher_suite.sign_with_label(ssk, SIGN_LABEL, &kp.tbs()?)?;

		Ok(kp)
	}

	fn encode_content(&self, w: &mut Writer) {
		self.version.encode(w);
		self.cipher_suite.encode(w);
		self.init_key.encode(w);
		self.leaf_node.encode(w);
		w.items(&self.extensions);
	}

	pub fn tbs(&self) -> Result<Vec<u8>, codec::Error> {
		let mut w = Writer::new();
		self.encode_content(&mut w);

		w.finish()
	}

	// checks both the package and its leaf node, which has to come from a key package
	pub fn verify(&self) -> bool {
		if !matches!(self.leaf_node.source, LeafNodeSource::KeyPackage(_)) {
			return false;
		}

		let Ok(tbs) = self.tbs() else {
			return false;
		};

		// a key package source binds no group and no position
		self.cipher_suite.verify_with_label(
			&self.leaf_node.signature_key,
			SIGN_LABEL,
			&tbs,
			&self.signature,
		) && self
			.leaf_node
			.verify_signature(self.cipher_suite, &GroupId::new(Vec::new()), LeafIndex(0))
	}

	pub fn reference(&self) -> Result<KeyPackageRef, crypto::Error> {
		let bytes = codec::serialize(self)?;

		Ok(KeyPackageRef::new(self.cipher_suite.ref_hash(REF_LABEL, &bytes)?))
	}
}

impl Serialize for KeyPackage {
	fn encode(&self, w: &mut Writer) {
		self.encode_content(w);
		w.opaque(&self.signature);
	}
}

impl Deserialize for KeyPackage {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			version: ProtocolVersion::decode(r)?,
			cipher_suite: CipherSuite::decode(r)?,
			init_key: HpkePublicKey::decode(r)?,
			leaf_node: LeafNode::decode(r)?,
			extensions: r.items()?,
			signature: r.opaque()?,
		})
	}
}
