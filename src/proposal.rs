use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::crypto::{self, CipherSuite};
use crate::extension::Extension;
use crate::group_context::{GroupId, ProtocolVersion};
use crate::key::key;
use crate::key_package::KeyPackage;
use crate::leaf_node::LeafNode;
use crate::psk::PreSharedKeyId;
use crate::treemath::LeafIndex;

const REF_LABEL: &[u8] = b"MLS 1.0 Proposal Reference";

key!(ProposalRef);

impl ProposalRef {
	// `content` is the encoded AuthenticatedContent that carried the proposal
	pub fn compute(suite: CipherSuite, content: &[u8]) -> Result<Self, crypto::Error> {
		Ok(Self::new(suite.ref_hash(REF_LABEL, content)?))
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProposalType {
	Add = 0x0001,
	Update = 0x0002,
	Remove = 0x0003,
	PreSharedKey = 0x0004,
	ReInit = 0x0005,
	ExternalInit = 0x0006,
	GroupContextExtensions = 0x0007,
}

impl TryFrom<u16> for ProposalType {
	type Error = codec::Error;

	fn try_from(value: u16) -> Result<Self, Self::Error> {
		match value {
			0x0001 => Ok(Self::Add),
			0x0002 => Ok(Self::Update),
			0x0003 => Ok(Self::Remove),
			0x0004 => Ok(Self::PreSharedKey),
			0x0005 => Ok(Self::ReInit),
			0x0006 => Ok(Self::ExternalInit),
			0x0007 => Ok(Self::GroupContextExtensions),
			_ => Err(codec::Error::UnknownValue {
				field: "proposal type",
				value: value as u64,
			}),
		}
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Proposal {
	Add {
		key_package: KeyPackage,
	},
	Update {
		leaf_node: LeafNode,
	},
	Remove {
		removed: LeafIndex,
	},
	PreSharedKey {
		psk: PreSharedKeyId,
	},
	ReInit {
		group_id: GroupId,
		version: ProtocolVersion,
		cipher_suite: CipherSuite,
		extensions: Vec<Extension>,
	},
	ExternalInit {
		kem_output: Vec<u8>,
	},
	GroupContextExtensions {
		extensions: Vec<Extension>,
	},
}

impl Proposal {
	pub fn proposal_type(&self) -> ProposalType {
		match self {
			Self::Add { .. } => ProposalType::Add,
			Self::Update { .. } => ProposalType::Update,
			Self::Remove { .. } => ProposalType::Remove,
			Self::PreSharedKey { .. } => ProposalType::PreSharedKey,
			Self::ReInit { .. } => ProposalType::ReInit,
			Self::ExternalInit { .. } => ProposalType::ExternalInit,
			Self::GroupContextExtensions { .. } => ProposalType::GroupContextExtensions,
		}
	}
}

impl Serialize for Proposal {
	fn encode(&self, w: &mut Writer) {
		w.u16(self.proposal_type() as u16);

		match self {
			Self::Add { key_package } => key_package.encode(w),
			Self::Update { leaf_node } => leaf_node.encode(w),
			Self::Remove { removed } => removed.encode(w),
			Self::PreSharedKey { psk } => psk.encode(w),
			Self::ReInit {
				group_id,
				version,
				cipher_suite,
				extensions,
			} => {
				group_id.encode(w);
				version.encode(w);
				cipher_suite.encode(w);
				w.items(extensions);
			}
			Self::ExternalInit { kem_output } => w.opaque(kem_output),
			Self::GroupContextExtensions { extensions } => w.items(extensions),
		}
	}
}

impl Deserialize for Proposal {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(match ProposalType::try_from(r.u16()?)? {
			ProposalType::Add => Self::Add {
				key_package: KeyPackage::decode(r)?,
			},
			ProposalType::Update => Self::Update {
				leaf_node: LeafNode::decode(r)?,
			},
			ProposalType::Remove => Self::Remove {
				removed: LeafIndex::decode(r)?,
			},
			ProposalType::PreSharedKey => Self::PreSharedKey {
				psk: PreSharedKeyId::decode(r)?,
			},
			ProposalType::ReInit => Self::ReInit {
				group_id: GroupId::decode(r)?,
				version: ProtocolVersion::decode(r)?,
				cipher_suite: CipherSuite::decode(r)?,
				extensions: r.items()?,
			},
			ProposalType::ExternalInit => Self::ExternalInit {
				kem_output: r.opaque()?,
			},
			ProposalType::GroupContextExtensions => Self::GroupContextExtensions {
				extensions: r.items()?,
			},
		})
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ProposalOrRef {
	Proposal(Proposal),
	Reference(ProposalRef),
}

impl Serialize for ProposalOrRef {
	fn encode(&self, w: &mut Writer) {
		match self {
			Self::Proposal(proposal) => {
				w.u8(1);
				proposal.encode(w);
			}
			Self::Reference(reference) => {
				w.u8(2);
				reference.encode(w);
			}
		}
	}
}

impl Deserialize for ProposalOrRef {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		match r.u8()? {
			1 => Ok(Self::Proposal(Proposal::decode(r)?)),
			2 => Ok(Self::Reference(ProposalRef::decode(r)?)),
			other => Err(codec::Error::UnknownValue {
				field: "proposal or ref type",
				value: other as u64,
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::{Proposal, ProposalOrRef, ProposalRef, REF_LABEL};
	use crate::codec::{self, deserialize, serialize, Writer};
	use crate::crypto::CipherSuite;
	use crate::extension::Extension;
	use crate::group_context::{GroupId, ProtocolVersion};
	use crate::leaf_node::LeafNodeSource;
	use crate::psk::{PreSharedKeyId, Psk};
	use crate::test_utils::{key_package, leaf_node, SUITE};
	use crate::treemath::LeafIndex;
	use sha2::{Digest, Sha256};

	#[test]
	fn test_remove_wire_form() {
		let remove = Proposal::Remove { removed: LeafIndex(5) };
		let bytes = serialize(&remove).unwrap();

		assert_eq!(bytes, b"\x00\x03\x00\x00\x00\x05");
		assert_eq!(deserialize::<Proposal>(&bytes), Ok(remove));
	}

	#[test]
	fn test_every_variant_decodes_to_itself() {
		let (kp, _) = key_package(b"alice");
		let (leaf, _) = leaf_node(b"bob", LeafNodeSource::Update, LeafIndex(1));
		let proposals = vec![
			Proposal::Add { key_package: kp },
			Proposal::Update { leaf_node: leaf },
			Proposal::Remove { removed: LeafIndex(2) },
			Proposal::PreSharedKey {
				psk: PreSharedKeyId {
					psk: Psk::External { psk_id: b"id".to_vec() },
					psk_nonce: b"nonce".to_vec(),
				},
			},
			Proposal::ReInit {
				group_id: GroupId::new(b"new group".to_vec()),
				version: ProtocolVersion::Mls10,
				cipher_suite: CipherSuite::Mls128DhKemX25519ChaCha20Poly1305Sha256Ed25519,
				extensions: vec![Extension::new(1, vec![2])],
			},
			Proposal::ExternalInit { kem_output: vec![3u8; 32] },
			Proposal::GroupContextExtensions { extensions: vec![] },
		];

		proposals.into_iter().enumerate().for_each(|(i, p)| {
			let bytes = serialize(&p).unwrap();

			assert_eq!(bytes[..2], [0, i as u8 + 1]);
			assert_eq!(deserialize::<Proposal>(&bytes), Ok(p));
		});
	}

	#[test]
	fn test_unknown_proposal_type() {
		[0u16, 8, 0xffff].into_iter().for_each(|t| {
			let mut bytes = t.to_be_bytes().to_vec();
			bytes.extend_from_slice(b"\x00\x00\x00\x05");

			assert_eq!(
				deserialize::<Proposal>(&bytes),
				Err(codec::Error::UnknownValue { field: "proposal type", value: t as u64 })
			);
		});
	}

	#[test]
	fn test_proposal_or_ref() {
		let by_value = ProposalOrRef::Proposal(Proposal::Remove { removed: LeafIndex(1) });
		let by_ref = ProposalOrRef::Reference(ProposalRef::new(vec![7u8; 32]));

		assert_eq!(serialize(&by_value).unwrap()[0], 1);
		assert_eq!(serialize(&by_ref).unwrap()[..2], [2, 32]);
		assert_eq!(deserialize::<ProposalOrRef>(&serialize(&by_value).unwrap()), Ok(by_value));
		assert_eq!(deserialize::<ProposalOrRef>(&serialize(&by_ref).unwrap()), Ok(by_ref));

		[0u8, 3].into_iter().for_each(|t| {
			assert_eq!(
				deserialize::<ProposalOrRef>(&[t, 1, 1]),
				Err(codec::Error::UnknownValue { field: "proposal or ref type", value: t as u64 })
			);
		});
	}

	#[test]
	fn test_proposal_ref() {
		let mut w = Writer::new();
		w.opaque(REF_LABEL);
		w.opaque(b"content");

		assert_eq!(
			ProposalRef::compute(SUITE, b"content").unwrap().as_bytes(),
			Sha256::digest(w.finish().unwrap()).as_slice()
		);
	}
}
