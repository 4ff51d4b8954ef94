use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::crypto::CipherSuite;
use crate::extension::Extension;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProtocolVersion {
	Mls10,
}

impl ProtocolVersion {
	pub const MLS10: u16 = 1;
}

impl Serialize for ProtocolVersion {
	fn encode(&self, w: &mut Writer) {
		match self {
			Self::Mls10 => w.u16(Self::MLS10),
		}
	}
}

impl Deserialize for ProtocolVersion {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		match r.u16()? {
			Self::MLS10 => Ok(Self::Mls10),
			other => Err(codec::Error::UnsupportedVersion(other)),
		}
	}
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct GroupId(Vec<u8>);

impl GroupId {
	pub fn new(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl Serialize for GroupId {
	fn encode(&self, w: &mut Writer) {
		w.opaque(&self.0);
	}
}

impl Deserialize for GroupId {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self(r.opaque()?))
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GroupContext {
	pub version: ProtocolVersion,
	pub cipher_suite: CipherSuite,
	pub group_id: GroupId,
	pub epoch: u64,
	pub tree_hash: Vec<u8>,
	pub confirmed_transcript_hash: Vec<u8>,
	pub extensions: Vec<Extension>,
}

impl Serialize for GroupContext {
	fn encode(&self, w: &mut Writer) {
		self.version.encode(w);
		self.cipher_suite.encode(w);
		self.group_id.encode(w);
		w.u64(self.epoch);
		w.opaque(&self.tree_hash);
		w.opaque(&self.confirmed_transcript_hash);
		w.items(&self.extensions);
	}
}

// the version goes first, so nothing else is read for an unknown one
impl Deserialize for GroupContext {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			version: ProtocolVersion::decode(r)?,
			cipher_suite: CipherSuite::decode(r)?,
			group_id: GroupId::decode(r)?,
			epoch: r.u64()?,
			tree_hash: r.opaque()?,
			confirmed_transcript_hash: r.opaque()?,
			extensions: r.items()?,
		})
	}
}
