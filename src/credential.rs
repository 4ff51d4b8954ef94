use crate::codec::{self, Deserialize, Reader, Serialize, Writer};

const BASIC: u16 = 0x0001;
const X509: u16 = 0x0002;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Credential {
	Basic { identity: Vec<u8> },
	// DER certificates, leaf first
	X509 { certificates: Vec<Vec<u8>> },
}

impl Credential {
	pub fn basic(identity: &[u8]) -> Self {
		Self::Basic {
			identity: identity.to_vec(),
		}
	}

	pub fn credential_type(&self) -> u16 {
		match self {
			Self::Basic { .. } => BASIC,
			Self::X509 { .. } => X509,
		}
	}
}

impl Serialize for Credential {
	fn encode(&self, w: &mut Writer) {
		w.u16(self.credential_type());

		match self {
			Self::Basic { identity } => w.opaque(identity),
			Self::X509 { certificates } => {
				w.vector(|w| certificates.iter().for_each(|cert| w.opaque(cert)))
			}
		}
	}
}

impl Deserialize for Credential {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		match r.u16()? {
			BASIC => Ok(Self::Basic {
				identity: r.opaque()?,
			}),
			X509 => Ok(Self::X509 {
				certificates: r.vector(|r| r.opaque())?,
			}),
			other => Err(codec::Error::UnknownValue {
				field: "credential type",
				value: other as u64,
			}),
		}
	}
}

// raw wire values: a member may advertise values this crate does not know
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Capabilities {
	pub versions: Vec<u16>,
	pub cipher_suites: Vec<u16>,
	pub extensions: Vec<u16>,
	pub proposals: Vec<u16>,
	pub credentials: Vec<u16>,
}

impl Serialize for Capabilities {
	fn encode(&self, w: &mut Writer) {
		w.items(&self.versions);
		w.items(&self.cipher_suites);
		w.items(&self.extensions);
		w.items(&self.proposals);
		w.items(&self.credentials);
	}
}

impl Deserialize for Capabilities {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			versions: r.items()?,
			cipher_suites: r.items()?,
			extensions: r.items()?,
			proposals: r.items()?,
			credentials: r.items()?,
		})
	}
}

// seconds since the epoch, both ends inclusive
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Lifetime {
	pub not_before: u64,
	pub not_after: u64,
}

impl Lifetime {
	pub fn contains(&self, time: u64) -> bool {
		self.not_before <= time && time <= self.not_after
	}
}

impl Serialize for Lifetime {
	fn encode(&self, w: &mut Writer) {
		w.u64(self.not_before);
		w.u64(self.not_after);
	}
}

impl Deserialize for Lifetime {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			not_before: r.u64()?,
			not_after: r.u64()?,
		})
	}
}
