use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::group_context::GroupId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PskType {
	External = 1,
	Resumption = 2,
}

impl TryFrom<u8> for PskType {
	type Error = codec::Error;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			1 => Ok(Self::External),
			2 => Ok(Self::Resumption),
			_ => Err(codec::Error::UnknownValue {
				field: "psk type",
				value: value as u64,
			}),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResumptionPskUsage {
	Application = 1,
	Reinit = 2,
	Branch = 3,
}

impl TryFrom<u8> for ResumptionPskUsage {
	type Error = codec::Error;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		match value {
			1 => Ok(Self::Application),
			2 => Ok(Self::Reinit),
			3 => Ok(Self::Branch),
			_ => Err(codec::Error::UnknownValue {
				field: "resumption psk usage",
				value: value as u64,
			}),
		}
	}
}

impl Serialize for ResumptionPskUsage {
	fn encode(&self, w: &mut Writer) {
		w.u8(*self as u8);
	}
}

impl Deserialize for ResumptionPskUsage {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Self::try_from(r.u8()?)
	}
}

// usage, group and epoch exist for resumption psks only
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Psk {
	External {
		psk_id: Vec<u8>,
	},
	Resumption {
		usage: ResumptionPskUsage,
		psk_group_id: GroupId,
		psk_epoch: u64,
	},
}

impl Psk {
	pub fn psk_type(&self) -> PskType {
		match self {
			Self::External { .. } => PskType::External,
			Self::Resumption { .. } => PskType::Resumption,
		}
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PreSharedKeyId {
	pub psk: Psk,
	pub psk_nonce: Vec<u8>,
}

impl Serialize for PreSharedKeyId {
	fn encode(&self, w: &mut Writer) {
		w.u8(self.psk.psk_type() as u8);

		match &self.psk {
			Psk::External { psk_id } => w.opaque(psk_id),
			Psk::Resumption {
				usage,
				psk_group_id,
				psk_epoch,
			} => {
				usage.encode(w);
				psk_group_id.encode(w);
				w.u64(*psk_epoch);
			}
		}

		w.opaque(&self.psk_nonce);
	}
}

impl Deserialize for PreSharedKeyId {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		let psk = match PskType::try_from(r.u8()?)? {
			PskType::External => Psk::External { psk_id: r.opaque()? },
			PskType::Resumption => Psk::Resumption {
				usage: ResumptionPskUsage::decode(r)?,
				psk_group_id: GroupId::decode(r)?,
				psk_epoch: r.u64()?,
			},
		};

		Ok(Self {
			psk,
			psk_nonce: r.opaque()?,
		})
	}
}

// binds every chained psk to its position in the list
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PskLabel<'a> {
	pub id: &'a PreSharedKeyId,
	pub index: u16,
	pub count: u16,
}

impl Serialize for PskLabel<'_> {
	fn encode(&self, w: &mut Writer) {
		self.id.encode(w);
		w.u16(self.index);
		w.u16(self.count);
	}
}

#[cfg(test)]
mod tests {
	use super::{PreSharedKeyId, Psk, PskLabel, ResumptionPskUsage};
	use crate::codec::{self, deserialize, serialize};
	use crate::group_context::GroupId;

	fn external() -> PreSharedKeyId {
		PreSharedKeyId {
			psk: Psk::External { psk_id: b"id".to_vec() },
			psk_nonce: b"nonce".to_vec(),
		}
	}

	fn resumption() -> PreSharedKeyId {
		PreSharedKeyId {
			psk: Psk::Resumption {
				usage: ResumptionPskUsage::Branch,
				psk_group_id: GroupId::new(b"g".to_vec()),
				psk_epoch: 7,
			},
			psk_nonce: b"n".to_vec(),
		}
	}

	#[test]
	fn test_external_wire_form() {
		let bytes = serialize(&external()).unwrap();

		// no usage byte for external psks
		assert_eq!(bytes, b"\x01\x02id\x05nonce");
		assert_eq!(deserialize::<PreSharedKeyId>(&bytes), Ok(external()));
	}

	#[test]
	fn test_resumption_wire_form() {
		let bytes = serialize(&resumption()).unwrap();

		assert_eq!(bytes, b"\x02\x03\x01g\x00\x00\x00\x00\x00\x00\x00\x07\x01n");
		assert_eq!(deserialize::<PreSharedKeyId>(&bytes), Ok(resumption()));
	}

	#[test]
	fn test_unknown_tags_are_rejected() {
		assert_eq!(
			deserialize::<PreSharedKeyId>(b"\x03\x02id\x05nonce"),
			Err(codec::Error::UnknownValue { field: "psk type", value: 3 })
		);
		assert_eq!(
			deserialize::<PreSharedKeyId>(b"\x00\x02id\x05nonce"),
			Err(codec::Error::UnknownValue { field: "psk type", value: 0 })
		);
		assert_eq!(
			deserialize::<PreSharedKeyId>(b"\x02\x04\x01g\x00\x00\x00\x00\x00\x00\x00\x07\x01n"),
			Err(codec::Error::UnknownValue { field: "resumption psk usage", value: 4 })
		);
		assert_eq!(
			deserialize::<PreSharedKeyId>(b"\x02\x00\x01g\x00\x00\x00\x00\x00\x00\x00\x07\x01n"),
			Err(codec::Error::UnknownValue { field: "resumption psk usage", value: 0 })
		);
	}

	#[test]
	fn test_label_wire_form() {
		let id = external();
		let label = PskLabel {
			id: &id,
			index: 1,
			count: 2,
		};

		assert_eq!(serialize(&label).unwrap(), b"\x01\x02id\x05nonce\x00\x01\x00\x02");
	}
}
