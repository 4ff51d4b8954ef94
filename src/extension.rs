use crate::codec::{self, Deserialize, Reader, Serialize, Writer};

// the payload stays opaque at this layer; no extension is interpreted
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Extension {
	pub extension_type: u16,
	pub extension_data: Vec<u8>,
}

impl Extension {
	pub fn new(extension_type: u16, extension_data: Vec<u8>) -> Self {
		Self {
			extension_type,
			extension_data,
		}
	}
}

impl Serialize for Extension {
	fn encode(&self, w: &mut Writer) {
		w.u16(self.extension_type);
		w.opaque(&self.extension_data);
	}
}

impl Deserialize for Extension {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			extension_type: r.u16()?,
			extension_data: r.opaque()?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::Extension;
	use crate::codec::{deserialize, Reader, Writer};

	#[test]
	fn test_extension_vector() {
		let exts = vec![Extension::new(3, b"abc".to_vec()), Extension::new(0xff00, vec![])];
		let mut w = Writer::new();
		w.items(&exts);
		let bytes = w.finish().unwrap();

		assert_eq!(bytes, b"\x09\x00\x03\x03abc\xff\x00\x00");
		assert_eq!(Reader::new(&bytes).items::<Extension>(), Ok(exts));
	}

	#[test]
	fn test_truncated_data_is_rejected() {
		assert!(deserialize::<Extension>(b"\x00\x03\x04abc").is_err());
	}
}
