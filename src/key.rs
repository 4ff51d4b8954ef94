// Accepts a type name, outputs a variable-size key type serialized as `opaque<V>`, eg HpkePublicKey, SignaturePrivateKey
macro_rules! key {
	($type: ident) => {
		#[derive(Clone, PartialEq, Eq, Hash, Debug)]
		pub struct $type(Vec<u8>);

		impl $type {
			pub fn new(bytes: Vec<u8>) -> Self {
				Self(bytes)
			}

			pub fn as_bytes(&self) -> &[u8] {
				&self.0
			}
		}

		impl From<Vec<u8>> for $type {
			fn from(bytes: Vec<u8>) -> Self {
				Self::new(bytes)
			}
		}

		impl From<&[u8]> for $type {
			fn from(bytes: &[u8]) -> Self {
				Self::new(bytes.to_vec())
			}
		}

		impl $crate::codec::Serialize for $type {
			fn encode(&self, w: &mut $crate::codec::Writer) {
				w.opaque(&self.0);
			}
		}

		impl $crate::codec::Deserialize for $type {
			fn decode(r: &mut $crate::codec::Reader) -> Result<Self, $crate::codec::Error> {
				Ok(Self(r.opaque()?))
			}
		}
	};
}

pub(crate) use key;
