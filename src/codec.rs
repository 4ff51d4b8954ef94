use thiserror::Error;

// TLS presentation language with the variable-length vector prefix: big-endian integers,
// `opaque x<V>` and `T x<V>` are prefixed by a 1, 2 or 4 byte length, `optional<T>` by a presence byte

#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
	#[error("unexpected end of input")]
	UnexpectedEnd,
	#[error("{0} trailing bytes after the last field")]
	TrailingBytes(usize),
	#[error("invalid variable-length integer")]
	InvalidVarint,
	#[error("invalid optional presence flag {0}")]
	InvalidOptional(u8),
	#[error("invalid {field} {value}")]
	UnknownValue { field: &'static str, value: u64 },
	#[error("unsupported protocol version {0}")]
	UnsupportedVersion(u16),
	#[error("length {0} exceeds the variable-length limit")]
	LengthOverflow(usize),
	#[error("malformed {0}")]
	Malformed(&'static str),
}

// 2^30 - 1, the largest length a 4 byte prefix can carry
pub const MAX_LEN: usize = (1 << 30) - 1;

pub trait Serialize {
	fn encode(&self, w: &mut Writer);
}

pub trait Deserialize: Sized {
	fn decode(r: &mut Reader) -> Result<Self, Error>;
}

pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
	let mut w = Writer::new();
	value.encode(&mut w);

	w.finish()
}

// the whole buffer has to be consumed
pub fn deserialize<T: Deserialize>(buf: &[u8]) -> Result<T, Error> {
	let mut r = Reader::new(buf);
	let value = T::decode(&mut r)?;
	r.finish()?;

	Ok(value)
}

#[derive(Default, Debug)]
pub struct Writer {
	buf: Vec<u8>,
	// the first length that did not fit into a prefix; reported by `finish`
	overflow: Option<usize>,
}

impl Writer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn u8(&mut self, v: u8) {
		self.buf.push(v);
	}

	pub fn u16(&mut self, v: u16) {
		self.buf.extend_from_slice(&v.to_be_bytes());
	}

	pub fn u32(&mut self, v: u32) {
		self.buf.extend_from_slice(&v.to_be_bytes());
	}

	pub fn u64(&mut self, v: u64) {
		self.buf.extend_from_slice(&v.to_be_bytes());
	}

	// appended as is, no prefix
	pub fn raw(&mut self, bytes: &[u8]) {
		self.buf.extend_from_slice(bytes);
	}

	pub fn varint(&mut self, len: usize) {
		if len < 1 << 6 {
			self.u8(len as u8);
		} else if len < 1 << 14 {
			self.u16(0x4000 | len as u16);
		} else if len <= MAX_LEN {
			self.u32(0x8000_0000 | len as u32);
		} else {
			self.overflow.get_or_insert(len);
		}
	}

	pub fn opaque(&mut self, bytes: &[u8]) {
		self.varint(bytes.len());
		self.raw(bytes);
	}

	// writes whatever `f` produces as a single length-prefixed vector
	pub fn vector<F>(&mut self, f: F)
	where
		F: FnOnce(&mut Writer),
	{
		let mut inner = Writer::new();
		f(&mut inner);

		if let Some(len) = inner.overflow {
			self.overflow.get_or_insert(len);
		}

		self.opaque(&inner.buf);
	}

	pub fn items<T: Serialize>(&mut self, items: &[T]) {
		self.vector(|w| items.iter().for_each(|item| item.encode(w)));
	}

	pub fn optional<T: Serialize>(&mut self, value: Option<&T>) {
		match value {
			Some(value) => {
				self.u8(1);
				value.encode(self);
			}
			None => self.u8(0),
		}
	}

	pub fn finish(self) -> Result<Vec<u8>, Error> {
		match self.overflow {
			Some(len) => Err(Error::LengthOverflow(len)),
			None => Ok(self.buf),
		}
	}
}

#[derive(Debug)]
pub struct Reader<'a> {
	buf: &'a [u8],
}

impl<'a> Reader<'a> {
	pub fn new(buf: &'a [u8]) -> Self {
		Self { buf }
	}

	pub fn remaining(&self) -> usize {
		self.buf.len()
	}

	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}

	fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
		if self.buf.len() < n {
			Err(Error::UnexpectedEnd)
		} else {
			let (head, tail) = self.buf.split_at(n);
			self.buf = tail;

			Ok(head)
		}
	}

	fn array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
		let mut out = [0u8; N];
		out.copy_from_slice(self.take(N)?);

		Ok(out)
	}

	pub fn u8(&mut self) -> Result<u8, Error> {
		Ok(self.take(1)?[0])
	}

	pub fn u16(&mut self) -> Result<u16, Error> {
		Ok(u16::from_be_bytes(self.array()?))
	}

	pub fn u32(&mut self) -> Result<u32, Error> {
		Ok(u32::from_be_bytes(self.array()?))
	}

	pub fn u64(&mut self) -> Result<u64, Error> {
		Ok(u64::from_be_bytes(self.array()?))
	}

	// only the minimal encoding is accepted
	pub fn varint(&mut self) -> Result<usize, Error> {
		let first = self.u8()?;
		let prefix = (first & 0x3f) as usize;

		match first >> 6 {
			0 => Ok(prefix),
			1 => {
				let len = prefix << 8 | self.u8()? as usize;

				if len < 1 << 6 {
					Err(Error::InvalidVarint)
				} else {
					Ok(len)
				}
			}
			2 => {
				let rest: [u8; 3] = self.array()?;
				let len = prefix << 24 | (rest[0] as usize) << 16 | (rest[1] as usize) << 8 | rest[2] as usize;

				if len < 1 << 14 {
					Err(Error::InvalidVarint)
				} else {
					Ok(len)
				}
			}
			_ => Err(Error::InvalidVarint),
		}
	}

	pub fn opaque(&mut self) -> Result<Vec<u8>, Error> {
		let len = self.varint()?;

		Ok(self.take(len)?.to_vec())
	}

	// calls `f` until the declared length is consumed; an element running past it is an error
	pub fn vector<T, F>(&mut self, mut f: F) -> Result<Vec<T>, Error>
	where
		F: FnMut(&mut Reader<'a>) -> Result<T, Error>,
	{
		let len = self.varint()?;
		let mut inner = Reader::new(self.take(len)?);
		let mut items = Vec::new();

		while !inner.is_empty() {
			items.push(f(&mut inner)?);
		}

		Ok(items)
	}

	pub fn items<T: Deserialize>(&mut self) -> Result<Vec<T>, Error> {
		self.vector(|r| T::decode(r))
	}

	pub fn presence(&mut self) -> Result<bool, Error> {
		match self.u8()? {
			0 => Ok(false),
			1 => Ok(true),
			flag => Err(Error::InvalidOptional(flag)),
		}
	}

	pub fn optional<T: Deserialize>(&mut self) -> Result<Option<T>, Error> {
		if self.presence()? {
			Ok(Some(T::decode(self)?))
		} else {
			Ok(None)
		}
	}

	pub fn finish(self) -> Result<(), Error> {
		if self.buf.is_empty() {
			Ok(())
		} else {
			Err(Error::TrailingBytes(self.buf.len()))
		}
	}
}

macro_rules! int_codec {
	($type: ty, $method: ident) => {
		impl Serialize for $type {
			fn encode(&self, w: &mut Writer) {
				w.$method(*self);
			}
		}

		impl Deserialize for $type {
			fn decode(r: &mut Reader) -> Result<Self, Error> {
				r.$method()
			}
		}
	};
}

int_codec!(u8, u8);
int_codec!(u16, u16);
int_codec!(u32, u32);
int_codec!(u64, u64);
