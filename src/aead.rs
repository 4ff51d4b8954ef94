use ring::aead::{
	Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey, AES_128_GCM,
	CHACHA20_POLY1305, NONCE_LEN,
};
use ring::error::Unspecified;

use crate::crypto::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
	Aes128Gcm,
	ChaCha20Poly1305,
}

impl Algorithm {
	pub const NONCE_SIZE: usize = NONCE_LEN;
	pub const TAG_SIZE: usize = 16;

	pub fn key_size(&self) -> usize {
		match self {
			Self::Aes128Gcm => 16,
			Self::ChaCha20Poly1305 => 32,
		}
	}

	pub fn nonce_size(&self) -> usize {
		Self::NONCE_SIZE
	}

	fn ring(&self) -> &'static ring::aead::Algorithm {
		match self {
			Self::Aes128Gcm => &AES_128_GCM,
			Self::ChaCha20Poly1305 => &CHACHA20_POLY1305,
		}
	}
}

// every key here seals or opens exactly one message
struct OneShot(Option<[u8; NONCE_LEN]>);

impl NonceSequence for OneShot {
	fn advance(&mut self) -> Result<Nonce, Unspecified> {
		self.0
			.take()
			.map(Nonce::assume_unique_for_key)
			.ok_or(Unspecified)
	}
}

fn bind(alg: Algorithm, key: &[u8], nonce: &[u8]) -> Result<(UnboundKey, OneShot), Error> {
	if key.len() != alg.key_size() {
		return Err(Error::InvalidKey);
	}

	let nonce: [u8; NONCE_LEN] = nonce.try_into().or(Err(Error::InvalidKey))?;
	let unbound = UnboundKey::new(alg.ring(), key).or(Err(Error::InvalidKey))?;

	Ok((unbound, OneShot(Some(nonce))))
}

pub fn seal(alg: Algorithm, key: &[u8], nonce: &[u8], aad: &[u8], pt: &[u8]) -> Result<Vec<u8>, Error> {
	let (unbound, nonce) = bind(alg, key, nonce)?;
	let mut sealing_key = SealingKey::new(unbound, nonce);
	let mut ct = pt.to_vec();

	sealing_key
		.seal_in_place_append_tag(Aad::from(aad), &mut ct)
		.or(Err(Error::InvalidKey))?;

	Ok(ct)
}

// fails opaquely: a wrong key, nonce, aad or a corrupted ciphertext are indistinguishable
pub fn open(alg: Algorithm, key: &[u8], nonce: &[u8], aad: &[u8], ct: &[u8]) -> Result<Vec<u8>, Error> {
	let (unbound, nonce) = bind(alg, key, nonce).or(Err(Error::DecryptionFailed))?;
	let mut opening_key = OpeningKey::new(unbound, nonce);
	let mut buf = ct.to_vec();

	let pt = opening_key
		.open_in_place(Aad::from(aad), &mut buf)
		.or(Err(Error::DecryptionFailed))?;

	Ok(pt.to_vec())
}
