use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::aead::Algorithm;
use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::hpke::{self, HpkeCiphertext};
use crate::key::key;

const LABEL_PREFIX: &[u8] = b"MLS 1.0 ";

#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
	#[error("cipher suite {0:?} is not supported")]
	UnsupportedCipherSuite(CipherSuite),
	#[error("invalid key material")]
	InvalidKey,
	#[error("invalid output length {0}")]
	InvalidLength(usize),
	#[error("decryption failed")]
	DecryptionFailed,
	#[error(transparent)]
	Codec(#[from] codec::Error),
}

key!(SignaturePublicKey);
key!(SignaturePrivateKey);
key!(HpkePublicKey);
key!(HpkePrivateKey);

#[derive(Clone, PartialEq, Debug)]
pub struct SignatureKeyPair {
	pub private: SignaturePrivateKey,
	pub public: SignaturePublicKey,
}

#[derive(Clone, PartialEq, Debug)]
pub struct HpkeKeyPair {
	pub private: HpkePrivateKey,
	pub public: HpkePublicKey,
}

// http://www.iana.org/assignments/mls/mls.xhtml#mls-ciphersuites
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CipherSuite {
	Mls128DhKemX25519Aes128GcmSha256Ed25519,
	Mls128DhKemP256Aes128GcmSha256P256,
	Mls128DhKemX25519ChaCha20Poly1305Sha256Ed25519,
	Mls256DhKemX448Aes256GcmSha512Ed448,
	Mls256DhKemP521Aes256GcmSha512P521,
	Mls256DhKemX448ChaCha20Poly1305Sha512Ed448,
	Mls256DhKemP384Aes256GcmSha384P384,
}

impl From<CipherSuite> for u16 {
	fn from(cs: CipherSuite) -> Self {
		match cs {
			CipherSuite::Mls128DhKemX25519Aes128GcmSha256Ed25519 => 0x0001,
			CipherSuite::Mls128DhKemP256Aes128GcmSha256P256 => 0x0002,
			CipherSuite::Mls128DhKemX25519ChaCha20Poly1305Sha256Ed25519 => 0x0003,
			CipherSuite::Mls256DhKemX448Aes256GcmSha512Ed448 => 0x0004,
			CipherSuite::Mls256DhKemP521Aes256GcmSha512P521 => 0x0005,
			CipherSuite::Mls256DhKemX448ChaCha20Poly1305Sha512Ed448 => 0x0006,
			CipherSuite::Mls256DhKemP384Aes256GcmSha384P384 => 0x0007,
		}
	}
}

impl TryFrom<u16> for CipherSuite {
	type Error = codec::Error;

	fn try_from(value: u16) -> Result<Self, Self::Error> {
		match value {
			0x0001 => Ok(Self::Mls128DhKemX25519Aes128GcmSha256Ed25519),
			0x0002 => Ok(Self::Mls128DhKemP256Aes128GcmSha256P256),
			0x0003 => Ok(Self::Mls128DhKemX25519ChaCha20Poly1305Sha256Ed25519),
			0x0004 => Ok(Self::Mls256DhKemX448Aes256GcmSha512Ed448),
			0x0005 => Ok(Self::Mls256DhKemP521Aes256GcmSha512P521),
			0x0006 => Ok(Self::Mls256DhKemX448ChaCha20Poly1305Sha512Ed448),
			0x0007 => Ok(Self::Mls256DhKemP384Aes256GcmSha384P384),
			_ => Err(codec::Error::UnknownValue {
				field: "cipher suite",
				value: value as u64,
			}),
		}
	}
}

impl Serialize for CipherSuite {
	fn encode(&self, w: &mut Writer) {
		w.u16((*self).into());
	}
}

impl Deserialize for CipherSuite {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Self::try_from(r.u16()?)
	}
}

// every backed suite shares SHA-256, HKDF-SHA256, X25519 and Ed25519 and differs in its aead only
impl CipherSuite {
	pub const HASH_SIZE: usize = 32;

	fn aead(&self) -> Result<Algorithm, Error> {
		match self {
			Self::Mls128DhKemX25519Aes128GcmSha256Ed25519 => Ok(Algorithm::Aes128Gcm),
			Self::Mls128DhKemX25519ChaCha20Poly1305Sha256Ed25519 => Ok(Algorithm::ChaCha20Poly1305),
			other => Err(Error::UnsupportedCipherSuite(*other)),
		}
	}

	pub fn is_supported(&self) -> bool {
		self.aead().is_ok()
	}

	// Nh, which is also the kdf's extract size
	pub fn hash_size(&self) -> Result<usize, Error> {
		self.aead()?;

		Ok(Self::HASH_SIZE)
	}

	pub fn aead_key_size(&self) -> Result<usize, Error> {
		Ok(self.aead()?.key_size())
	}

	pub fn aead_nonce_size(&self) -> Result<usize, Error> {
		Ok(self.aead()?.nonce_size())
	}

	pub fn hash(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
		self.aead()?;

		Ok(Sha256::digest(data).to_vec())
	}

	pub fn extract(&self, salt: &[u8], ikm: &[u8]) -> Result<Vec<u8>, Error> {
		self.aead()?;

		let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);

		Ok(prk.to_vec())
	}

	pub fn expand(&self, prk: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>, Error> {
		self.aead()?;

		let hk = Hkdf::<Sha256>::from_prk(prk).or(Err(Error::InvalidKey))?;
		let mut okm = vec![0u8; len];

		hk.expand(info, &mut okm).or(Err(Error::InvalidLength(len)))?;

		Ok(okm)
	}

	// KDFLabel { uint16 length; opaque label<V> = "MLS 1.0 " + label; opaque context<V>; }
	pub fn expand_with_label(
		&self,
		secret: &[u8],
		label: &[u8],
		context: &[u8],
		len: u16,
	) -> Result<Vec<u8>, Error> {
		let mut w = Writer::new();
		w.u16(len);
		w.opaque(&[LABEL_PREFIX, label].concat());
		w.opaque(context);

		self.expand(secret, &w.finish()?, len as usize)
	}

	pub fn derive_secret(&self, secret: &[u8], label: &[u8]) -> Result<Vec<u8>, Error> {
		self.expand_with_label(secret, label, &[], self.hash_size()? as u16)
	}

	// RefHashInput { opaque label<V>; opaque value<V>; }
	pub fn ref_hash(&self, label: &[u8], value: &[u8]) -> Result<Vec<u8>, Error> {
		let mut w = Writer::new();
		w.opaque(label);
		w.opaque(value);

		self.hash(&w.finish()?)
	}

	pub fn mac(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
		self.aead()?;

		let mut mac = Hmac::<Sha256>::new_from_slice(key).or(Err(Error::InvalidKey))?;
		mac.update(data);

		Ok(mac.finalize().into_bytes().to_vec())
	}

	// constant time
	pub fn verify_mac(&self, key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool, Error> {
		self.aead()?;

		let mut mac = Hmac::<Sha256>::new_from_slice(key).or(Err(Error::InvalidKey))?;
		mac.update(data);

		Ok(mac.verify_slice(tag).is_ok())
	}

	pub fn aead_seal(&self, key: &[u8], nonce: &[u8], aad: &[u8], pt: &[u8]) -> Result<Vec<u8>, Error> {
		crate::aead::seal(self.aead()?, key, nonce, aad, pt)
	}

	pub fn aead_open(&self, key: &[u8], nonce: &[u8], aad: &[u8], ct: &[u8]) -> Result<Vec<u8>, Error> {
		crate::aead::open(self.aead()?, key, nonce, aad, ct)
	}

	pub fn generate_signature_key_pair(&self) -> Result<SignatureKeyPair, Error> {
		self.aead()?;

		let private = SigningKey::from_bytes(&rand::thread_rng().gen());
		let public = private.verifying_key();

		Ok(SignatureKeyPair {
			private: SignaturePrivateKey::new(private.to_bytes().to_vec()),
			public: SignaturePublicKey::new(public.to_bytes().to_vec()),
		})
	}

	pub fn generate_hpke_key_pair(&self) -> Result<HpkeKeyPair, Error> {
		self.aead()?;

		let (private, public) = hpke::generate_key_pair();

		Ok(HpkeKeyPair {
			private: HpkePrivateKey::new(private),
			public: HpkePublicKey::new(public),
		})
	}

	// SignContent { opaque label<V> = "MLS 1.0 " + label; opaque content<V>; }
	fn sign_content(label: &[u8], content: &[u8]) -> Result<Vec<u8>, Error> {
		let mut w = Writer::new();
		w.opaque(&[LABEL_PREFIX, label].concat());
		w.opaque(content);

		Ok(w.finish()?)
	}

	pub fn sign_with_label(
		&self,
		key: &SignaturePrivateKey,
		label: &[u8],
		content: &[u8],
	) -> Result<Vec<u8>, Error> {
		self.aead()?;

		let bytes: [u8; 32] = key.as_bytes().try_into().or(Err(Error::InvalidKey))?;
		let signing_key = SigningKey::from_bytes(&bytes);

		Ok(signing_key
			.sign(&Self::sign_content(label, content)?)
			.to_bytes()
			.to_vec())
	}

	// false for any malformed key or signature as well
	pub fn verify_with_label(
		&self,
		key: &SignaturePublicKey,
		label: &[u8],
		content: &[u8],
		signature: &[u8],
	) -> bool {
		if !self.is_supported() {
			return false;
		}

		let Ok(bytes) = <[u8; 32]>::try_from(key.as_bytes()) else {
			return false;
		};
		let Ok(verifying_key) = VerifyingKey::from_bytes(&bytes) else {
			return false;
		};
		let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
			return false;
		};
		let Ok(msg) = Self::sign_content(label, content) else {
			return false;
		};

		verifying_key.verify(&msg, &signature).is_ok()
	}

	// EncryptContext { opaque label<V> = "MLS 1.0 " + label; opaque context<V>; }
	fn encrypt_context(label: &[u8], context: &[u8]) -> Result<Vec<u8>, Error> {
		Self::sign_content(label, context)
	}

	pub fn encrypt_with_label(
		&self,
		key: &HpkePublicKey,
		label: &[u8],
		context: &[u8],
		pt: &[u8],
	) -> Result<HpkeCiphertext, Error> {
		let info = Self::encrypt_context(label, context)?;

		hpke::seal_base(self.aead()?, key.as_bytes(), &info, &[], pt)
	}

	pub fn decrypt_with_label(
		&self,
		key: &HpkePrivateKey,
		label: &[u8],
		context: &[u8],
		ct: &HpkeCiphertext,
	) -> Result<Vec<u8>, Error> {
		let info = Self::encrypt_context(label, context)?;

		hpke::open_base(self.aead()?, key.as_bytes(), &info, &[], ct)
	}
}
