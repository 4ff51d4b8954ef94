use ::hpke::aead::{Aead as HpkeAead, AesGcm128, ChaCha20Poly1305};
use ::hpke::kdf::HkdfSha256;
use ::hpke::kem::X25519HkdfSha256;
use ::hpke::{Deserializable, Kem as HpkeKem, OpModeR, OpModeS, Serializable};

use crate::aead::Algorithm;
use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::crypto::Error;

// RFC 9180 base mode, single shot: DHKEM(X25519, HKDF-SHA256) + HKDF-SHA256 + the suite's aead
type Kem = X25519HkdfSha256;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HpkeCiphertext {
	pub kem_output: Vec<u8>,
	pub ciphertext: Vec<u8>,
}

impl Serialize for HpkeCiphertext {
	fn encode(&self, w: &mut Writer) {
		w.opaque(&self.kem_output);
		w.opaque(&self.ciphertext);
	}
}

impl Deserialize for HpkeCiphertext {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			kem_output: r.opaque()?,
			ciphertext: r.opaque()?,
		})
	}
}

fn seal_with<A: HpkeAead>(pk_r: &[u8], info: &[u8], aad: &[u8], pt: &[u8]) -> Result<HpkeCiphertext, Error> {
	let pk_r = <Kem as HpkeKem>::PublicKey::from_bytes(pk_r).or(Err(Error::InvalidKey))?;
	let (enc, ciphertext) =
		::hpke::single_shot_seal::<A, HkdfSha256, Kem, _>(&OpModeS::Base, &pk_r, info, pt, aad, &mut rand::thread_rng())
			.or(Err(Error::InvalidKey))?;

	Ok(HpkeCiphertext {
		kem_output: enc.to_bytes().to_vec(),
		ciphertext,
	})
}

fn open_with<A: HpkeAead>(sk_r: &[u8], info: &[u8], aad: &[u8], ct: &HpkeCiphertext) -> Result<Vec<u8>, Error> {
	let sk_r = <Kem as HpkeKem>::PrivateKey::from_bytes(sk_r).or(Err(Error::DecryptionFailed))?;
	let enc = <Kem as HpkeKem>::EncappedKey::from_bytes(&ct.kem_output).or(Err(Error::DecryptionFailed))?;

	::hpke::single_shot_open::<A, HkdfSha256, Kem>(&OpModeR::Base, &sk_r, &enc, info, &ct.ciphertext, aad)
		.or(Err(Error::DecryptionFailed))
}

pub fn seal_base(
	alg: Algorithm,
	pk_r: &[u8],
	info: &[u8],
	aad: &[u8],
	pt: &[u8],
) -> Result<HpkeCiphertext, Error> {
	match alg {
		Algorithm::Aes128Gcm => seal_with::<AesGcm128>(pk_r, info, aad, pt),
		Algorithm::ChaCha20Poly1305 => seal_with::<ChaCha20Poly1305>(pk_r, info, aad, pt),
	}
}

// any failure is reported as DecryptionFailed
pub fn open_base(
	alg: Algorithm,
	sk_r: &[u8],
	info: &[u8],
	aad: &[u8],
	ct: &HpkeCiphertext,
) -> Result<Vec<u8>, Error> {
	match alg {
		Algorithm::Aes128Gcm => open_with::<AesGcm128>(sk_r, info, aad, ct),
		Algorithm::ChaCha20Poly1305 => open_with::<ChaCha20Poly1305>(sk_r, info, aad, ct),
	}
}

// (private, public)
pub fn generate_key_pair() -> (Vec<u8>, Vec<u8>) {
	let (private, public) = Kem::gen_keypair(&mut rand::thread_rng());

	(private.to_bytes().to_vec(), public.to_bytes().to_vec())
}
