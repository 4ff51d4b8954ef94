use thiserror::Error;
use tracing::trace;

use crate::codec;
use crate::crypto::{self, CipherSuite};
use crate::group_context::GroupContext;
use crate::psk::{PreSharedKeyId, PskLabel};

#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
	#[error("{ids} psk ids for {psks} psks")]
	PskCountMismatch { ids: usize, psks: usize },
	#[error("too many psks: {0}")]
	TooManyPsks(usize),
	#[error(transparent)]
	Crypto(#[from] crypto::Error),
	#[error(transparent)]
	Codec(#[from] codec::Error),
}

fn zeros(suite: CipherSuite) -> Result<Vec<u8>, Error> {
	Ok(vec![0u8; suite.hash_size()?])
}

fn serialize_context(ctx: &GroupContext) -> Result<Vec<u8>, Error> {
	Ok(codec::serialize(ctx)?)
}

// chains psks in the order given; the result is order dependent
pub fn extract_psk_secret(
	suite: CipherSuite,
	psk_ids: &[PreSharedKeyId],
	psks: &[Vec<u8>],
) -> Result<Vec<u8>, Error> {
	if psk_ids.len() != psks.len() {
		return Err(Error::PskCountMismatch {
			ids: psk_ids.len(),
			psks: psks.len(),
		});
	}

	let count = u16::try_from(psk_ids.len()).or(Err(Error::TooManyPsks(psk_ids.len())))?;
	let zero = zeros(suite)?;

	let secret = psk_ids
		.iter()
		.zip(psks)
		.enumerate()
		.try_fold(zero.clone(), |secret, (index, (id, psk))| -> Result<Vec<u8>, Error> {
			let label = PskLabel {
				id,
				index: index as u16,
				count,
			};
			let extracted = suite.extract(&zero, psk)?;
			let input = suite.expand_with_label(
				&extracted,
				b"derived psk",
				&codec::serialize(&label)?,
				zero.len() as u16,
			)?;

			Ok(suite.extract(&input, &secret)?)
		})?;

	trace!(count, "extracted a psk secret");

	Ok(secret)
}

// Extract(init_secret, commit_secret) expanded with "joiner" over the new group context
pub fn joiner_secret(
	suite: CipherSuite,
	init_secret: &[u8],
	commit_secret: &[u8],
	ctx: &GroupContext,
) -> Result<Vec<u8>, Error> {
	let prk = suite.extract(init_secret, commit_secret)?;

	Ok(suite.expand_with_label(&prk, b"joiner", &serialize_context(ctx)?, suite.hash_size()? as u16)?)
}

// a missing psk secret is an all-zero one
fn member_secret(suite: CipherSuite, joiner_secret: &[u8], psk_secret: Option<&[u8]>) -> Result<Vec<u8>, Error> {
	let psk_secret = match psk_secret {
		Some(psk_secret) => psk_secret.to_vec(),
		None => zeros(suite)?,
	};

	Ok(suite.extract(joiner_secret, &psk_secret)?)
}

pub fn welcome_secret(
	suite: CipherSuite,
	joiner_secret: &[u8],
	psk_secret: Option<&[u8]>,
) -> Result<Vec<u8>, Error> {
	let member = member_secret(suite, joiner_secret, psk_secret)?;

	Ok(suite.derive_secret(&member, b"welcome")?)
}

// returns (key, nonce) sized for the suite's aead
pub fn welcome_key_nonce(
	suite: CipherSuite,
	joiner_secret: &[u8],
	psk_secret: Option<&[u8]>,
) -> Result<(Vec<u8>, Vec<u8>), Error> {
	let secret = welcome_secret(suite, joiner_secret, psk_secret)?;
	let key = suite.expand_with_label(&secret, b"key", &[], suite.aead_key_size()? as u16)?;
	let nonce = suite.expand_with_label(&secret, b"nonce", &[], suite.aead_nonce_size()? as u16)?;

	Ok((key, nonce))
}

// the secrets of one epoch; init_secret feeds the next epoch's joiner secret
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct KeySchedule {
	pub suite: CipherSuite,
	pub epoch_secret: Vec<u8>,
	pub sender_data_secret: Vec<u8>,
	pub encryption_secret: Vec<u8>,
	pub exporter_secret: Vec<u8>,
	pub external_secret: Vec<u8>,
	pub confirmation_key: Vec<u8>,
	pub membership_key: Vec<u8>,
	pub resumption_psk: Vec<u8>,
	pub epoch_authenticator: Vec<u8>,
	pub init_secret: Vec<u8>,
}

impl KeySchedule {
	pub fn from_joiner(
		suite: CipherSuite,
		joiner_secret: &[u8],
		psk_secret: Option<&[u8]>,
		ctx: &GroupContext,
	) -> Result<Self, Error> {
		let member = member_secret(suite, joiner_secret, psk_secret)?;
		let epoch_secret =
			suite.expand_with_label(&member, b"epoch", &serialize_context(ctx)?, suite.hash_size()? as u16)?;
		let derive = |label: &[u8]| suite.derive_secret(&epoch_secret, label);

		Ok(Self {
			suite,
			sender_data_secret: derive(b"sender data")?,
			encryption_secret: derive(b"encryption")?,
			exporter_secret: derive(b"exporter")?,
			external_secret: derive(b"external")?,
			confirmation_key: derive(b"confirm")?,
			membership_key: derive(b"membership")?,
			resumption_psk: derive(b"resumption")?,
			epoch_authenticator: derive(b"authentication")?,
			init_secret: derive(b"init")?,
			epoch_secret,
		})
	}

	pub fn confirmation_tag(&self, confirmed_transcript_hash: &[u8]) -> Result<Vec<u8>, Error> {
		Ok(self.suite.mac(&self.confirmation_key, confirmed_transcript_hash)?)
	}

	pub fn verify_confirmation_tag(&self, confirmed_transcript_hash: &[u8], tag: &[u8]) -> Result<bool, Error> {
		Ok(self
			.suite
			.verify_mac(&self.confirmation_key, confirmed_transcript_hash, tag)?)
	}

	// MLS-Exporter(label, context, len)
	pub fn export(&self, label: &[u8], context: &[u8], len: u16) -> Result<Vec<u8>, Error> {
		let secret = self.suite.derive_secret(&self.exporter_secret, label)?;
		let hash = self.suite.hash(context)?;

		Ok(self.suite.expand_with_label(&secret, b"exported", &hash, len)?)
	}
}

#[cfg(test)]
mod tests {
	use super::{extract_psk_secret, joiner_secret, welcome_key_nonce, welcome_secret, Error, KeySchedule};
	use crate::codec::{serialize, Writer};
	use crate::crypto::CipherSuite;
	use crate::group_context::{GroupContext, GroupId, ProtocolVersion};
	use crate::psk::{PreSharedKeyId, Psk, PskLabel};
	use hkdf::Hkdf;
	use sha2::Sha256;

	const SUITE: CipherSuite = CipherSuite::Mls128DhKemX25519Aes128GcmSha256Ed25519;

	fn extract(salt: &[u8], ikm: &[u8]) -> Vec<u8> {
		Hkdf::<Sha256>::extract(Some(salt), ikm).0.to_vec()
	}

	fn expand(prk: &[u8], info: &[u8], len: usize) -> Vec<u8> {
		let mut okm = vec![0u8; len];
		Hkdf::<Sha256>::from_prk(prk).unwrap().expand(info, &mut okm).unwrap();

		okm
	}

	fn kdf_label(label: &[u8], context: &[u8], len: u16) -> Vec<u8> {
		let mut w = Writer::new();
		w.u16(len);
		w.opaque(&[b"MLS 1.0 ".as_slice(), label].concat());
		w.opaque(context);

		w.finish().unwrap()
	}

	fn psk_id(id: &[u8]) -> PreSharedKeyId {
		PreSharedKeyId {
			psk: Psk::External { psk_id: id.to_vec() },
			psk_nonce: vec![0u8; 32],
		}
	}

	fn context() -> GroupContext {
		GroupContext {
			version: ProtocolVersion::Mls10,
			cipher_suite: SUITE,
			group_id: GroupId::new(b"group".to_vec()),
			epoch: 1,
			tree_hash: vec![1u8; 32],
			confirmed_transcript_hash: vec![2u8; 32],
			extensions: vec![],
		}
	}

	#[test]
	fn test_no_psks_yield_zeros() {
		assert_eq!(extract_psk_secret(SUITE, &[], &[]), Ok(vec![0u8; 32]));
	}

	#[test]
	fn test_single_psk_matches_manual_chain() {
		let id = psk_id(b"a");
		let label = serialize(&PskLabel { id: &id, index: 0, count: 1 }).unwrap();
		let extracted = extract(&[0u8; 32], b"secret");
		let input = expand(&extracted, &kdf_label(b"derived psk", &label, 32), 32);
		let expected = extract(&input, &[0u8; 32]);

		assert_eq!(extract_psk_secret(SUITE, &[id], &[b"secret".to_vec()]), Ok(expected));
	}

	#[test]
	fn test_psk_chain_is_order_sensitive() {
		let ids = [psk_id(b"a"), psk_id(b"b")];
		let psks = [b"one".to_vec(), b"two".to_vec()];
		let secret = extract_psk_secret(SUITE, &ids, &psks).unwrap();

		// deterministic
		assert_eq!(extract_psk_secret(SUITE, &ids, &psks), Ok(secret.clone()));

		let swapped_ids = [psk_id(b"b"), psk_id(b"a")];
		let swapped_psks = [b"two".to_vec(), b"one".to_vec()];

		assert_ne!(extract_psk_secret(SUITE, &swapped_ids, &swapped_psks), Ok(secret));
	}

	#[test]
	fn test_count_mismatch_fails_before_any_kdf() {
		// an unsupported suite would fail on its first kdf call
		let unsupported = CipherSuite::Mls256DhKemX448Aes256GcmSha512Ed448;

		assert_eq!(
			extract_psk_secret(unsupported, &[psk_id(b"a")], &[]),
			Err(Error::PskCountMismatch { ids: 1, psks: 0 })
		);
		assert_eq!(
			extract_psk_secret(SUITE, &[], &[b"x".to_vec()]),
			Err(Error::PskCountMismatch { ids: 0, psks: 1 })
		);
	}

	#[test]
	fn test_welcome_key_nonce() {
		let joiner = [5u8; 32];
		let member = extract(&joiner, &[0u8; 32]);
		let welcome = expand(&member, &kdf_label(b"welcome", b"", 32), 32);

		assert_eq!(welcome_secret(SUITE, &joiner, None), Ok(welcome.clone()));

		let (key, nonce) = welcome_key_nonce(SUITE, &joiner, None).unwrap();

		assert_eq!(key, expand(&welcome, &kdf_label(b"key", b"", 16), 16));
		assert_eq!(nonce, expand(&welcome, &kdf_label(b"nonce", b"", 12), 12));

		// a chacha suite wants a longer key
		let chacha = CipherSuite::Mls128DhKemX25519ChaCha20Poly1305Sha256Ed25519;
		let (key, nonce) = welcome_key_nonce(chacha, &joiner, None).unwrap();

		assert_eq!((key.len(), nonce.len()), (32, 12));
	}

	#[test]
	fn test_psk_secret_changes_the_welcome_secret() {
		let joiner = [5u8; 32];

		assert_eq!(
			welcome_secret(SUITE, &joiner, None),
			welcome_secret(SUITE, &joiner, Some([0u8; 32].as_slice()))
		);
		assert_ne!(
			welcome_secret(SUITE, &joiner, None),
			welcome_secret(SUITE, &joiner, Some([1u8; 32].as_slice()))
		);
	}

	#[test]
	fn test_joiner_secret() {
		let ctx = context();
		let prk = extract(b"init", b"commit");
		let expected = expand(&prk, &kdf_label(b"joiner", &serialize(&ctx).unwrap(), 32), 32);

		assert_eq!(joiner_secret(SUITE, b"init", b"commit", &ctx), Ok(expected));
	}

	#[test]
	fn test_epoch_secrets() {
		let ctx = context();
		let joiner = [9u8; 32];
		let ks = KeySchedule::from_joiner(SUITE, &joiner, None, &ctx).unwrap();
		let member = extract(&joiner, &[0u8; 32]);
		let epoch = expand(&member, &kdf_label(b"epoch", &serialize(&ctx).unwrap(), 32), 32);

		assert_eq!(ks.epoch_secret, epoch);
		assert_eq!(ks.confirmation_key, expand(&epoch, &kdf_label(b"confirm", b"", 32), 32));
		assert_eq!(ks.init_secret, expand(&epoch, &kdf_label(b"init", b"", 32), 32));

		let secrets = [
			&ks.sender_data_secret,
			&ks.encryption_secret,
			&ks.exporter_secret,
			&ks.external_secret,
			&ks.confirmation_key,
			&ks.membership_key,
			&ks.resumption_psk,
			&ks.epoch_authenticator,
			&ks.init_secret,
		];

		// all distinct
		secrets.iter().enumerate().for_each(|(i, a)| {
			secrets.iter().skip(i + 1).for_each(|b| assert_ne!(a, b));
		});
	}

	#[test]
	fn test_confirmation_tag() {
		let ctx = context();
		let ks = KeySchedule::from_joiner(SUITE, &[9u8; 32], None, &ctx).unwrap();
		let tag = ks.confirmation_tag(&ctx.confirmed_transcript_hash).unwrap();

		assert_eq!(tag.len(), 32);
		assert_eq!(ks.verify_confirmation_tag(&ctx.confirmed_transcript_hash, &tag), Ok(true));
		assert_eq!(ks.verify_confirmation_tag(b"another transcript", &tag), Ok(false));

		let other = KeySchedule::from_joiner(SUITE, &[8u8; 32], None, &ctx).unwrap();

		assert_eq!(other.verify_confirmation_tag(&ctx.confirmed_transcript_hash, &tag), Ok(false));
	}

	#[test]
	fn test_export() {
		let ks = KeySchedule::from_joiner(SUITE, &[9u8; 32], None, &context()).unwrap();

		assert_eq!(ks.export(b"label", b"ctx", 42).unwrap().len(), 42);
		assert_ne!(ks.export(b"label", b"ctx", 32), ks.export(b"label", b"ctz", 32));
	}
}
