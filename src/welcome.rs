use thiserror::Error;
use tracing::{debug, warn};

use crate::codec::{self, Deserialize, Reader, Serialize, Writer};
use crate::crypto::{self, CipherSuite, HpkePrivateKey, HpkePublicKey, SignaturePublicKey};
use crate::group_info::GroupInfo;
use crate::hpke::HpkeCiphertext;
use crate::key_package::{KeyPackage, KeyPackageRef};
use crate::key_schedule;
use crate::psk::PreSharedKeyId;

const ENCRYPT_LABEL: &[u8] = b"Welcome";

#[derive(Debug, PartialEq, Clone, Error)]
pub enum Error {
	#[error("secrets not found for key package")]
	SecretsNotFound,
	#[error("failed to decrypt group secrets")]
	DecryptSecrets,
	#[error("malformed group secrets: {0}")]
	MalformedSecrets(codec::Error),
	#[error("welcome messages with psks are not supported")]
	PsksUnsupported,
	#[error("failed to decrypt group info")]
	DecryptGroupInfo,
	#[error("malformed group info: {0}")]
	MalformedGroupInfo(codec::Error),
	#[error("signature verification failed")]
	InvalidSignature,
	#[error(transparent)]
	KeySchedule(#[from] key_schedule::Error),
	#[error(transparent)]
	Crypto(#[from] crypto::Error),
	#[error(transparent)]
	Codec(#[from] codec::Error),
}

// what a joiner learns from its welcome
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GroupSecrets {
	pub joiner_secret: Vec<u8>,
	// set when the joiner's position in the tree needs path secrets re-derived
	pub path_secret: Option<Vec<u8>>,
	pub psks: Vec<PreSharedKeyId>,
}

impl Serialize for GroupSecrets {
	fn encode(&self, w: &mut Writer) {
		w.opaque(&self.joiner_secret);

		match &self.path_secret {
			Some(path_secret) => {
				w.u8(1);
				w.opaque(path_secret);
			}
			None => w.u8(0),
		}

		w.items(&self.psks);
	}
}

impl Deserialize for GroupSecrets {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		let joiner_secret = r.opaque()?;
		let path_secret = if r.presence()? { Some(r.opaque()?) } else { None };

		Ok(Self {
			joiner_secret,
			path_secret,
			psks: r.items()?,
		})
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EncryptedGroupSecrets {
	pub new_member: KeyPackageRef,
	pub encrypted_group_secrets: HpkeCiphertext,
}

impl EncryptedGroupSecrets {
	// the group info ciphertext is the hpke context, so secrets can't be moved to another welcome
	pub fn seal(
		suite: CipherSuite,
		new_member: KeyPackageRef,
		init_key: &HpkePublicKey,
		group_secrets: &GroupSecrets,
		encrypted_group_info: &[u8],
	) -> Result<Self, Error> {
		let encrypted_group_secrets = suite.encrypt_with_label(
			init_key,
			ENCRYPT_LABEL,
			encrypted_group_info,
			&codec::serialize(group_secrets)?,
		)?;

		Ok(Self {
			new_member,
			encrypted_group_secrets,
		})
	}
}

impl Serialize for EncryptedGroupSecrets {
	fn encode(&self, w: &mut Writer) {
		self.new_member.encode(w);
		self.encrypted_group_secrets.encode(w);
	}
}

impl Deserialize for EncryptedGroupSecrets {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			new_member: KeyPackageRef::decode(r)?,
			encrypted_group_secrets: HpkeCiphertext::decode(r)?,
		})
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Welcome {
	pub cipher_suite: CipherSuite,
	pub secrets: Vec<EncryptedGroupSecrets>,
	pub encrypted_group_info: Vec<u8>,
}

impl Welcome {
	// every recipient gets the same joiner secret and no path secret
	pub fn seal(
		suite: CipherSuite,
		group_info: &GroupInfo,
		joiner_secret: &[u8],
		recipients: &[KeyPackage],
	) -> Result<Self, Error> {
		let (key, nonce) = key_schedule::welcome_key_nonce(suite, joiner_secret, None)?;
		let encrypted_group_info = suite.aead_seal(&key, &nonce, &[], &codec::serialize(group_info)?)?;
		let group_secrets = GroupSecrets {
			joiner_secret: joiner_secret.to_vec(),
			path_secret: None,
			psks: Vec::new(),
		};
		let secrets = recipients
			.iter()
			.map(|kp| {
				EncryptedGroupSecrets::seal(
					suite,
					kp.reference()?,
					&kp.init_key,
					&group_secrets,
					&encrypted_group_info,
				)
			})
			.collect::<Result<Vec<_>, Error>>()?;

		debug!(recipients = secrets.len(), "sealed a welcome");

		Ok(Self {
			cipher_suite: suite,
			secrets,
			encrypted_group_info,
		})
	}

	// the first entry addressed to `kp_ref`
	pub fn find_secrets(&self, kp_ref: &KeyPackageRef) -> Option<&EncryptedGroupSecrets> {
		self.secrets.iter().find(|secrets| &secrets.new_member == kp_ref)
	}

	// Received -> SecretsDecrypted -> GroupInfoDecrypted -> Verified; any failure rejects the whole welcome.
	// The confirmation tag is not checked here: the caller checks it with
	// KeySchedule::verify_confirmation_tag before trusting the group
	pub fn process(
		&self,
		kp_ref: &KeyPackageRef,
		init_key: &HpkePrivateKey,
		signer_key: &SignaturePublicKey,
	) -> Result<(GroupInfo, GroupSecrets), Error> {
		let result = self.admit(kp_ref, init_key, signer_key);

		if let Err(err) = &result {
			warn!(%err, "welcome rejected");
		}

		result
	}

	fn admit(
		&self,
		kp_ref: &KeyPackageRef,
		init_key: &HpkePrivateKey,
		signer_key: &SignaturePublicKey,
	) -> Result<(GroupInfo, GroupSecrets), Error> {
		let suite = self.cipher_suite;
		let secrets = self.find_secrets(kp_ref).ok_or(Error::SecretsNotFound)?;

		if !suite.is_supported() {
			return Err(Error::Crypto(crypto::Error::UnsupportedCipherSuite(suite)));
		}

		let plaintext = suite
			.decrypt_with_label(
				init_key,
				ENCRYPT_LABEL,
				&self.encrypted_group_info,
				&secrets.encrypted_group_secrets,
			)
			.or(Err(Error::DecryptSecrets))?;
		let group_secrets: GroupSecrets = codec::deserialize(&plaintext).map_err(Error::MalformedSecrets)?;

		debug!("welcome secrets decrypted");

		if !group_secrets.psks.is_empty() {
			return Err(Error::PsksUnsupported);
		}

		let (key, nonce) = key_schedule::welcome_key_nonce(suite, &group_secrets.joiner_secret, None)?;
		let plaintext = suite
			.aead_open(&key, &nonce, &[], &self.encrypted_group_info)
			.or(Err(Error::DecryptGroupInfo))?;
		let group_info: GroupInfo = codec::deserialize(&plaintext).map_err(Error::MalformedGroupInfo)?;

		debug!(epoch = group_info.group_context.epoch, "welcome group info decrypted");

		if !group_info.verify(suite, signer_key) {
			return Err(Error::InvalidSignature);
		}

		debug!(signer = group_info.signer.0, "welcome verified");

		Ok((group_info, group_secrets))
	}
}

impl Serialize for Welcome {
	fn encode(&self, w: &mut Writer) {
		self.cipher_suite.encode(w);
		w.items(&self.secrets);
		w.opaque(&self.encrypted_group_info);
	}
}

impl Deserialize for Welcome {
	fn decode(r: &mut Reader) -> Result<Self, codec::Error> {
		Ok(Self {
			cipher_suite: CipherSuite::decode(r)?,
			secrets: r.items()?,
			encrypted_group_info: r.opaque()?,
		})
	}
}
