use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};

use crate::credential::{Capabilities, Credential, Lifetime};
use crate::crypto::{CipherSuite, HpkeKeyPair, SignatureKeyPair, SignaturePrivateKey, SignaturePublicKey};
use crate::group_context::{GroupContext, GroupId, ProtocolVersion};
use crate::group_info::GroupInfo;
use crate::key_package::KeyPackage;
use crate::key_schedule::KeySchedule;
use crate::leaf_node::{LeafNode, LeafNodeSource};
use crate::tree::{Node, ParentNode, RatchetTree};
use crate::treemath::{LeafIndex, NodeIndex};

pub const SUITE: CipherSuite = CipherSuite::Mls128DhKemX25519Aes128GcmSha256Ed25519;
pub const JOINER_SECRET: [u8; 32] = [0x42; 32];

pub struct MemberKeys {
	pub signature: SignatureKeyPair,
	pub init: HpkeKeyPair,
}

pub fn group_id() -> GroupId {
	GroupId::new(b"group".to_vec())
}

// the same identity always gets the same key, so a signer can be found by name
pub fn signature_key_pair(identity: &[u8]) -> SignatureKeyPair {
	let seed: [u8; 32] = Sha256::digest(identity).into();
	let key = SigningKey::from_bytes(&seed);

	SignatureKeyPair {
		private: SignaturePrivateKey::new(key.to_bytes().to_vec()),
		public: SignaturePublicKey::new(key.verifying_key().to_bytes().to_vec()),
	}
}

// signed for group_id() at `li`
pub fn leaf_node(identity: &[u8], source: LeafNodeSource, li: LeafIndex) -> (LeafNode, SignatureKeyPair) {
	let keys = signature_key_pair(identity);
	let mut leaf = LeafNode {
		encryption_key: SUITE.generate_hpke_key_pair().unwrap().public,
		signature_key: keys.public.clone(),
		credential: Credential::basic(identity),
		capabilities: Capabilities {
			versions: vec![1],
			cipher_suites: vec![1, 3],
			..Default::default()
		},
		source,
		extensions: vec![],
		signature: vec![],
	};
	leaf.sign(SUITE, &keys.private, &group_id(), li).unwrap();

	(leaf, keys)
}

pub fn key_package(identity: &[u8]) -> (KeyPackage, MemberKeys) {
	let lifetime = Lifetime {
		not_before: 0,
		not_after: u64::MAX,
	};
	let (leaf, signature) = leaf_node(identity, LeafNodeSource::KeyPackage(lifetime), LeafIndex(0));
	let init = SUITE.generate_hpke_key_pair().unwrap();
	let kp = KeyPackage::new(SUITE, init.public.clone(), leaf, vec![], &signature.private).unwrap();

	(kp, MemberKeys { signature, init })
}

pub fn parent_node() -> ParentNode {
	ParentNode {
		encryption_key: SUITE.generate_hpke_key_pair().unwrap().public,
		parent_hash: vec![],
		unmerged_leaves: vec![],
	}
}

fn set_parent_hash(tree: &mut RatchetTree, x: usize, parent_hash: Vec<u8>) {
	if let Some(Some(Node::Parent(parent))) = tree.nodes.get_mut(x) {
		parent.parent_hash = parent_hash;
	}
}

//          3
//    1           5(unmerged: 2)
// 0     2     4     6
//
// alice (0) committed last and dave (6) before her, then carol (4) was added;
// bob (2) and carol hold key package leaves
pub fn tree_with_parent_hashes() -> RatchetTree {
	let lifetime = Lifetime {
		not_before: 0,
		not_after: u64::MAX,
	};
	let mut tree = RatchetTree {
		nodes: vec![None; 7],
	};

	tree.nodes[2] = Some(Node::Leaf(leaf_node(b"bob", LeafNodeSource::KeyPackage(lifetime), LeafIndex(1)).0));
	tree.nodes[4] = Some(Node::Leaf(leaf_node(b"carol", LeafNodeSource::KeyPackage(lifetime), LeafIndex(2)).0));

	let mut p5 = parent_node();
	p5.unmerged_leaves = vec![LeafIndex(2)];
	tree.nodes[5] = Some(Node::Parent(p5));
	tree.nodes[1] = Some(Node::Parent(parent_node()));
	tree.nodes[3] = Some(Node::Parent(parent_node()));

	let sibling = tree.compute_tree_hash(SUITE, NodeIndex(4), &[LeafIndex(2)]).unwrap();
	let ph5 = tree.compute_parent_hash(SUITE, NodeIndex(5), &sibling).unwrap();
	tree.nodes[6] = Some(Node::Leaf(leaf_node(b"dave", LeafNodeSource::Commit(ph5), LeafIndex(3)).0));

	let sibling = tree.compute_tree_hash(SUITE, NodeIndex(5), &[]).unwrap();
	let ph3 = tree.compute_parent_hash(SUITE, NodeIndex(3), &sibling).unwrap();
	set_parent_hash(&mut tree, 1, ph3);

	let sibling = tree.compute_tree_hash(SUITE, NodeIndex(2), &[]).unwrap();
	let ph1 = tree.compute_parent_hash(SUITE, NodeIndex(1), &sibling).unwrap();
	tree.nodes[0] = Some(Node::Leaf(leaf_node(b"alice", LeafNodeSource::Commit(ph1), LeafIndex(0)).0));

	tree
}

pub fn group_context(tree: &RatchetTree) -> GroupContext {
	GroupContext {
		version: ProtocolVersion::Mls10,
		cipher_suite: SUITE,
		group_id: group_id(),
		epoch: 3,
		tree_hash: tree.tree_hash(SUITE).unwrap(),
		confirmed_transcript_hash: vec![0x11; 32],
		extensions: vec![],
	}
}

// signed by alice at leaf 0, confirmed under JOINER_SECRET with no psks
pub fn group_info(tree: &RatchetTree) -> (GroupInfo, SignatureKeyPair) {
	let group_context = group_context(tree);
	let ks = KeySchedule::from_joiner(SUITE, &JOINER_SECRET, None, &group_context).unwrap();
	let signer = signature_key_pair(b"alice");
	let mut info = GroupInfo {
		confirmation_tag: ks.confirmation_tag(&group_context.confirmed_transcript_hash).unwrap(),
		group_context,
		extensions: vec![],
		signer: LeafIndex(0),
		signature: vec![],
	};
	info.sign(SUITE, &signer.private).unwrap();

	(info, signer)
}
