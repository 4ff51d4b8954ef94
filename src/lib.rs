mod key;

pub mod aead;
pub mod codec;
pub mod commit;
pub mod credential;
pub mod crypto;
pub mod extension;
pub mod group_context;
pub mod group_info;
pub mod hpke;
pub mod key_package;
pub mod key_schedule;
pub mod leaf_node;
pub mod proposal;
pub mod psk;
pub mod tree;
pub mod treemath;
pub mod welcome;

#[cfg(test)]
mod test_utils;
