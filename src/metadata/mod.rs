//! Function and environment metadata sources.

pub mod etcd;

pub use etcd::EtcdMetadataClient;
