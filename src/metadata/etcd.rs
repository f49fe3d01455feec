use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::{
    config::Etcd,
    core::{
        error::ExecutorResult,
        traits::MetadataClient,
        types::{Environment, Function},
    },
    internal_error, not_found_error,
};

const FUNCTIONS: &str = "functions";
const ENVIRONMENTS: &str = "environments";

/// Metadata client reading JSON documents from etcd.
pub struct EtcdMetadataClient {
    config: Etcd,
    client: Mutex<Option<Client>>,
}

impl EtcdMetadataClient {
    pub fn new(config: Etcd) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    async fn create_client(&self) -> ExecutorResult<Client> {
        let mut options = ConnectOptions::default();
        if let Some(timeout) = self.config.timeout {
            options = options.with_timeout(Duration::from_secs(timeout as u64));
        };
        if let Some(connect_timeout) = self.config.connect_timeout {
            options = options.with_connect_timeout(Duration::from_secs(connect_timeout as u64));
        };
        if let (Some(user), Some(password)) = (&self.config.user, &self.config.password) {
            options = options.with_user(user.clone(), password.clone());
        };

        let client = Client::connect(self.config.host.clone(), Some(options)).await?;
        Ok(client)
    }

    fn key(&self, kind: &str, namespace: &str, name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.prefix.trim_end_matches('/'),
            kind,
            namespace,
            name
        )
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> ExecutorResult<T> {
        let mut client_guard = self.client.lock().await;

        if client_guard.is_none() {
            log::info!("Creating new etcd client...");
            *client_guard = Some(self.create_client().await?);
        }

        let client = client_guard
            .as_mut()
            .ok_or_else(|| internal_error!("Etcd client is not initialized"))?;

        let response = match client.get(key, None).await {
            Ok(response) => response,
            Err(err) => {
                log::error!("etcd get {} failed: {:?}", key, err);
                // Reset the client so the next lookup reconnects
                *client_guard = None;
                return Err(err.into());
            }
        };
        drop(client_guard);

        let kv = response
            .kvs()
            .first()
            .ok_or_else(|| not_found_error!("{}", key))?;
        Ok(serde_json::from_slice(kv.value())?)
    }
}

#[async_trait]
impl MetadataClient for EtcdMetadataClient {
    async fn get_function(&self, namespace: &str, name: &str) -> ExecutorResult<Function> {
        self.fetch(&self.key(FUNCTIONS, namespace, name)).await
    }

    async fn get_environment(&self, namespace: &str, name: &str) -> ExecutorResult<Environment> {
        self.fetch(&self.key(ENVIRONMENTS, namespace, name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn etcd_config(prefix: &str) -> Etcd {
        Etcd {
            host: vec!["http://127.0.0.1:2379".to_string()],
            prefix: prefix.to_string(),
            timeout: None,
            connect_timeout: None,
            user: None,
            password: None,
        }
    }

    #[test]
    fn test_key_layout() {
        let client = EtcdMetadataClient::new(etcd_config("/fnexec"));
        assert_eq!(
            client.key(FUNCTIONS, "default", "hello"),
            "/fnexec/functions/default/hello"
        );

        let client = EtcdMetadataClient::new(etcd_config("/fnexec/"));
        assert_eq!(
            client.key(ENVIRONMENTS, "default", "nodejs"),
            "/fnexec/environments/default/nodejs"
        );
    }
}
