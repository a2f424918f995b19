use std::sync::Arc;

use async_trait::async_trait;
use backend_http::{
    api, clear_auth_storage, store_tokens, AuthStateOwner, EnvelopeHooks, FlatRequestClient,
    MemoryCredentialStore, ServiceConfig, TokenPair, TokenRefreshCoordinator,
};

/// Signed-in state of the demo.
///
/// Refresh calls go through a client without a coordinator so they never
/// trigger another refresh.
struct AuthStore {
    refresher: FlatRequestClient,
    store: Arc<MemoryCredentialStore>,
}

#[async_trait]
impl AuthStateOwner for AuthStore {
    async fn reset_store(&self) {
        clear_auth_storage(self.store.as_ref());
        println!("signed out");
    }

    async fn refresh(&self, refresh_token: &str) -> backend_http::Result<TokenPair> {
        api::fetch_refresh_token(&self.refresher, refresh_token)
            .await
            .into_result()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;
    let urls = config.base_urls();
    let coordinator_config = config.coordinator_config();
    let store = Arc::new(MemoryCredentialStore::with_prefix(
        config.storage_prefix.clone(),
    ));

    let auth = Arc::new(AuthStore {
        refresher: FlatRequestClient::new(
            &urls.base_url,
            EnvelopeHooks::new(coordinator_config.envelope.clone()),
        ),
        store: store.clone(),
    });
    let client = FlatRequestClient::new(
        &urls.base_url,
        TokenRefreshCoordinator::new(coordinator_config, store.clone(), auth)
            .with_message_sink(|message| eprintln!("error: {message}")),
    );

    let user = std::env::var("DEMO_USER").unwrap_or_else(|_| "Soybean".to_owned());
    let password = std::env::var("DEMO_PASSWORD").unwrap_or_else(|_| "123456".to_owned());

    let tokens = api::fetch_login(&client, &user, &password).await.into_result()?;
    store_tokens(store.as_ref(), &tokens);

    let info = api::fetch_user_info(&client).await.into_result()?;
    println!("signed in as {} ({:?})", info.user_name, info.roles);

    Ok(())
}
