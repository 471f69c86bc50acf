//! Service wiring: document store, collection cache, repositories, rule
//! source and token codec, shared by every handler.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sqlx::PgPool;

use aula_auth::{Hs256JwtCodec, NewUser, Role, RoleName, UserAccount, hash_password};
use aula_infra::{
    CollectionCache, DocumentRuleSource, DocumentStore, InMemoryDocumentStore, PostgresDocumentStore,
    Repositories, RuleSource, SystemClock,
};

use crate::config::{AdminBootstrap, AppConfig};

pub struct AppServices {
    pub repos: Repositories,
    pub rules: Arc<dyn RuleSource>,
    pub jwt: Arc<Hs256JwtCodec>,
}

impl AppServices {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<CollectionCache>, config: &AppConfig) -> Self {
        let repos = Repositories::new(store, cache);
        let rules: Arc<dyn RuleSource> =
            Arc::new(DocumentRuleSource::new(repos.users.clone(), repos.roles.clone()));
        let jwt = Arc::new(
            Hs256JwtCodec::new(config.jwt_secret.as_bytes(), config.jwt_ttl)
                .with_refresh_ttl(config.jwt_refresh_ttl),
        );

        Self { repos, rules, jwt }
    }

    /// Make sure the configured account exists and holds the `admin` role.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> anyhow::Result<()> {
        let admin_name = RoleName::new(RoleName::ADMIN);
        let role = match self.repos.roles.by_name(&admin_name).await? {
            Some(role) => role,
            None => {
                let role = Role::new(admin_name, "Full access to every operation");
                self.repos.roles.save(&role).await?;
                tracing::info!(role = %role.name, "created admin role");
                role
            }
        };

        let email = admin.email.trim().to_lowercase();
        let (mut user, created) = match self.repos.users.by_email(&email).await? {
            Some(user) => (user, false),
            None => {
                let username = email.split('@').next().unwrap_or("admin").to_string();
                let input = NewUser {
                    email: email.clone(),
                    username,
                    name: "Administrator".to_string(),
                    password: admin.password.clone(),
                }
                .validated()
                .context("invalid ADMIN_EMAIL")?;
                let hash = hash_password(&input.password).context("invalid ADMIN_PASSWORD")?;
                (UserAccount::new(input, hash, Utc::now()), true)
            }
        };

        if user.assign_role(role.summary()) || created {
            self.repos.users.save(&user).await?;
            tracing::info!(user_id = %user.id, email = %user.email, "admin account ready");
        }
        Ok(())
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            let store = PostgresDocumentStore::new(pool);
            store.ensure_schema().await?;
            tracing::info!("using Postgres document store");
            Arc::new(store)
        }
        None => {
            tracing::info!("using in-memory document store");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let cache = Arc::new(CollectionCache::new(SystemClock, config.cache_ttl));
    let services = AppServices::new(store, cache, config);

    if let Some(admin) = &config.admin {
        services.bootstrap_admin(admin).await?;
    }

    Ok(services)
}
