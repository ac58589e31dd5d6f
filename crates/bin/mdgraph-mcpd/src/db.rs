use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::config::MdgraphConfig;

/// Opens the configured store and selects its namespace and database.
///
/// The URL scheme picks the engine: `mem://` for an in-process store, `ws://`
/// or `http://` for a remote server.
pub async fn connect(config: &MdgraphConfig) -> Result<Surreal<Any>, surrealdb::Error> {
    let db = any::connect(config.db_url.as_str()).await?;

    if let Some(credentials) = config.db_credentials.as_ref() {
        db.signin(Root {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
        })
        .await?;
    }

    db.use_ns(&config.db_namespace)
        .use_db(&config.db_name)
        .await?;

    info!(
        url = %config.db_url,
        namespace = %config.db_namespace,
        database = %config.db_name,
        "connected to store"
    );
    Ok(db)
}
