//! `catalog-admin [ENTITY] [SEARCH]`
//!
//! Prints the admin list page of ENTITY (a registry slug such as
//! `product_price`), or of every registered page, as JSON.

use anyhow::{Context, bail};
use chrono::Utc;

use catalog_admin::{AdminEntity, AdminRegistry, ListView, ListViewBuilder};
use catalog_infra::{
    CatalogConfig, CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreBackend, seed_demo_catalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CatalogConfig::from_env().context("invalid catalog configuration")?;
    catalog_observability::init(config.log_format, &config.log_level);

    let registry = AdminRegistry::load().context("invalid admin registry")?;

    let mut args = std::env::args().skip(1);
    let entity = match args.next() {
        Some(slug) => match AdminEntity::from_slug(&slug) {
            Some(entity) => Some(entity),
            None => bail!("unknown admin page {slug:?}"),
        },
        None => None,
    };
    let search = args.next();

    match &config.store {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory catalog store; data is not persisted");
            run(&InMemoryCatalogStore::new(), &config, registry, entity, search).await
        }
        StoreBackend::Postgres { url, max_connections } => {
            let store = PostgresCatalogStore::connect(url, *max_connections)
                .await
                .context("failed to connect to the catalog database")?;
            store.migrate().await?;
            run(&store, &config, registry, entity, search).await
        }
    }
}

async fn run<S: CatalogStore>(
    store: &S,
    config: &CatalogConfig,
    registry: AdminRegistry,
    entity: Option<AdminEntity>,
    search: Option<String>,
) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();

    if config.seed {
        let report = seed_demo_catalog(store, today).await?;
        tracing::info!(created = report.created, existing = report.existing, "seeding finished");
    }

    let mut views: Vec<ListView> = Vec::new();
    for admin in registry.entries().filter(|a| entity.is_none_or(|e| a.entity == e)) {
        let mut builder = ListViewBuilder::new(admin, today).media_base_url(config.media_base_url.clone());
        if let Some(text) = &search {
            builder = builder.search(text.clone());
        }
        views.push(builder.build(store).await?);
    }

    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}
