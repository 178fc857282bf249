use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use gateway_infra::account_store::{AccountStore, InMemoryAccountStore, PostgresAccountStore};
use gateway_infra::config::GatewayConfig;
use gateway_infra::invoice_store::{InMemoryInvoiceStore, InvoiceStore, PostgresInvoiceStore};
use gateway_infra::{InvoiceService, LedgerService, db};

pub type SharedAccountStore = Arc<dyn AccountStore>;
pub type SharedInvoiceStore = Arc<dyn InvoiceStore>;

/// Services shared by every handler.
///
/// The store backend is chosen once at startup; handlers only see the
/// type-erased stores.
pub struct AppServices {
    ledger: Arc<LedgerService<SharedAccountStore>>,
    invoices: InvoiceService<SharedAccountStore, SharedInvoiceStore>,
}

impl AppServices {
    pub fn new(accounts: SharedAccountStore, invoices: SharedInvoiceStore) -> Self {
        let ledger = Arc::new(LedgerService::new(accounts));
        Self {
            invoices: InvoiceService::new(ledger.clone(), invoices),
            ledger,
        }
    }

    pub fn ledger(&self) -> &LedgerService<SharedAccountStore> {
        &self.ledger
    }

    pub fn invoices(&self) -> &InvoiceService<SharedAccountStore, SharedInvoiceStore> {
        &self.invoices
    }
}

pub fn build_in_memory_services(lock_timeout: Duration) -> AppServices {
    AppServices::new(
        Arc::new(InMemoryAccountStore::with_lock_timeout(lock_timeout)),
        Arc::new(InMemoryInvoiceStore::new()),
    )
}

pub async fn build_persistent_services(config: &GatewayConfig) -> anyhow::Result<AppServices> {
    let pool = db::connect(&config.database)
        .await
        .context("failed to connect to Postgres")?;
    db::ensure_schema(&pool)
        .await
        .context("failed to create schema")?;

    Ok(AppServices::new(
        Arc::new(PostgresAccountStore::new(pool.clone(), config.lock_timeout)),
        Arc::new(PostgresInvoiceStore::new(pool)),
    ))
}

pub async fn build_services(config: &GatewayConfig) -> anyhow::Result<AppServices> {
    if config.use_persistent_stores {
        build_persistent_services(config).await
    } else {
        tracing::info!("using in-memory stores");
        Ok(build_in_memory_services(config.lock_timeout))
    }
}
