//! Shared application state and collaborator wiring.

use std::sync::Arc;

use cart::{CartConfig, CartPersister, CartSnapshot, CartStateManager, CartStore, IdentityCartStore};
use chrono::Duration;
use common::{InMemoryTtlStore, TtlStore};
use fulfillment::{
    OrderLookup, OrderSubmissionOrchestrator, SubmissionConfig, TimestampPoNumberGenerator,
};
use gateway::{
    DistributorApi, HttpDistributorClient, IdentityProvider, InMemoryDistributor,
    InMemoryIdentityProvider, InMemoryPaymentProcessor, PaymentProcessor, WebhookSigner,
};
use reconciler::{PaymentReconciler, ReconcilerConfig};
use secrecy::SecretString;
use shipping::{ShippingConfig, ShippingRateCalculator};

use crate::config::{Config, ConfigError, LOCAL_WEBHOOK_SECRET};
use crate::session::CartSession;

pub type Distributor = Arc<dyn DistributorApi>;
pub type Payments = Arc<dyn PaymentProcessor>;
pub type Identity = Arc<dyn IdentityProvider>;

/// How long an untouched cart session is kept.
pub const SESSION_TTL_DAYS: i64 = 30;

/// The external systems the engine talks to.
pub struct Backends {
    pub distributor: Distributor,
    pub payments: Payments,
    pub identity: Identity,
}

impl Backends {
    /// Builds the HTTP distributor client when a base URL is configured and
    /// in-memory stand-ins for everything else.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let distributor: Distributor =
            match (&config.distributor_base_url, &config.distributor_api_key) {
                (Some(url), Some(key)) => {
                    tracing::info!(base_url = %url, "using HTTP distributor");
                    Arc::new(
                        HttpDistributorClient::new(url.clone(), key.clone())
                            .map_err(|e| ConfigError::DistributorClient(e.to_string()))?,
                    )
                }
                _ => {
                    tracing::warn!("DISTRIBUTOR_BASE_URL not set, using in-memory distributor");
                    Arc::new(InMemoryDistributor::new())
                }
            };

        let secret = config.webhook_secret.clone().unwrap_or_else(|| {
            tracing::warn!("PAYMENT_WEBHOOK_SECRET not set, using local development secret");
            SecretString::from(LOCAL_WEBHOOK_SECRET)
        });
        let signer = WebhookSigner::new(secret)
            .with_tolerance(Duration::seconds(config.webhook_tolerance_secs));

        Ok(Self {
            distributor,
            payments: Arc::new(InMemoryPaymentProcessor::with_signer(signer)),
            identity: Arc::new(InMemoryIdentityProvider::new()),
        })
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub sessions: Arc<dyn TtlStore<CartSnapshot>>,
    pub session_ttl: Duration,
    pub cart_config: CartConfig,
    pub cart_store: Arc<dyn CartStore>,
    pub persister: CartPersister,
    pub identity: Identity,
    pub orchestrator: Arc<OrderSubmissionOrchestrator<Distributor>>,
    pub reconciler: Arc<PaymentReconciler<Distributor, Payments, Identity>>,
    pub orders: OrderLookup<Distributor>,
}

impl AppState {
    /// Wires the engine components over `backends`.
    ///
    /// Spawns the cart persister, so it must run inside a Tokio runtime.
    pub fn new(config: &Config, backends: Backends) -> Arc<Self> {
        let cart_store: Arc<dyn CartStore> =
            Arc::new(IdentityCartStore::new(backends.identity.clone()));
        let persister = CartPersister::spawn(cart_store.clone());

        let calculator = ShippingRateCalculator::new(
            ShippingConfig::default().with_free_shipping_threshold(config.free_shipping_threshold),
        );
        let orchestrator = Arc::new(OrderSubmissionOrchestrator::new(
            backends.distributor.clone(),
            calculator,
            Arc::new(TimestampPoNumberGenerator::new(config.po_prefix.clone())),
            SubmissionConfig {
                warehouse: config.warehouse.clone(),
                payment_type: config.payment_type.clone(),
                test_mode: config.order_test_mode,
                ..Default::default()
            },
        ));
        let reconciler = Arc::new(PaymentReconciler::new(
            orchestrator.clone(),
            backends.payments,
            backends.identity.clone(),
            ReconcilerConfig {
                tax_rate_bps: config.tax_rate_bps,
                ..Default::default()
            },
        ));

        Arc::new(Self {
            sessions: Arc::new(InMemoryTtlStore::new()),
            session_ttl: Duration::days(SESSION_TTL_DAYS),
            cart_config: CartConfig {
                tax_rate_bps: config.tax_rate_bps,
            },
            cart_store,
            persister,
            identity: backends.identity,
            orchestrator,
            reconciler,
            orders: OrderLookup::new(backends.distributor),
        })
    }

    pub fn calculator(&self) -> &ShippingRateCalculator {
        self.orchestrator.calculator()
    }

    /// Loads the session's cart, or an empty anonymous one.
    pub async fn open_cart(&self, session: &CartSession) -> CartStateManager {
        let snapshot = self.sessions.get(session.id()).await.unwrap_or_default();
        CartStateManager::restore(
            snapshot,
            self.cart_config,
            self.cart_store.clone(),
            self.persister.clone(),
        )
    }

    /// Stores the session's cart, restarting its idle timer.
    pub async fn save_cart(&self, session: &CartSession, cart: &CartStateManager) {
        self.sessions
            .set(session.id(), cart.snapshot(), self.session_ttl)
            .await;
    }

    /// Drops expired cart sessions.
    pub async fn purge_expired(&self) -> usize {
        self.sessions.purge_expired().await
    }
}
