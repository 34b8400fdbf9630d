use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use leasekeeper::config::AppConfig;
use leasekeeper::domain::{Vendor, VendorId};
use leasekeeper::notify::OutboundQueue;
use leasekeeper::session::SessionKeys;
use leasekeeper::store::{InMemoryStore, StoreError, VendorRepository};
use leasekeeper::workflows::dispatch::MaintenanceDispatcher;
use leasekeeper::workflows::occupancy::OccupancyManager;
use leasekeeper::workflows::onboarding::{OnboardingService, OnboardingSettings, SignupTokens};
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every workflow service wired against one shared store and outbox.
pub(crate) struct Services {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) outbox: Arc<OutboundQueue>,
    pub(crate) sessions: Arc<SessionKeys>,
    pub(crate) occupancy: Arc<OccupancyManager<InMemoryStore>>,
    pub(crate) dispatcher: Arc<MaintenanceDispatcher<InMemoryStore>>,
    pub(crate) onboarding: Arc<OnboardingService<InMemoryStore>>,
}

impl Services {
    pub(crate) fn build(config: &AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let outbox = Arc::new(OutboundQueue::new(config.mail.max_attempts));
        let tokens = &config.tokens;
        let sessions = Arc::new(SessionKeys::new(
            tokens.signing_secret.clone(),
            tokens.session_ttl,
        ));

        let occupancy = Arc::new(OccupancyManager::new(Arc::clone(&store)));
        let dispatcher = Arc::new(MaintenanceDispatcher::new(
            Arc::clone(&store),
            outbox.clone(),
            config.links.base_url.as_str(),
            tokens.maintenance_token_ttl,
        ));
        let onboarding = Arc::new(OnboardingService::new(
            Arc::clone(&store),
            Arc::clone(&occupancy),
            outbox.clone(),
            SignupTokens::new(tokens.signing_secret.clone(), tokens.signup_token_ttl),
            Arc::clone(&sessions),
            OnboardingSettings::new(config.links.base_url.as_str(), tokens.invitation_ttl),
        ));

        Self {
            store,
            outbox,
            sessions,
            occupancy,
            dispatcher,
            onboarding,
        }
    }
}

// (company, email, services, verified, rating)
const VENDOR_DIRECTORY: &[(&str, &str, &[&str], bool, u8)] = &[
    ("Prairie Plumbing Co", "dispatch@prairieplumbing.example", &["PLUMBING"], true, 47),
    ("Hawkeye Heating & Air", "service@hawkeyehvac.example", &["HVAC"], true, 44),
    ("Bright Line Electric", "jobs@brightline.example", &["ELECTRICAL"], true, 46),
    ("Handy Hands", "hello@handyhands.example", &["GENERAL", "PLUMBING", "APPLIANCE"], true, 39),
    ("Unlisted Roofing", "quotes@unlistedroofing.example", &["ROOFING"], false, 0),
];

/// Vendor directory loaded at startup; the engine has no vendor management of its own.
pub(crate) fn seed_vendors(store: &InMemoryStore) -> Result<Vec<Vendor>, StoreError> {
    VENDOR_DIRECTORY
        .iter()
        .map(|&(company, email, services, verified, rating)| {
            store.insert_vendor(Vendor {
                id: VendorId::new(),
                company_name: company.to_string(),
                email: email.to_string(),
                services: services.iter().map(|service| service.to_string()).collect(),
                is_verified: verified,
                rating,
            })
        })
        .collect()
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw.trim()).map_err(|err| format!("failed to parse '{raw}' as a UUID ({err})"))
}

/// Self-contained configuration for the demo and tests: log transport, fixed signing secret.
pub(crate) fn local_config(signing_secret: &str) -> AppConfig {
    use leasekeeper::config::{
        AppEnvironment, LinkConfig, LogFormat, MailConfig, MailTransportConfig, ServerConfig,
        TelemetryConfig, TokenConfig,
    };

    AppConfig {
        environment: AppEnvironment::Development,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        telemetry: TelemetryConfig {
            log_level: "info".to_string(),
            format: LogFormat::Compact,
        },
        mail: MailConfig {
            transport: MailTransportConfig::Log,
            from: "Leasekeeper <no-reply@leasekeeper.local>".to_string(),
            max_attempts: 3,
            flush_interval_secs: 5,
        },
        links: LinkConfig {
            base_url: "http://localhost:3000".to_string(),
        },
        tokens: TokenConfig {
            signing_secret: Some(signing_secret.to_string()),
            ..TokenConfig::default()
        },
    }
}
