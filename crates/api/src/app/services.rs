//! Adapter wiring: picks Postgres or in-memory stores and builds the evaluator.

use std::sync::Arc;

use bitflow_governance::{
    AuditLog, AuditSink, CapabilityStore, PolicyEvaluator, RouteTable, ViolationQuery,
};
use bitflow_infra::{
    FileDeadLetterLog, InMemoryAuditLog, InMemoryCapabilityStore, PoolSettings, PostgresAuditLog,
    PostgresCapabilityStore,
};

use crate::app::routes::operations;
use crate::config::ApiConfig;

pub type Evaluator = PolicyEvaluator<Arc<dyn CapabilityStore>>;

pub struct AppServices {
    pub evaluator: Arc<Evaluator>,
    pub routes: Arc<RouteTable>,
    pub capabilities: Arc<dyn CapabilityStore>,
    pub violations: Arc<dyn ViolationQuery>,
    pub dead_letter: FileDeadLetterLog,
    pub max_body_bytes: usize,
}

impl AppServices {
    pub fn new<L>(
        capabilities: Arc<dyn CapabilityStore>,
        audit: Arc<L>,
        dead_letter: FileDeadLetterLog,
        max_body_bytes: usize,
    ) -> anyhow::Result<Self>
    where
        L: AuditLog + ViolationQuery + 'static,
    {
        let sink = Arc::new(AuditSink::new(
            audit.clone() as Arc<dyn AuditLog>,
            Arc::new(dead_letter.clone()),
        ));
        let evaluator = Arc::new(PolicyEvaluator::new(capabilities.clone(), sink));

        Ok(Self {
            evaluator,
            routes: Arc::new(operations::governance_routes()?),
            capabilities,
            violations: audit,
            dead_letter,
            max_body_bytes,
        })
    }

    /// In-memory wiring; callers keep the store handles to seed data.
    pub fn in_memory(
        capabilities: Arc<InMemoryCapabilityStore>,
        audit: Arc<InMemoryAuditLog>,
        dead_letter: FileDeadLetterLog,
        max_body_bytes: usize,
    ) -> anyhow::Result<Self> {
        Self::new(capabilities, audit, dead_letter, max_body_bytes)
    }
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let dead_letter = FileDeadLetterLog::new(config.dead_letter_path.clone());

    match &config.database_url {
        Some(url) => {
            let pool = bitflow_infra::connect(url, &PoolSettings::default()).await?;
            bitflow_infra::apply_schema(&pool).await?;

            let audit = Arc::new(PostgresAuditLog::new(pool.clone()));
            let report = dead_letter.replay_into(audit.as_ref()).await?;
            if report.replayed > 0 || report.requeued > 0 {
                tracing::warn!(
                    replayed = report.replayed,
                    requeued = report.requeued,
                    "recovered parked security violations"
                );
            }

            tracing::info!("using postgres governance stores");
            AppServices::new(
                Arc::new(PostgresCapabilityStore::new(pool)),
                audit,
                dead_letter,
                config.max_body_bytes,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory governance stores");
            AppServices::in_memory(
                Arc::new(InMemoryCapabilityStore::new()),
                Arc::new(InMemoryAuditLog::new()),
                dead_letter,
                config.max_body_bytes,
            )
        }
    }
}
