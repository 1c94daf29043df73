use std::sync::Arc;

use anyhow::{Context, Result};

use super::anomaly::AnomalyDetector;
use super::audit;
use super::audit::clock::{Clock, SystemClock};
use super::audit::writer::AuditWorker;
use super::authn::jwt::JwtAuthenticator;
use super::authz::matrix::PermissionMatrix;
use super::authz::ownership::OwnershipValidator;
use super::authz::permission::PermissionEvaluator;
use super::config::ServerConfig;
use super::db::Database;
use super::lookup::LookupRegistry;
use super::pipeline::Pipeline;
use super::restful::{RestfulContext, RestfulServer};

/// Builds every long-lived component exactly once at start-up.
pub struct ServerFactory {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    cfg: ServerConfig,
}

impl ServerFactory {
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let db = Database::new(&cfg.db.sqlite).context("init database")?;
        Ok(Self::with_parts(cfg, Arc::new(db), Arc::new(SystemClock)))
    }

    /// Uses an existing database and clock instead of the configured ones.
    pub fn with_parts(cfg: ServerConfig, db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock, cfg }
    }

    /// The server and the audit writer it feeds. The writer must be started
    /// before the server runs.
    pub fn build_server(&self) -> Result<(RestfulServer, AuditWorker)> {
        let (ctx, worker) = self.build_context()?;

        let mut srv = RestfulServer::new(self.cfg.bind.clone(), ctx, self.cfg.payload_limit_mib);
        if self.cfg.keep_alive_secs > 0 {
            srv.set_keep_alive_secs(self.cfg.keep_alive_secs);
        }
        if self.cfg.workers > 0 {
            srv.set_workers(self.cfg.workers);
        }

        Ok((srv, worker))
    }

    pub fn build_context(&self) -> Result<(Arc<RestfulContext>, AuditWorker)> {
        let registry = Arc::new(LookupRegistry::with_database(self.db.clone()));

        let matrix = PermissionMatrix::defaults().with_overrides(self.cfg.authz.role_overrides());
        let pipeline = Pipeline::new(
            PermissionEvaluator::new(Arc::new(matrix)),
            OwnershipValidator::new(registry.clone()),
            AnomalyDetector::new(self.cfg.anomaly.clone()),
        );

        let (audit, worker) =
            audit::build(&self.cfg.audit, self.clock.clone()).context("init audit logger")?;

        let ctx = RestfulContext {
            authn: Box::new(JwtAuthenticator::new(&self.cfg.authn)),
            pipeline,
            registry,
            audit,
            audit_dir: self.cfg.audit.dir_path.clone(),
            clock: self.clock.clone(),
        };
        Ok((Arc::new(ctx), worker))
    }
}
