use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_web::middleware::from_fn;
use actix_web::web::{self, Data, PayloadConfig};
use actix_web::{App, HttpServer};
use anyhow::{Context, Result};
use log::{info, warn};
use sd_notify::NotifyState;

use super::audit::clock::Clock;
use super::audit::writer::AuditLogger;
use super::authn::Authenticator;
use super::handlers;
use super::lookup::LookupRegistry;
use super::pipeline::{audit_middleware, Pipeline};

pub struct RestfulServer {
    ctx: Arc<RestfulContext>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,

    bind: String,

    payload_limit_mib: usize,
}

/// Shared, read-only state of every request.
pub struct RestfulContext {
    pub authn: Box<dyn Authenticator>,
    pub pipeline: Pipeline,
    pub registry: Arc<LookupRegistry>,
    pub audit: AuditLogger,
    pub audit_dir: PathBuf,
    pub clock: Arc<dyn Clock>,
}

impl RestfulServer {
    const API_PATH: &str = "/api";
    const HEALTHZ_PATH: &str = "/healthz";

    pub fn new(bind: String, ctx: Arc<RestfulContext>, payload_limit_mib: usize) -> Self {
        Self {
            ctx,
            keep_alive_secs: None,
            workers: None,
            bind,
            payload_limit_mib,
        }
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    /// Route table shared by the server and the tests. The audit middleware
    /// is wrapped around it by the caller.
    pub fn routes(cfg: &mut web::ServiceConfig) {
        cfg.service(
            web::scope(Self::API_PATH)
                .service(
                    web::resource("/resources/{kind}")
                        .route(web::get().to(handlers::resources::handle))
                        .route(web::post().to(handlers::resources::handle)),
                )
                .service(
                    web::resource("/resources/{kind}/{id}")
                        .route(web::get().to(handlers::resources::handle))
                        .route(web::put().to(handlers::resources::handle))
                        .route(web::patch().to(handlers::resources::handle))
                        .route(web::delete().to(handlers::resources::handle)),
                )
                .service(
                    web::resource("/admin/audit").route(web::get().to(handlers::admin::handle_audit)),
                ),
        )
        .service(web::resource(Self::HEALTHZ_PATH).route(web::get().to(handlers::healthz::handle)))
        .default_service(web::route().to(handlers::default_handler));
    }

    pub async fn run(self) -> Result<()> {
        let ctx = self.ctx.clone();
        let payload_limit = self.payload_limit_mib * 1024 * 1024;
        let mut srv = HttpServer::new(move || {
            App::new()
                .app_data(Data::new(ctx.clone()))
                .app_data(PayloadConfig::new(payload_limit))
                .wrap(from_fn(audit_middleware))
                .configure(Self::routes)
        });

        warn!("Using HTTP (without SSL), terminate TLS in front of this server");
        info!("Binding to http://{}", self.bind);
        srv = srv.bind(&self.bind).context("bind server")?;

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
        info!("Starting restful server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }
}
