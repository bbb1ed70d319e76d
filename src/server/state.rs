use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::mail::{create_mail_repository, MailComposer, MailRepository};
use crate::postgres::PostgresPool;
use crate::template::TemplateRenderer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub renderer: TemplateRenderer,
    pub repository: Arc<dyn MailRepository>,
    pub composer: MailComposer,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings, postgres_pool: Option<Arc<PostgresPool>>) -> Self {
        let repository = create_mail_repository(&settings.database, postgres_pool);
        Self::with_repository(settings, repository)
    }

    /// State backed by the given repository
    pub fn with_repository(settings: Settings, repository: Arc<dyn MailRepository>) -> Self {
        let renderer = TemplateRenderer::new(settings.templates.clone());
        let composer = MailComposer::new(Arc::new(renderer.clone()), repository.clone());

        Self {
            settings: Arc::new(settings),
            renderer,
            repository,
            composer,
            start_time: Instant::now(),
        }
    }
}
