// src/state.rs
use sqlx::PgPool;
use std::sync::Arc;

use crate::mailer::Mailer;
use crate::storage::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(db_pool: PgPool, mailer: Arc<dyn Mailer>, images: Arc<dyn ImageStore>) -> Self {
        Self { db_pool, mailer, images }
    }
}
