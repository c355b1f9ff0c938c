use std::sync::Arc;

use murmur_db::Database;

use crate::mailer::Mailer;
use crate::suggest::Suggester;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub mailer: Mailer,
    pub suggester: Suggester,
}
