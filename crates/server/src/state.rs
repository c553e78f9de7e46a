use std::sync::{Arc, MutexGuard};

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate};
use finfolio_core::Finfolio;
use finfolio_core::errors::CoreError;
use finfolio_core::models::report::RefreshSummary;
use finfolio_core::news::NewsFetcher;
use finfolio_core::news::cache::NewsCache;
use finfolio_core::services::account_service::{PasswordJob, PasswordOutcome};
use finfolio_core::services::currency_service::FxTable;
use finfolio_core::services::price_service::RefreshPlan;
use finfolio_core::storage::manager::StorageManager;

use crate::api::error::ApiError;
use crate::auth::SessionStore;
use crate::config::ServerConfig;

pub type SharedState = Arc<AppState>;

/// Everything the handlers share.
///
/// `app` is never held across a network call or Argon2 work; those run
/// between two short lock scopes.
pub struct AppState {
    pub app: tokio::sync::Mutex<Finfolio>,
    /// Held until a snapshot write finishes, even if its caller is cancelled
    save_lock: Arc<tokio::sync::Mutex<()>>,
    pub news: tokio::sync::Mutex<NewsCache>,
    pub fetcher: NewsFetcher,
    pub sessions: std::sync::Mutex<SessionStore>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(app: Finfolio, config: ServerConfig) -> Result<Self> {
        let fetcher =
            NewsFetcher::new(config.news.clone()).context("Failed to set up the news fetcher")?;
        let news_ttl = i64::try_from(config.news.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let session_ttl = Duration::try_hours(config.session_ttl_hours).unwrap_or(Duration::MAX);
        Ok(Self {
            app: tokio::sync::Mutex::new(app),
            save_lock: Arc::new(tokio::sync::Mutex::new(())),
            news: tokio::sync::Mutex::new(NewsCache::new(news_ttl)),
            fetcher,
            sessions: std::sync::Mutex::new(SessionStore::new(session_ttl)),
            config,
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    pub fn sessions(&self) -> Result<MutexGuard<'_, SessionStore>, ApiError> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::Internal("Session store lock poisoned".to_string()))
    }

    /// Write the snapshot if anything changed. Returns whether a save happened.
    ///
    /// The database is copied under the lock; encryption and the file write
    /// run on the blocking pool. A failed write leaves the changes unsaved.
    pub async fn save_if_dirty(&self) -> Result<bool> {
        let Some(passphrase) = self.config.passphrase.clone().filter(|p| !p.is_empty()) else {
            return Ok(false);
        };
        let writing = self.save_lock.clone().lock_owned().await;
        let snapshot = {
            let mut app = self.app.lock().await;
            if !app.has_unsaved_changes() {
                return Ok(false);
            }
            app.begin_save()
        };

        let path = self.config.data_file.clone();
        let written = tokio::task::spawn_blocking(move || {
            let _writing = writing;
            StorageManager::save_to_file(&snapshot, &path, &passphrase)
        })
        .await;

        match written {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) => {
                self.app.lock().await.mark_unsaved();
                Err(e).with_context(|| format!("Failed to save {}", self.config.data_file.display()))
            }
            Err(e) => {
                self.app.lock().await.mark_unsaved();
                Err(e).context("Save task failed")
            }
        }
    }

    /// Exchange rates for `user_id`'s holdings on `date`.
    pub async fn fx_table(&self, user_id: u64, date: NaiveDate) -> FxTable {
        let (plan, prices) = {
            let app = self.app.lock().await;
            (app.fx_plan(user_id, date), app.price_service())
        };
        let fetched = plan.fetch(&prices).await;
        self.app.lock().await.apply_fx(plan, fetched)
    }

    /// Run the price refresh `pick` plans. Quotes are fetched unlocked.
    pub async fn refresh_prices(
        &self,
        pick: impl FnOnce(&Finfolio) -> Result<RefreshPlan, CoreError>,
    ) -> Result<RefreshSummary, CoreError> {
        let (plan, prices) = {
            let app = self.app.lock().await;
            (pick(&*app)?, app.price_service())
        };
        let quotes = prices.fetch_refresh(&plan).await;
        Ok(self.app.lock().await.apply_refresh(&plan, quotes))
    }
}

/// Run password hashing or verification on the blocking pool.
pub async fn run_password_job(job: PasswordJob) -> Result<PasswordOutcome, ApiError> {
    tokio::task::spawn_blocking(move || job.run())
        .await
        .map_err(|e| ApiError::Internal(format!("Password task failed: {e}")))?
        .map_err(ApiError::from)
}

/// Open the snapshot named in the config, or start empty when there is none.
pub fn open_finfolio(config: &ServerConfig) -> Result<Finfolio> {
    let path = &config.data_file;
    if !path.exists() {
        tracing::info!(path = %path.display(), "No data file, starting empty");
        return Ok(Finfolio::create_new());
    }
    let Some(passphrase) = config.passphrase.as_deref().filter(|p| !p.is_empty()) else {
        bail!(
            "{} exists but no passphrase was given (set FINFOLIO_PASSPHRASE)",
            path.display()
        );
    };
    let app = Finfolio::load_from_file(path, passphrase)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded data file");
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir, passphrase: Option<&str>) -> ServerConfig {
        ServerConfig {
            data_file: dir.path().join("finfolio.db"),
            passphrase: passphrase.map(str::to_string),
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn saves_only_when_dirty_and_persistent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config_in(&dir, Some("secret"));
        let state = AppState::new(Finfolio::create_new(), config.clone())?;

        assert!(!state.save_if_dirty().await?);
        state
            .app
            .lock()
            .await
            .create_superuser("admin", "admin@example.com", "Str0ng-pass!")?;
        assert!(state.save_if_dirty().await?);
        assert!(!state.save_if_dirty().await?);

        let reopened = open_finfolio(&config)?;
        assert!(reopened.db().user_by_username("admin").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn memory_only_never_writes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config_in(&dir, None);
        let state = AppState::new(Finfolio::create_new(), config.clone())?;
        state
            .app
            .lock()
            .await
            .create_superuser("admin", "admin@example.com", "Str0ng-pass!")?;

        assert!(!state.save_if_dirty().await?);
        assert!(!config.data_file.exists());
        Ok(())
    }

    #[tokio::test]
    async fn failed_save_keeps_changes_unsaved() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = ServerConfig {
            data_file: dir.path().join("missing").join("finfolio.db"),
            passphrase: Some("secret".to_string()),
            ..ServerConfig::default()
        };
        let state = AppState::new(Finfolio::create_new(), config)?;
        state
            .app
            .lock()
            .await
            .create_superuser("admin", "admin@example.com", "Str0ng-pass!")?;

        let err = state.save_if_dirty().await.unwrap_err();
        assert!(err.to_string().contains("Failed to save"));
        assert!(state.app.lock().await.has_unsaved_changes());
        Ok(())
    }

    #[tokio::test]
    async fn changes_during_a_save_stay_dirty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config_in(&dir, Some("secret"));
        let state = AppState::new(Finfolio::create_new(), config.clone())?.shared();
        state
            .app
            .lock()
            .await
            .create_superuser("admin", "admin@example.com", "Str0ng-pass!")?;

        let saving = tokio::spawn({
            let state = state.clone();
            async move { state.save_if_dirty().await }
        });
        tokio::task::yield_now().await;
        state
            .app
            .lock()
            .await
            .create_superuser("root", "root@example.com", "Str0ng-pass!")?;
        saving.await??;

        // Whatever the interleaving, the second user reaches the disk
        state.save_if_dirty().await?;
        let reopened = open_finfolio(&config)?;
        assert!(reopened.db().user_by_username("root").is_some());
        Ok(())
    }

    #[test]
    fn existing_file_needs_a_passphrase() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config_in(&dir, Some("secret"));
        let mut app = Finfolio::create_new();
        app.save_to_file(&config.data_file, "secret")?;

        let err = open_finfolio(&config_in(&dir, None)).unwrap_err();
        assert!(err.to_string().contains("no passphrase"));

        let err = open_finfolio(&config_in(&dir, Some("wrong"))).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
        Ok(())
    }
}
