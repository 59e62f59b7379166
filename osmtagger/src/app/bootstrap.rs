//! Application bootstrap.
//!
//! `AppContext` owns every long-lived component and wires them together:
//!
//! 1. the preset catalog, loading in the background
//! 2. the edit staging store, restored from the data directory
//! 3. the remote data index and the area downloader that fills it
//! 4. the sync client, which asks the downloader to refetch after an upload
//! 5. the Overpass client, whose search results join the same index

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tracing::{info, warn};

use super::config::AppConfig;
use super::error::AppError;
use crate::coord::GeoPoint;
use crate::osm::{
    Authenticator, FileTokenStore, LoginPrompt, ObjectType, OsmApi, OsmError, OsmTransport,
    ReqwestTransport, TOKEN_FILE,
};
use crate::preset::{CatalogHandle, CatalogLoader};
use crate::remote::{
    AreaDownloader, LayerSink, OverpassClient, OverpassQuery, RemoteDataIndex,
    SavedLayerPresenter, TapHit, ViewportStore,
};
use crate::staging::{EditStagingStore, StagedObject, Subscription};
use crate::sync::{RefetchHook, SyncClient};

/// Reloads the current area in the background after a submission.
struct DownloadRefetch<T> {
    downloader: Arc<AreaDownloader<T>>,
    handle: Handle,
}

impl<T: OsmTransport + 'static> RefetchHook for DownloadRefetch<T> {
    fn refetch(&self) {
        let downloader = Arc::clone(&self.downloader);
        self.handle.spawn(async move {
            if let Err(e) = downloader.refresh().await {
                warn!(error = %e, "Area refetch failed");
            }
        });
    }
}

/// The editor's components, owned in one place.
pub struct AppContext<T = ReqwestTransport> {
    config: AppConfig,
    catalog: CatalogHandle,
    store: Arc<EditStagingStore>,
    index: Arc<RemoteDataIndex>,
    downloader: Arc<AreaDownloader<T>>,
    sync: SyncClient<T>,
    overpass: OverpassClient<T>,
    /// Set when created via `start_sync()`.
    runtime: Option<Runtime>,
}

impl AppContext<ReqwestTransport> {
    /// Starts the application on the current runtime.
    pub async fn start(
        config: AppConfig,
        prompt: Option<Arc<dyn LoginPrompt>>,
    ) -> Result<Self, AppError> {
        let transport = Arc::new(ReqwestTransport::with_timeout(config.timeout_secs)?);
        Self::start_with_transport(config, transport, prompt).await
    }

    /// Starts the application on a runtime it owns, for synchronous callers.
    pub fn start_sync(
        config: AppConfig,
        prompt: Option<Arc<dyn LoginPrompt>>,
    ) -> Result<Self, AppError> {
        let runtime = Runtime::new().map_err(|e| AppError::RuntimeCreation(e.to_string()))?;
        let mut app = runtime.block_on(Self::start(config, prompt))?;
        app.runtime = Some(runtime);
        Ok(app)
    }
}

impl<T: OsmTransport + 'static> AppContext<T> {
    /// Starts the application with a caller-provided transport.
    pub async fn start_with_transport(
        config: AppConfig,
        transport: Arc<T>,
        prompt: Option<Arc<dyn LoginPrompt>>,
    ) -> Result<Self, AppError> {
        let data_dir = config.staging.data_dir.clone();
        fs::create_dir_all(&data_dir).map_err(|source| AppError::DataDir {
            path: data_dir.clone(),
            source,
        })?;
        info!(data_dir = %data_dir.display(), api = %config.server.api_url, "Starting osmtagger");

        let catalog = CatalogLoader::spawn(config.presets.clone());
        let store = Arc::new(EditStagingStore::open(&data_dir));
        info!(pending = store.len(), "Staging store restored");

        let api = OsmApi::new(Arc::clone(&transport), config.server.api_url.clone());
        let index = Arc::new(RemoteDataIndex::new());
        let downloader = Arc::new(AreaDownloader::new(
            api.clone(),
            Arc::clone(&index),
            ViewportStore::new(&data_dir),
            config.download.clone(),
        ));

        let overpass = OverpassClient::new(Arc::clone(&transport), config.overpass_url.clone());

        let mut auth = Authenticator::new(
            Arc::clone(&transport),
            config.oauth.clone(),
            config.server.api_url.clone(),
            Arc::new(FileTokenStore::new(data_dir.join(TOKEN_FILE))),
        );
        if let Some(prompt) = prompt {
            auth = auth.with_prompt(prompt);
        }

        let refetch = DownloadRefetch {
            downloader: Arc::clone(&downloader),
            handle: Handle::current(),
        };
        let mut sync = SyncClient::new(api, auth).with_refetch_hook(Arc::new(refetch));
        if let Some(comment) = &config.changeset_comment {
            sync = sync.with_default_comment(comment.clone());
        }

        Ok(Self {
            config,
            catalog,
            store,
            index,
            downloader,
            sync,
            overpass,
            runtime: None,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<EditStagingStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<RemoteDataIndex> {
        &self.index
    }

    pub fn downloader(&self) -> &Arc<AreaDownloader<T>> {
        &self.downloader
    }

    pub fn sync(&self) -> &SyncClient<T> {
        &self.sync
    }

    pub fn overpass(&self) -> &OverpassClient<T> {
        &self.overpass
    }

    /// Runs a tag search and adds the answer to the remote index.
    ///
    /// Results can be tapped and edited like downloaded features.
    pub async fn search(&self, query: &OverpassQuery) -> Result<Vec<StagedObject>, OsmError> {
        self.overpass.search(query, &self.index).await
    }

    /// Features near `point`, with pending edits drawn over downloaded data.
    ///
    /// Features marked for deletion are left out.
    pub fn tap(&self, point: GeoPoint, tolerance: f64) -> Vec<TapHit> {
        let deleted: HashSet<(ObjectType, i64)> = self
            .store
            .pending_deletes()
            .iter()
            .map(|o| (o.object_type(), o.id))
            .collect();
        let mut hits = self
            .index
            .resolve_tap(point, tolerance, &self.store.pending_saves());
        hits.retain(|hit| !deleted.contains(&(hit.object_type, hit.id)));
        hits
    }

    /// Draws pending edits on `sink` now and after every staging change.
    pub fn attach_layer_sink(&self, sink: Arc<dyn LayerSink>) -> Subscription {
        let presenter = Arc::new(SavedLayerPresenter::new(sink));
        presenter.redraw(&self.store.snapshot());
        self.store.subscribe(presenter)
    }

    /// Handle to the runtime driving background work.
    ///
    /// # Panics
    ///
    /// Panics if the app was started with `start()` and no runtime is active.
    pub fn runtime_handle(&self) -> Handle {
        self.runtime
            .as_ref()
            .map(|r| r.handle().clone())
            .unwrap_or_else(Handle::current)
    }
}
