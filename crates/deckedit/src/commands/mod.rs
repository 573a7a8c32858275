pub mod completion;
pub mod config;
pub mod generate;
pub mod new;
pub mod render;
pub mod shell;
pub mod templates;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::task::JoinHandle;

use crate::cli::CollabArgs;
use crate::collaboration::{self, Session, client};
use crate::config::Config;
use crate::editor::EditorSession;
use crate::model::Document;
use crate::render::Canvas;
use crate::render::text::FontBook;
use crate::store::{FileStore, StoreError};
use crate::templates::TemplateCatalog;

/// Built-in templates plus the configured template file, if any.
pub fn catalog(config: &Config) -> Result<TemplateCatalog> {
    match &config.templates {
        Some(path) => TemplateCatalog::with_file(path),
        None => Ok(TemplateCatalog::builtin()),
    }
}

/// The configured canvas for a deck stored at `store`.
pub fn canvas(config: &Config, store: &FileStore) -> Result<Canvas> {
    let (width, height) = config.canvas_size();
    let fonts = FontBook::load(config.font_path());
    Canvas::new(width, height, fonts, store.base_dir()).context("Failed to create canvas")
}

/// Open the deck at `store`, or start a new one from the default template
/// when the file does not exist yet.
pub fn open_session(config: &Config, store: &FileStore) -> Result<EditorSession> {
    let catalog = catalog(config)?;
    let canvas = canvas(config, store)?;
    let session = match store.load() {
        Ok(document) => EditorSession::with_document(document, catalog, canvas),
        Err(StoreError::NotFound(_)) => {
            log::info!("{} does not exist; starting a new deck", store.path().display());
            EditorSession::from_template(catalog, canvas, config.default_template())?
        }
        Err(e) => return Err(e.into()),
    };
    Ok(session.with_history_limit(config.history_limit()))
}

pub fn load_document(store: &FileStore) -> Result<Document> {
    store
        .load()
        .with_context(|| format!("Failed to open {}", store.path().display()))
}

/// Attach `session` to a collaboration server when one is configured or
/// given on the command line. Returns the transport task.
pub fn connect(
    session: &mut EditorSession,
    args: &CollabArgs,
    config: &Config,
) -> Result<Option<JoinHandle<()>>> {
    if args.offline {
        return Ok(None);
    }
    let Some(server) = args.server.as_deref().or(config.server()) else {
        return Ok(None);
    };
    let client_config = client::ClientConfig::new(server, config.reconnect_delay())?;

    let shared = Session::new(args.session.clone());
    println!(
        "{} {} {}",
        "Collaborating in session".dimmed(),
        shared.session_id().cyan().bold(),
        format!("via {server}").dimmed()
    );
    let (channel, link) = collaboration::pair(shared);
    let task = client::spawn(client_config, link);
    session.attach_channel(channel);
    Ok(Some(task))
}
