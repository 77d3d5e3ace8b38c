//! Card resolution pipeline – picks a template for every row, renders it and
//! memoises the result.
//!
//! Both caches are owned by [`CardPipeline`] and only ever cleared wholesale:
//! [`CardPipeline::invalidate`] on a locale switch, [`CardPipeline::reload`]
//! when the project is reloaded.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::AssetResolver;
use crate::config::ProjectConfig;
use crate::deck::{CardRecord, ColumnNames};
use crate::error::{CardError, PipelineError};
use crate::fs::FileSystem;
use crate::i18n::LocalizationBundle;
use crate::template::TemplateRenderer;

/// A template file read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTemplate {
    pub path: PathBuf,
    pub content: String,
}

/// Templates keyed by absolute path. Paths that failed to load are remembered
/// so each one is reported only once.
#[derive(Debug, Default)]
pub struct TemplateStore {
    loaded: HashMap<PathBuf, Arc<LoadedTemplate>>,
    failed: HashSet<PathBuf>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` unless it is already cached or known to be unreadable.
    pub fn load(&mut self, fs: &dyn FileSystem, path: &Path) -> Option<Arc<LoadedTemplate>> {
        if let Some(t) = self.loaded.get(path) {
            return Some(Arc::clone(t));
        }
        if self.failed.contains(path) {
            return None;
        }
        match fs.read_text(path) {
            Ok(content) => {
                log::debug!("Loaded template {}", path.display());
                Some(self.insert(path, content))
            }
            Err(e) => {
                log::warn!("Template {} unavailable: {e}", path.display());
                self.failed.insert(path.to_path_buf());
                None
            }
        }
    }

    /// Insert or replace a template. Use [`CardPipeline::replace_template`]
    /// once cards have been resolved from it.
    pub fn insert(&mut self, path: &Path, content: String) -> Arc<LoadedTemplate> {
        self.failed.remove(path);
        let template = Arc::new(LoadedTemplate {
            path: path.to_path_buf(),
            content,
        });
        self.loaded.insert(path.to_path_buf(), Arc::clone(&template));
        template
    }

    pub fn get(&self, path: &Path) -> Option<&LoadedTemplate> {
        self.loaded.get(path).map(Arc::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn clear(&mut self) {
        self.loaded.clear();
        self.failed.clear();
    }
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCard {
    /// Contiguous position among resolved cards, starting at 0.
    pub index: usize,
    /// Position of the source row in the deck.
    pub row: usize,
    pub card: CardRecord,
    pub template_path: PathBuf,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    template_path: PathBuf,
    row: usize,
    fingerprint: u64,
    scope: RenderScope,
}

/// Renderer settings that change the HTML of an otherwise identical row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RenderScope {
    locale: Option<String>,
    /// Resolver kind and root the HTML was rewritten with.
    assets: Option<(&'static str, PathBuf)>,
}

/// Owns the template store and the resolved-card cache.
#[derive(Debug, Default)]
pub struct CardPipeline {
    templates: TemplateStore,
    default_template: Option<PathBuf>,
    resolved: HashMap<CacheKey, String>,
}

/// Resolve a template path from the project or a row against the root.
pub fn template_path(root: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

impl CardPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Replace a template's content, e.g. from an editor buffer. Cards
    /// rendered from the old content are dropped.
    pub fn replace_template(&mut self, path: &Path, content: String) {
        self.templates.insert(path, content);
        let before = self.resolved.len();
        self.resolved.retain(|key, _| key.template_path != path);
        log::debug!(
            "Template {} replaced; {} cached card(s) dropped",
            path.display(),
            before - self.resolved.len()
        );
    }

    pub fn default_template(&self) -> Option<&Path> {
        self.default_template.as_deref()
    }

    /// Number of memoised renders.
    pub fn cached_cards(&self) -> usize {
        self.resolved.len()
    }

    /// Load the project default template and every per-row template named by
    /// `cards`. Unreadable templates are logged, not fatal.
    pub fn load_templates(
        &mut self,
        fs: &dyn FileSystem,
        root: &Path,
        cards: &[CardRecord],
        config: &ProjectConfig,
    ) {
        self.default_template = config
            .default_template
            .as_ref()
            .map(|p| template_path(root, p));
        if let Some(path) = self.default_template.clone() {
            self.templates.load(fs, &path);
        }

        let mut requested: Vec<PathBuf> = Vec::new();
        for card in cards {
            if let Some(rel) = card.template(&config.columns) {
                let path = template_path(root, rel);
                if !requested.contains(&path) {
                    requested.push(path);
                }
            }
        }
        for path in requested {
            self.templates.load(fs, &path);
        }
        log::debug!("{} template(s) loaded", self.templates.len());
    }

    /// Drop every memoised render. Call on locale change.
    pub fn invalidate(&mut self) {
        if !self.resolved.is_empty() {
            log::debug!("Invalidating {} cached card(s)", self.resolved.len());
        }
        self.resolved.clear();
    }

    /// Drop templates and renders. Call on project reload.
    pub fn reload(&mut self) {
        self.invalidate();
        self.templates.clear();
        self.default_template = None;
    }

    /// Like [`CardPipeline::resolve_all`], but fails when no template at all
    /// could be loaded.
    pub fn try_resolve_all(
        &mut self,
        cards: &[CardRecord],
        columns: &ColumnNames,
        bundle: Option<&LocalizationBundle>,
        root: &Path,
        assets: Option<&dyn AssetResolver>,
    ) -> Result<Vec<ResolvedCard>, PipelineError> {
        if self.templates.is_empty() {
            return Err(PipelineError::NoTemplates);
        }
        Ok(self.resolve_all(cards, columns, bundle, root, assets))
    }

    /// Render every row. Rows without a usable template are logged and
    /// skipped; the rest are returned in deck order with contiguous indices.
    pub fn resolve_all(
        &mut self,
        cards: &[CardRecord],
        columns: &ColumnNames,
        bundle: Option<&LocalizationBundle>,
        root: &Path,
        assets: Option<&dyn AssetResolver>,
    ) -> Vec<ResolvedCard> {
        let mut renderer = TemplateRenderer::new(columns, bundle);
        if let Some(resolver) = assets {
            renderer = renderer.with_assets(resolver, root);
        }
        let scope = RenderScope {
            locale: bundle.map(|b| b.locale.clone()),
            assets: assets.map(|r| (r.kind(), root.to_path_buf())),
        };

        let mut out = Vec::with_capacity(cards.len());
        for (row, card) in cards.iter().enumerate() {
            match self.resolve_one(&renderer, card, row, columns, root, &scope) {
                Ok((template_path, html)) => out.push(ResolvedCard {
                    index: out.len(),
                    row,
                    card: card.clone(),
                    template_path,
                    html,
                }),
                Err(e) => log::error!("{e}"),
            }
        }
        log::debug!("Resolved {}/{} card(s)", out.len(), cards.len());
        out
    }

    fn resolve_one(
        &mut self,
        renderer: &TemplateRenderer<'_>,
        card: &CardRecord,
        row: usize,
        columns: &ColumnNames,
        root: &Path,
        scope: &RenderScope,
    ) -> Result<(PathBuf, String), CardError> {
        let requested = card.template(columns);
        let template = self.pick_template(requested, root, row).ok_or_else(|| {
            CardError::TemplateUnavailable {
                row,
                requested: requested.map(str::to_string),
            }
        })?;

        let key = CacheKey {
            template_path: template.path.clone(),
            row,
            fingerprint: card.fingerprint(),
            scope: scope.clone(),
        };
        if let Some(html) = self.resolved.get(&key) {
            return Ok((template.path.clone(), html.clone()));
        }

        let rendered = renderer.render_detailed(&template.content, card, row);
        if !rendered.missing_translations.is_empty() {
            log::debug!(
                "Row {row}: missing translations {:?}",
                rendered.missing_translations
            );
        }
        if !rendered.unknown_placeholders.is_empty() {
            log::warn!(
                "Row {row}: unknown placeholders {:?} in {}",
                rendered.unknown_placeholders,
                template.path.display()
            );
        }
        self.resolved.insert(key, rendered.html.clone());
        Ok((template.path.clone(), rendered.html))
    }

    /// Per-row template if loaded, else the default; logs the degradation.
    fn pick_template(
        &self,
        requested: Option<&str>,
        root: &Path,
        row: usize,
    ) -> Option<Arc<LoadedTemplate>> {
        if let Some(rel) = requested {
            let path = template_path(root, rel);
            if let Some(t) = self.templates.loaded.get(&path) {
                return Some(Arc::clone(t));
            }
            log::warn!(
                "Row {row}: template '{rel}' unavailable, falling back to the default template"
            );
        }
        let default = self.default_template.as_ref()?;
        self.templates.loaded.get(default).map(Arc::clone)
    }
}
