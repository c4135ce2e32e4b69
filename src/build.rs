//! Build orchestration.
//!
//! # Architecture
//!
//! ```text
//! build()
//!     │
//!     ├── plan()                 schema ──► declarations ──► stage order
//!     │
//!     ├── Phase 1 (rayon)        discover ──► read + extract frontmatter
//!     │                          ─────────── barrier (collect) ───────────
//!     ├── Phase 2                DirectiveProcessor::run ──► Dataset
//!     │                          Dataset::assemble ──► IrBuilder ──► IrNode
//!     │
//!     ├── Phase 3                TemplateContext + Renderer ──► Value
//!     │
//!     └── write_output()         OutputFormat::serialize ──► file | stdout
//! ```

use crate::{
    config::WeaveConfig,
    directive::{Dataset, DirectiveKind, DirectiveProcessor},
    documents,
    format::OutputFormat,
    ir::{IrBuilder, TemplatePath},
    log,
    schema::Schema,
    template::{Renderer, Template, TemplateCache, TemplateContext},
};
use anyhow::{Context, Result};
use serde_json::Value;
use std::{
    fmt, fs,
    io::{Write, stdout},
    path::Path,
    sync::Arc,
};

/// Resolved stage order for a schema.
#[derive(Debug)]
pub struct Plan {
    pub schema: Schema,
    pub processor: DirectiveProcessor,
}

impl Plan {
    pub fn order(&self) -> &[DirectiveKind] {
        self.processor.order()
    }

    pub fn root(&self) -> Option<&TemplatePath> {
        self.processor.hierarchy_root().map(|decl| &decl.target)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.order().is_empty() {
            writeln!(f, "no directives declared")?;
        }
        for (step, kind) in self.order().iter().enumerate() {
            let targets: Vec<String> = self
                .processor
                .declarations()
                .iter()
                .filter(|decl| decl.kind() == *kind)
                .map(|decl| format!("`{}`", decl.target))
                .collect();
            writeln!(f, "{}. {kind} at {}", step + 1, targets.join(", "))?;
        }
        match self.root() {
            Some(root) => write!(f, "hierarchy root: `{root}`"),
            None => write!(f, "hierarchy root: none"),
        }
    }
}

/// Summary of a finished build.
#[derive(Debug)]
pub struct BuildReport {
    pub documents: usize,
    pub skipped: usize,
    pub elements: usize,
    pub format: OutputFormat,
}

/// Load the schema and fix the directive order.
pub fn plan(config: &WeaveConfig) -> Result<Plan> {
    let schema = Schema::load(&config.schema.path)
        .with_context(|| format!("failed to load schema `{}`", config.schema.path.display()))?;
    log!("schema"; "{} directives from {}", schema.declarations().len(), config.schema.path.display());

    let processor = DirectiveProcessor::new(schema.declarations().to_vec())?;
    if let Some(root) = processor.hierarchy_root() {
        for inert in processor.inert_roots() {
            log!("warn"; "frontmatter-part at `{}` ignored, `{}` is the hierarchy root", inert.target, root.target);
        }
    }
    Ok(Plan { schema, processor })
}

/// Run the whole pipeline and write the output.
pub fn build(config: &WeaveConfig) -> Result<BuildReport> {
    let plan = plan(config)?;

    // ========================================================================
    // Phase 1: read documents in parallel
    // ========================================================================
    let files = documents::discover(&config.input);
    log!("input"; "reading {} documents from {}", files.len(), config.input.dir.display());
    let loaded = documents::load(&files, config.input.on_error)?;
    if !loaded.without_frontmatter.is_empty() {
        log!("input"; "{} documents without frontmatter", loaded.without_frontmatter.len());
    }
    let document_count = loaded.documents.len();

    // ========================================================================
    // Phase 2: directives, then the IR
    // ========================================================================
    let dataset = plan.processor.run(&Dataset::from_documents(loaded.documents))?;
    log!(
        "directive"; "{} stages, {} elements{}",
        plan.order().len(),
        dataset.len(),
        dataset.root().map(|r| format!(" under `{r}`")).unwrap_or_default()
    );
    let assembled = dataset.assemble().context("failed to assemble the processed dataset")?;
    let ir = IrBuilder::new(config.render.max_depth).build(&assembled)?;

    // ========================================================================
    // Phase 3: render
    // ========================================================================
    let cache = TemplateCache::new();
    let schema_dir = config.schema.path.parent().unwrap_or(Path::new("."));
    let container = load_template(&cache, config.template.path.as_deref(), plan.schema.template(), schema_dir)?;
    let items = load_template(&cache, config.template.items.as_deref(), plan.schema.item_template(), schema_dir)?;

    let rendered = if container.is_none() && items.is_none() {
        log!("render"; "no template, writing the processed dataset");
        assembled
    } else {
        let container = container.unwrap_or_else(|| Arc::new(Template::from_text("{@items}")));
        if items.is_some() && !container.uses_items() {
            log!("warn"; "item template unused, the container has no {{@items}}");
        }
        let ctx = TemplateContext::new(&ir, dataset.root().cloned(), config.render.fallback.into());
        let mut renderer = Renderer::new();
        if let Some(items) = items.as_deref() {
            renderer = renderer.with_items(items);
        }
        renderer.render(&container, &ctx)?
    };

    let format = config.output.resolve_format(plan.schema.format());
    write_output(&rendered, format, config.output.path.as_deref())?;

    Ok(BuildReport {
        documents: document_count,
        skipped: loaded.skipped.len(),
        elements: dataset.len(),
        format,
    })
}

/// Config path first, then the schema's path (relative to the schema file).
fn load_template(
    cache: &TemplateCache,
    configured: Option<&Path>,
    from_schema: Option<&Path>,
    schema_dir: &Path,
) -> Result<Option<Arc<Template>>> {
    let path = match (configured, from_schema) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(path)) => schema_dir.join(path),
        (None, None) => return Ok(None),
    };
    let template = cache
        .get_or_load(&path)
        .with_context(|| format!("failed to load template `{}`", path.display()))?;
    log!("render"; "template {}", path.display());
    Ok(Some(template))
}

fn write_output(value: &Value, format: OutputFormat, path: Option<&Path>) -> Result<()> {
    let text = format.serialize(value)?;
    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create `{}`", parent.display()))?;
            }
            fs::write(path, text).with_context(|| format!("failed to write `{}`", path.display()))?;
            log!("output"; "wrote {} ({format})", path.display());
        }
        None => {
            let mut out = stdout().lock();
            out.write_all(text.as_bytes()).context("failed to write to stdout")?;
            out.flush().ok();
        }
    }
    Ok(())
}
