//! Generation run: contexts from the databases, then render and write every template

use crate::schema::{create_provider, SchemaProvider};
use futures::stream::{self, StreamExt, TryStreamExt};
use gencoder_core::materialize::{MaterializeAction, Materializer};
use gencoder_core::properties::{self, Properties};
use gencoder_core::{
    BlockMarkers, Config, DatabaseConfig, GencoderError, RenderContext, RenderEngine, Result,
    TableConfig, TemplateSet,
};
use std::path::{Path, PathBuf};

/// A file touched by a generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub action: MaterializeAction,
}

pub struct Orchestrator {
    config: Config,
    cli_properties: Properties,
    include_non_templates: bool,
}

impl Orchestrator {
    pub fn new(config: Config, cli_properties: Properties) -> Self {
        Self {
            config,
            cli_properties,
            include_non_templates: false,
        }
    }

    /// Also copy files that are not templates, never overwriting
    pub fn include_non_templates(mut self, include: bool) -> Self {
        self.include_non_templates = include;
        self
    }

    /// Full run against the templates under `template_root`
    ///
    /// Templates are compiled before any database is contacted so template
    /// mistakes surface without a connection.
    pub async fn generate(&self, template_root: &Path) -> Result<Vec<GeneratedFile>> {
        let templates = TemplateSet::load(
            template_root,
            self.config.output_marker(),
            self.include_non_templates,
        )
        .await?;
        if templates.is_empty() {
            log::warn!("No files found under {}", template_root.display());
        }
        let engine = self.prepare_engine(&templates)?;
        let contexts = self.collect_contexts().await?;
        self.write_outputs(&engine, &templates, &contexts).await
    }

    /// Render engine with helper scripts registered and all templates compiled
    pub fn prepare_engine(&self, templates: &TemplateSet) -> Result<RenderEngine> {
        let mut engine = RenderEngine::new();
        for helper in &self.config.helpers {
            if helper.starts_with("http://") || helper.starts_with("https://") {
                return Err(GencoderError::Config(format!(
                    "Helper URLs are not fetched, download '{}' and pass the local .rhai file",
                    helper
                )));
            }
            engine.register_script_helper_file(Path::new(helper))?;
        }
        engine.compile(templates)?;
        Ok(engine)
    }

    /// Render contexts for every configured table that exists
    pub async fn collect_contexts(&self) -> Result<Vec<RenderContext>> {
        let mut contexts = Vec::new();
        for database in &self.config.databases {
            log::info!("Introspecting {}", database.display_name());
            let provider = create_provider(&database.dsn).await?;
            contexts.extend(self.database_contexts(provider.as_ref(), database).await?);
        }
        Ok(contexts)
    }

    /// Introspect all tables of one database concurrently, at most `concurrency` at a time
    ///
    /// Result order follows completion, not configuration.
    pub async fn database_contexts(
        &self,
        provider: &dyn SchemaProvider,
        database: &DatabaseConfig,
    ) -> Result<Vec<RenderContext>> {
        let limit = self
            .config
            .concurrency
            .unwrap_or(database.tables.len())
            .max(1);

        let contexts: Vec<Option<RenderContext>> = stream::iter(&database.tables)
            .map(|table_config| self.table_context(provider, database, table_config))
            .buffer_unordered(limit)
            .try_collect()
            .await?;

        Ok(contexts.into_iter().flatten().collect())
    }

    async fn table_context(
        &self,
        provider: &dyn SchemaProvider,
        database: &DatabaseConfig,
        table_config: &TableConfig,
    ) -> Result<Option<RenderContext>> {
        let schema = table_config
            .effective_schema(database)
            .unwrap_or_else(|| provider.default_schema());

        let table = provider
            .introspect(schema, &table_config.name, &table_config.ignore_columns)
            .await?;
        let Some(table) = table else {
            log::warn!(
                "Table '{}.{}' not found in {}, skipping",
                schema,
                table_config.name,
                database.display_name()
            );
            return Ok(None);
        };

        let properties = properties::resolve([
            &self.config.properties,
            &database.properties,
            &table_config.properties,
            &self.cli_properties,
        ]);
        Ok(Some(RenderContext::for_table(
            table,
            properties,
            database,
            table_config,
        )))
    }

    /// Context used when no table was found or configured
    pub fn boilerplate_context(&self) -> RenderContext {
        RenderContext::without_table(properties::resolve([
            &self.config.properties,
            &self.cli_properties,
        ]))
    }

    /// Copy normal files, then render every template for every context
    pub async fn write_outputs(
        &self,
        engine: &RenderEngine,
        templates: &TemplateSet,
        contexts: &[RenderContext],
    ) -> Result<Vec<GeneratedFile>> {
        let materializer = Materializer::new(
            self.config.output(),
            BlockMarkers::from(&self.config.block_marker),
        );
        let mut generated = Vec::new();

        if self.include_non_templates {
            for file in templates.normal_files() {
                let action = materializer.copy_normal(file).await?;
                generated.push(GeneratedFile {
                    path: materializer.output_dir().join(&file.relative_path),
                    action,
                });
            }
        }

        let boilerplate;
        let contexts = if contexts.is_empty() {
            log::debug!("No table contexts, rendering boilerplate");
            boilerplate = [self.boilerplate_context()];
            &boilerplate[..]
        } else {
            contexts
        };

        for context in contexts {
            for template in templates.templates() {
                let rendered = engine.render(template, context)?;
                let action = materializer
                    .write(&rendered.relative_path, &rendered.content)
                    .await?;
                let path = materializer.output_dir().join(&rendered.relative_path);
                log::info!("{:?} {}", action, path.display());
                generated.push(GeneratedFile { path, action });
            }
        }

        Ok(generated)
    }
}
