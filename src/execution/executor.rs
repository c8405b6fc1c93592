//! Stage executor - runs individual stages through the tool runner

use crate::{
    assets::{
        self,
        icon_font::{self, Glyph},
        images::plan_images,
    },
    core::{BuildConfig, PipelineError, PipelineKind, StageKind},
    tools::{ToolError, ToolInvocation, ToolRunner},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Content carried from one stage to the next within a single run
#[derive(Debug, Default)]
pub struct StageBuffer {
    /// In-flight CSS or JS between concatenation and persistence
    pub contents: Option<String>,
    /// Glyphs assigned by the font generation stage
    pub glyphs: Vec<Glyph>,
}

impl StageBuffer {
    fn take_contents(&mut self, stage: &'static str) -> Result<String, PipelineError> {
        self.contents.take().ok_or(PipelineError::NoContent(stage))
    }
}

/// Executes a single stage
pub struct StageExecutor<T> {
    tools: T,
    config: Arc<BuildConfig>,
}

impl<T: ToolRunner> StageExecutor<T> {
    pub fn new(tools: T, config: Arc<BuildConfig>) -> Self {
        Self { tools, config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Execute one stage of `pipeline`. Returns an optional detail line for display.
    pub async fn execute(
        &self,
        pipeline: PipelineKind,
        stage: StageKind,
        buffer: &mut StageBuffer,
    ) -> Result<Option<String>, PipelineError> {
        debug!("Executing {} stage of {}", stage, pipeline);

        match (pipeline, stage) {
            (PipelineKind::Styles, StageKind::Compile) => self.compile_styles().await,
            (PipelineKind::Scripts, StageKind::Bundle) => self.bundle_scripts().await,
            (PipelineKind::Styles, StageKind::Concatenate) => {
                self.concatenate(&self.config.styles.concat_files, buffer).await
            }
            (PipelineKind::Scripts, StageKind::Concatenate) => {
                self.concatenate(&self.config.scripts.concat_files, buffer).await
            }
            (PipelineKind::Styles, StageKind::CombineMediaQueries) => {
                let css = buffer.take_contents("combine-media-queries")?;
                let combined = self
                    .transform(ToolInvocation::CombineMediaQueries { css })
                    .await?;
                buffer.contents = Some(combined);
                Ok(None)
            }
            (PipelineKind::Styles, StageKind::Autoprefix) => {
                let css = buffer.take_contents("autoprefix")?;
                let prefixed = self
                    .transform(ToolInvocation::Autoprefix {
                        css,
                        browsers: self.config.styles.browsers.clone(),
                    })
                    .await?;
                buffer.contents = Some(prefixed);
                Ok(None)
            }
            (PipelineKind::Styles, StageKind::Minify) => {
                let css = buffer.take_contents("minify")?;
                let before = css.len();
                let minified = self.transform(ToolInvocation::MinifyCss { css }).await?;
                let detail = format!("{} -> {} bytes", before, minified.len());
                buffer.contents = Some(minified);
                Ok(Some(detail))
            }
            (PipelineKind::Scripts, StageKind::Minify) => {
                let js = buffer.take_contents("minify")?;
                let before = js.len();
                let minified = self.transform(ToolInvocation::MinifyJs { js }).await?;
                let detail = format!("{} -> {} bytes", before, minified.len());
                buffer.contents = Some(minified);
                Ok(Some(detail))
            }
            (PipelineKind::Styles, StageKind::Persist) => {
                self.persist(&self.config.styles.output, buffer).await
            }
            (PipelineKind::Scripts, StageKind::Persist) => {
                self.persist(&self.config.scripts.output, buffer).await
            }
            (PipelineKind::Styles, StageKind::Cleanup) => {
                cleanup(&self.config.styles.cleanup_patterns)
            }
            (PipelineKind::Scripts, StageKind::Cleanup) => {
                cleanup(&self.config.scripts.cleanup_patterns)
            }
            (PipelineKind::IconFont, StageKind::Cleanup) => {
                cleanup(&self.config.icon_font.cleanup_patterns)
            }
            (PipelineKind::IconFont, StageKind::GenerateIconFont) => {
                self.generate_icon_font(buffer).await
            }
            (PipelineKind::IconFont, StageKind::WriteIconStylesheet) => {
                self.write_icon_stylesheet(buffer).await
            }
            (PipelineKind::Images, StageKind::OptimizeImages) => self.optimize_images().await,
            (PipelineKind::Tests, StageKind::RunSpecs) => self.run_specs().await,
            (pipeline, stage) => Err(PipelineError::UnsupportedStage { pipeline, stage }),
        }
    }

    async fn compile_styles(&self) -> Result<Option<String>, PipelineError> {
        let styles = &self.config.styles;
        assets::ensure_parent(&styles.compiled).await?;

        self.tools
            .run(&ToolInvocation::CompileStyles {
                entry: styles.entry.clone(),
                output: styles.compiled.clone(),
                style: styles.output_style.as_str().to_string(),
                source_maps: styles.flags.source_maps,
            })
            .await
            .map_err(|e| PipelineError::StyleCompile(tool_message(e)))?;

        Ok(Some(display_relative(&styles.compiled, &self.config.root)))
    }

    async fn bundle_scripts(&self) -> Result<Option<String>, PipelineError> {
        let scripts = &self.config.scripts;
        assets::ensure_parent(&scripts.compiled).await?;

        self.tools
            .run(&ToolInvocation::BundleScripts {
                entry: scripts.entry.clone(),
                output: scripts.compiled.clone(),
                source_maps: scripts.flags.source_maps,
            })
            .await
            .map_err(|e| PipelineError::ScriptBundle(tool_message(e)))?;

        Ok(Some(display_relative(&scripts.compiled, &self.config.root)))
    }

    async fn concatenate(
        &self,
        files: &[std::path::PathBuf],
        buffer: &mut StageBuffer,
    ) -> Result<Option<String>, PipelineError> {
        buffer.contents = Some(assets::concat_files(files).await?);
        Ok(Some(format!("{} files", files.len())))
    }

    /// Pipe text through a content-transforming tool
    async fn transform(&self, invocation: ToolInvocation) -> Result<String, PipelineError> {
        let tool = invocation.kind();
        let output = self.tools.run(&invocation).await?;
        Ok(output.into_text(tool)?)
    }

    async fn persist(
        &self,
        output: &Path,
        buffer: &mut StageBuffer,
    ) -> Result<Option<String>, PipelineError> {
        let contents = buffer.take_contents("persist")?;
        assets::write_output(output, contents.as_bytes()).await?;
        info!("Wrote {}", output.display());
        Ok(Some(display_relative(output, &self.config.root)))
    }

    async fn generate_icon_font(
        &self,
        buffer: &mut StageBuffer,
    ) -> Result<Option<String>, PipelineError> {
        let icon_font = &self.config.icon_font;
        let icons = icon_font::scan_icons(&icon_font.source_dir)?;
        if icons.is_empty() {
            return Err(PipelineError::IconFont(format!(
                "no SVG icons in {}",
                icon_font.source_dir.display()
            )));
        }

        let glyphs = icon_font::assign_codepoints(&icons, icon_font.start_codepoint)?;
        let codepoints = icon_font::codepoint_map_json(&glyphs)?;
        assets::write_output(&icon_font.codepoints_file, codepoints.as_bytes()).await?;
        tokio::fs::create_dir_all(&icon_font.output_dir)
            .await
            .map_err(|e| PipelineError::io(&icon_font.output_dir, e))?;

        self.tools
            .run(&ToolInvocation::GenerateIconFont {
                source_dir: icon_font.source_dir.clone(),
                output_dir: icon_font.output_dir.clone(),
                font_name: icon_font.font_name.clone(),
                codepoints: icon_font.codepoints_file.clone(),
            })
            .await
            .map_err(|e| PipelineError::IconFont(tool_message(e)))?;

        let detail = format!("{} glyphs", glyphs.len());
        buffer.glyphs = glyphs;
        Ok(Some(detail))
    }

    async fn write_icon_stylesheet(
        &self,
        buffer: &mut StageBuffer,
    ) -> Result<Option<String>, PipelineError> {
        let icon_font = &self.config.icon_font;
        let template = match tokio::fs::read_to_string(&icon_font.template).await {
            Ok(template) => template,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No icon template at {}, using built-in", icon_font.template.display());
                icon_font::DEFAULT_TEMPLATE.to_string()
            }
            Err(e) => return Err(PipelineError::io(&icon_font.template, e)),
        };

        let stylesheet = icon_font::render_stylesheet(
            &template,
            &icon_font.font_name,
            &icon_font.font_path,
            &buffer.glyphs,
        )?;
        assets::write_output(&icon_font.stylesheet, stylesheet.as_bytes()).await?;
        Ok(Some(display_relative(&icon_font.stylesheet, &self.config.root)))
    }

    async fn optimize_images(&self) -> Result<Option<String>, PipelineError> {
        let plan = plan_images(&self.config.images);
        let optimized = plan.jobs.len();

        for job in plan.jobs {
            let output = self
                .tools
                .run(&ToolInvocation::OptimizeImage {
                    source: job.source.clone(),
                })
                .await
                .map_err(|e| PipelineError::ImageOptimize {
                    path: job.source.clone(),
                    message: tool_message(e),
                })?;
            assets::write_output(&job.dest, &output.stdout).await?;
            debug!("Optimized {}", job.source.display());
        }

        Ok(Some(format!(
            "{} optimized, {} up to date",
            optimized, plan.up_to_date
        )))
    }

    async fn run_specs(&self) -> Result<Option<String>, PipelineError> {
        let output = self
            .tools
            .run(&ToolInvocation::RunSpecs {
                suite_dir: self.config.tests.suite_dir.clone(),
            })
            .await
            .map_err(|e| PipelineError::TestFailure(tool_message(e)))?;

        let summary = String::from_utf8_lossy(&output.stdout)
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string());
        Ok(summary)
    }
}

fn cleanup(patterns: &[String]) -> Result<Option<String>, PipelineError> {
    let removed = assets::remove_matching(patterns)?;
    Ok(Some(format!("{} removed", removed)))
}

/// Failed tools are reported by their stderr when they wrote any
fn tool_message(err: ToolError) -> String {
    match err {
        ToolError::Failed { stderr, .. } if !stderr.is_empty() => stderr,
        other => other.to_string(),
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
