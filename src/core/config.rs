//! Build configuration: mode, project layout and the derived per-pipeline settings

use crate::assets::icon_font;
use crate::core::PipelineKind;
use crate::tools::{CommandSpec, ToolCommands};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "assetflow.yaml";

/// Browser support list handed to the autoprefixer
pub const DEFAULT_BROWSERS: &[&str] = &[
    "last 2 version",
    "safari 5",
    "ie 8",
    "ie 9",
    "opera 12.1",
    "ios 6",
    "android 4",
];

/// First private-use codepoint assigned to icon glyphs
pub const DEFAULT_START_CODEPOINT: u32 = 0xE001;

/// Build mode, fixed for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Default: minified output, no source maps, intermediate files removed
    Production,
    /// `--dev`: source maps, readable output, intermediate files kept
    Dev,
}

impl Mode {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Mode::Dev
        } else {
            Mode::Production
        }
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Production => "production",
            Mode::Dev => "dev",
        }
    }
}

/// Mode-dependent stage toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildFlags {
    /// Embed source maps when compiling and bundling
    pub source_maps: bool,
    /// Minify the production artifact
    pub minify: bool,
    /// Merge duplicate media query blocks (breaks source maps, production only)
    pub combine_media_queries: bool,
    /// Delete intermediate artifacts after the production artifact is written
    pub clear_intermediate: bool,
}

impl BuildFlags {
    /// Derive every toggle from the mode. Nothing else may set these.
    pub fn for_mode(mode: Mode) -> Self {
        let production = mode.is_production();
        Self {
            source_maps: !production,
            minify: production,
            combine_media_queries: production,
            clear_intermediate: production,
        }
    }
}

/// SASS output style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    Expanded,
    Compressed,
}

impl OutputStyle {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Production => OutputStyle::Compressed,
            Mode::Dev => OutputStyle::Expanded,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputStyle::Expanded => "expanded",
            OutputStyle::Compressed => "compressed",
        }
    }
}

// ============================================================================
// Project config file (YAML)
// ============================================================================

/// Project layout and tool settings loaded from YAML.
///
/// Every field has a default, so an empty file (or no file at all) yields the
/// stock layout. The build mode is never read from here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub paths: BasePaths,
    pub styles: StyleLayout,
    pub scripts: ScriptLayout,
    pub icon_font: IconFontLayout,
    pub images: ImageLayout,
    pub tests: TestLayout,
    pub server: ServerSettings,
    pub watch: WatchSettings,
    pub tools: ToolCommands,
    pub notifications: NotificationSettings,
    pub browsers: Option<Vec<String>>,
}

/// Top-level directories, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasePaths {
    /// Third-party libraries (normalize, jquery, ...)
    pub vendor: PathBuf,
    /// Asset sources
    pub assets: PathBuf,
    /// Intermediate output, removed in production
    pub compiled: PathBuf,
    /// Production output and dev server root
    pub production: PathBuf,
}

impl Default for BasePaths {
    fn default() -> Self {
        Self {
            vendor: PathBuf::from("bower_components"),
            assets: PathBuf::from("assets"),
            compiled: PathBuf::from("temp"),
            production: PathBuf::from("public"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleLayout {
    /// Entry stylesheet, relative to the asset root
    pub entry: PathBuf,
    /// Directory watched for changes, relative to the asset root
    pub source_dir: PathBuf,
    /// Compiled file name inside the intermediate directory
    pub compiled_file: String,
    /// Vendor files prepended to the compiled output, relative to the vendor dir
    pub vendor_files: Vec<PathBuf>,
    /// Output directory, relative to the production root
    pub output_dir: PathBuf,
    pub output_file: String,
}

impl Default for StyleLayout {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("sass/main.scss"),
            source_dir: PathBuf::from("sass"),
            compiled_file: "main.css".to_string(),
            vendor_files: vec![PathBuf::from("normalize.css/normalize.css")],
            output_dir: PathBuf::from("css"),
            output_file: "styles.css".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLayout {
    pub entry: PathBuf,
    pub source_dir: PathBuf,
    pub compiled_file: String,
    pub vendor_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub output_file: String,
}

impl Default for ScriptLayout {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("js/main.js"),
            source_dir: PathBuf::from("js"),
            compiled_file: "main.js".to_string(),
            vendor_files: vec![
                PathBuf::from("modernizr/modernizr.js"),
                PathBuf::from("jquery/dist/jquery.js"),
            ],
            output_dir: PathBuf::from("js"),
            output_file: "scripts.js".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IconFontLayout {
    pub name: String,
    /// SVG icon directory, relative to the asset root
    pub source_dir: PathBuf,
    /// Font output directory, relative to the production root
    pub output_dir: String,
    /// Stylesheet template, relative to the asset root
    pub template: PathBuf,
    /// Generated partial, relative to the asset root
    pub stylesheet: PathBuf,
    pub start_codepoint: u32,
}

impl Default for IconFontLayout {
    fn default() -> Self {
        Self {
            name: "icon-font".to_string(),
            source_dir: PathBuf::from("icon-font"),
            output_dir: "fonts/".to_string(),
            template: PathBuf::from("icon-font-template.scss"),
            stylesheet: PathBuf::from("sass/_icon-font.scss"),
            start_codepoint: DEFAULT_START_CODEPOINT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageLayout {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extensions: Vec<String>,
}

impl Default for ImageLayout {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("images"),
            extensions: ["png", "jpg", "jpeg", "gif", "svg"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Spec suite layout, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestLayout {
    pub suite_dir: PathBuf,
    pub source_dir: PathBuf,
}

impl Default for TestLayout {
    fn default() -> Self {
        Self {
            suite_dir: PathBuf::from("spec"),
            source_dir: PathBuf::from("src"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Desktop notification command, e.g. `notify-send "{{ title }}" "{{ message }}"`
    pub desktop_command: Option<CommandSpec>,
}

impl ProjectConfig {
    /// Load a project config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse a project config from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ProjectConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Locate the project config and the project root.
    ///
    /// An explicit path must exist. Without one, `assetflow.yaml` in the
    /// working directory is used when present, the stock layout otherwise.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        match explicit {
            Some(path) => {
                let config = Self::from_file(path)?;
                let root = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                Ok((config, root))
            }
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Ok((Self::from_file(default)?, PathBuf::from(".")))
                } else {
                    Ok((Self::default(), PathBuf::from(".")))
                }
            }
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.icon_font.name.trim().is_empty() {
            anyhow::bail!("icon_font.name must not be empty");
        }
        if !icon_font::PRIVATE_USE_AREA.contains(&self.icon_font.start_codepoint) {
            anyhow::bail!(
                "icon_font.start_codepoint {:#X} is outside the private use area",
                self.icon_font.start_codepoint
            );
        }
        if self.styles.output_file.is_empty() || self.scripts.output_file.is_empty() {
            anyhow::bail!("Output file names must not be empty");
        }
        if self.images.extensions.is_empty() {
            anyhow::bail!("images.extensions must list at least one extension");
        }
        Ok(())
    }
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Everything a run needs, derived once from the mode and the project config
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfig {
    pub mode: Mode,
    pub root: PathBuf,
    pub styles: StyleConfig,
    pub scripts: ScriptConfig,
    pub icon_font: IconFontConfig,
    pub images: ImageConfig,
    pub tests: TestConfig,
    pub server: ServerConfig,
    pub watch: WatchConfig,
    pub tools: ToolCommands,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleConfig {
    pub flags: BuildFlags,
    pub output_style: OutputStyle,
    pub browsers: Vec<String>,
    pub entry: PathBuf,
    pub source_dir: PathBuf,
    pub watch_patterns: Vec<String>,
    /// Compiled stylesheet in the intermediate directory
    pub compiled: PathBuf,
    /// Concatenation order: vendor files, then the compiled stylesheet
    pub concat_files: Vec<PathBuf>,
    pub output: PathBuf,
    pub cleanup_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptConfig {
    pub flags: BuildFlags,
    pub entry: PathBuf,
    pub source_dir: PathBuf,
    pub watch_patterns: Vec<String>,
    pub compiled: PathBuf,
    pub concat_files: Vec<PathBuf>,
    pub output: PathBuf,
    pub cleanup_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IconFontConfig {
    pub flags: BuildFlags,
    pub font_name: String,
    pub source_dir: PathBuf,
    pub watch_patterns: Vec<String>,
    pub output_dir: PathBuf,
    /// Font reference used inside the generated stylesheet, e.g. `../fonts/`
    pub font_path: String,
    pub template: PathBuf,
    pub stylesheet: PathBuf,
    pub codepoints_file: PathBuf,
    pub start_codepoint: u32,
    pub cleanup_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestConfig {
    pub suite_dir: PathBuf,
    pub source_dir: PathBuf,
    pub watch_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served to the browser
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl BuildConfig {
    /// Resolve the full configuration for one mode. Pure: no filesystem access.
    pub fn resolve(mode: Mode, project: &ProjectConfig, root: &Path) -> Self {
        let flags = BuildFlags::for_mode(mode);
        let base = &project.paths;
        let vendor = root.join(&base.vendor);
        let assets = root.join(&base.assets);
        let compiled_dir = root.join(&base.compiled);
        let production = root.join(&base.production);

        let style_compiled = compiled_dir.join(&project.styles.compiled_file);
        let mut style_concat: Vec<PathBuf> = project
            .styles
            .vendor_files
            .iter()
            .map(|f| vendor.join(f))
            .collect();
        style_concat.push(style_compiled.clone());

        let styles = StyleConfig {
            flags,
            output_style: OutputStyle::for_mode(mode),
            browsers: project
                .browsers
                .clone()
                .unwrap_or_else(|| DEFAULT_BROWSERS.iter().map(|b| b.to_string()).collect()),
            entry: assets.join(&project.styles.entry),
            source_dir: assets.join(&project.styles.source_dir),
            watch_patterns: vec!["*.scss".to_string(), "*.sass".to_string()],
            cleanup_patterns: intermediate_patterns(&style_compiled),
            compiled: style_compiled,
            concat_files: style_concat,
            output: production
                .join(&project.styles.output_dir)
                .join(&project.styles.output_file),
        };

        let script_compiled = compiled_dir.join(&project.scripts.compiled_file);
        let mut script_concat: Vec<PathBuf> = project
            .scripts
            .vendor_files
            .iter()
            .map(|f| vendor.join(f))
            .collect();
        script_concat.push(script_compiled.clone());

        let scripts = ScriptConfig {
            flags,
            entry: assets.join(&project.scripts.entry),
            source_dir: assets.join(&project.scripts.source_dir),
            watch_patterns: vec!["*.js".to_string()],
            cleanup_patterns: intermediate_patterns(&script_compiled),
            compiled: script_compiled,
            concat_files: script_concat,
            output: production
                .join(&project.scripts.output_dir)
                .join(&project.scripts.output_file),
        };

        let icon_layout = &project.icon_font;
        let codepoints_file = compiled_dir.join(format!("{}-codepoints.json", icon_layout.name));
        let icon_font = IconFontConfig {
            flags,
            font_name: icon_layout.name.clone(),
            source_dir: assets.join(&icon_layout.source_dir),
            watch_patterns: vec!["*.svg".to_string()],
            output_dir: production.join(&icon_layout.output_dir),
            font_path: format!(
                "{}{}",
                back_to_root(&icon_layout.output_dir),
                icon_layout.output_dir
            ),
            template: assets.join(&icon_layout.template),
            stylesheet: assets.join(&icon_layout.stylesheet),
            cleanup_patterns: vec![codepoints_file.to_string_lossy().into_owned()],
            codepoints_file,
            start_codepoint: icon_layout.start_codepoint,
        };

        let images = ImageConfig {
            source_dir: assets.join(&project.images.source_dir),
            output_dir: production.join(&project.images.output_dir),
            extensions: project
                .images
                .extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        };

        let tests = TestConfig {
            suite_dir: root.join(&project.tests.suite_dir),
            source_dir: root.join(&project.tests.source_dir),
            watch_patterns: vec!["*.php".to_string()],
        };

        let server = ServerConfig {
            host: project.server.host.clone(),
            port: project.server.port,
            root: production,
        };

        BuildConfig {
            mode,
            root: root.to_path_buf(),
            styles,
            scripts,
            icon_font,
            images,
            tests,
            server,
            watch: WatchConfig {
                debounce_ms: project.watch.debounce_ms,
            },
            tools: project.tools.clone(),
            notifications: project.notifications.clone(),
        }
    }

    /// Check that the inputs of the given pipelines exist before anything runs
    pub fn validate_inputs(&self, pipelines: &[PipelineKind]) -> Result<()> {
        let mut missing = Vec::new();

        for pipeline in pipelines {
            let required: Vec<&Path> = match pipeline {
                PipelineKind::Styles => vec![&self.styles.entry],
                PipelineKind::Scripts => vec![&self.scripts.entry],
                PipelineKind::IconFont => vec![&self.icon_font.source_dir],
                PipelineKind::Images => vec![&self.images.source_dir],
                PipelineKind::Tests => vec![&self.tests.suite_dir],
            };
            for path in required {
                if !path.exists() {
                    missing.push(format!("{} ({})", path.display(), pipeline.label()));
                }
            }
        }

        if !missing.is_empty() {
            anyhow::bail!("Missing build inputs:\n  {}", missing.join("\n  "));
        }
        Ok(())
    }
}

/// Relative path from a directory back to the root it is nested in: one `../`
/// per `/` separator. `fonts/` gives `../`, `a/b/` gives `../../`.
pub fn back_to_root(path: &str) -> String {
    "../".repeat(path.matches('/').count())
}

/// Compiled artifact plus any source map written next to it
fn intermediate_patterns(compiled: &Path) -> Vec<String> {
    let compiled = compiled.to_string_lossy();
    vec![compiled.to_string(), format!("{}.map", compiled)]
}
