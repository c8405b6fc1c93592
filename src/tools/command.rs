//! Command templates for external tools

use crate::tools::ToolKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A program plus argument templates.
///
/// Arguments and environment values may contain `{{ name }}` placeholders,
/// replaced with the invocation's variables before spawning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A command with every placeholder substituted
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Substitute variables. Arguments that render to nothing are dropped,
    /// so an unset flag placeholder does not become an empty argv entry.
    pub fn render(&self, variables: &HashMap<String, String>) -> RenderedCommand {
        RenderedCommand {
            program: render_template(&self.program, variables),
            args: self
                .args
                .iter()
                .map(|arg| render_template(arg, variables))
                .filter(|arg| !arg.is_empty())
                .collect(),
            env: self
                .env
                .iter()
                .map(|(key, value)| (key.clone(), render_template(value, variables)))
                .collect(),
        }
    }
}

/// Replace `{{ key }}` placeholders
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{{ {} }}}}", key);
        rendered = rendered.replace(&placeholder, value);
    }
    rendered
}

/// Command used for each external tool, overridable from the project config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCommands {
    pub style_compiler: CommandSpec,
    pub script_bundler: CommandSpec,
    pub media_query_combiner: CommandSpec,
    pub autoprefixer: CommandSpec,
    pub css_minifier: CommandSpec,
    pub js_minifier: CommandSpec,
    pub icon_font_generator: CommandSpec,
    pub image_optimizer: CommandSpec,
    pub spec_runner: CommandSpec,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            style_compiler: CommandSpec::new(
                "sass",
                &[
                    "--style={{ style }}",
                    "{{ source_map_flag }}",
                    "{{ input }}",
                    "{{ output }}",
                ],
            ),
            script_bundler: CommandSpec::new(
                "browserify",
                &["{{ input }}", "--outfile", "{{ output }}", "{{ debug_flag }}"],
            ),
            media_query_combiner: CommandSpec::new(
                "postcss",
                &["--use", "postcss-combine-media-query", "--no-map"],
            ),
            autoprefixer: CommandSpec::new("postcss", &["--use", "autoprefixer", "--no-map"])
                .with_env("BROWSERSLIST", "{{ browsers }}"),
            css_minifier: CommandSpec::new("cleancss", &["-O1", "specialComments:0"]),
            js_minifier: CommandSpec::new("uglifyjs", &["--compress", "--mangle"]),
            icon_font_generator: CommandSpec::new(
                "fantasticon",
                &[
                    "{{ input }}",
                    "--output",
                    "{{ output }}",
                    "--name",
                    "{{ font_name }}",
                    "--codepoints",
                    "{{ codepoints }}",
                    "--font-types",
                    "eot",
                    "woff2",
                    "woff",
                    "ttf",
                    "svg",
                    "--asset-types",
                    "json",
                ],
            ),
            image_optimizer: CommandSpec::new(
                "imagemin",
                &[
                    "--plugin=gifsicle",
                    "--plugin=jpegtran",
                    "--plugin=optipng",
                    "--plugin=svgo",
                    "--plugin.jpegtran.progressive=true",
                    "--plugin.svgo.plugins.removeViewBox=false",
                    "{{ input }}",
                ],
            ),
            spec_runner: CommandSpec::new(
                "vendor/bin/phpspec",
                &["run", "--no-interaction", "{{ suite_dir }}"],
            ),
        }
    }
}

impl ToolCommands {
    pub fn get(&self, tool: ToolKind) -> &CommandSpec {
        match tool {
            ToolKind::StyleCompiler => &self.style_compiler,
            ToolKind::ScriptBundler => &self.script_bundler,
            ToolKind::MediaQueryCombiner => &self.media_query_combiner,
            ToolKind::Autoprefixer => &self.autoprefixer,
            ToolKind::CssMinifier => &self.css_minifier,
            ToolKind::JsMinifier => &self.js_minifier,
            ToolKind::IconFontGenerator => &self.icon_font_generator,
            ToolKind::ImageOptimizer => &self.image_optimizer,
            ToolKind::SpecRunner => &self.spec_runner,
        }
    }
}
