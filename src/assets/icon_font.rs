//! Icon glyph scanning, codepoint assignment and stylesheet rendering

use crate::core::PipelineError;
use crate::tools::command::render_template;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Basic Multilingual Plane private use area
pub const PRIVATE_USE_AREA: RangeInclusive<u32> = 0xE000..=0xF8FF;

/// Stylesheet used when the project has no template of its own
pub const DEFAULT_TEMPLATE: &str = r#"@font-face {
    font-family: "{{ font_name }}";
    src: url("{{ font_path }}{{ font_name }}.eot");
    src: url("{{ font_path }}{{ font_name }}.eot?#iefix") format("embedded-opentype"),
         url("{{ font_path }}{{ font_name }}.woff2") format("woff2"),
         url("{{ font_path }}{{ font_name }}.woff") format("woff"),
         url("{{ font_path }}{{ font_name }}.ttf") format("truetype"),
         url("{{ font_path }}{{ font_name }}.svg#{{ font_name }}") format("svg");
    font-weight: normal;
    font-style: normal;
}

[class^="icon-"]:before,
[class*=" icon-"]:before {
    font-family: "{{ font_name }}";
    font-style: normal;
    font-weight: normal;
    line-height: 1;
    speak: none;
    -webkit-font-smoothing: antialiased;
    -moz-osx-font-smoothing: grayscale;
}
{{#glyphs}}
.icon-{{ name }}:before { content: "\{{ codepoint }}"; }
{{/glyphs}}
"#;

/// One icon mapped to its private-use codepoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Glyph {
    pub name: String,
    pub codepoint: u32,
}

impl Glyph {
    /// Lowercase hex, as used in CSS `content` escapes
    pub fn hex(&self) -> String {
        format!("{:x}", self.codepoint)
    }
}

/// SVG files directly inside `dir`, sorted by name
pub fn scan_icons(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut icons: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("svg"))
                .unwrap_or(false)
        })
        .collect();
    icons.sort();
    Ok(icons)
}

/// Number the icons consecutively from `start`. Every codepoint must stay
/// inside the private use area.
pub fn assign_codepoints(icons: &[PathBuf], start: u32) -> Result<Vec<Glyph>, PipelineError> {
    let glyphs: Vec<Glyph> = icons
        .iter()
        .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()))
        .zip(start..)
        .map(|(name, codepoint)| Glyph {
            name: name.to_string(),
            codepoint,
        })
        .collect();

    if let Some(glyph) = glyphs
        .iter()
        .find(|glyph| !PRIVATE_USE_AREA.contains(&glyph.codepoint))
    {
        return Err(PipelineError::IconFont(format!(
            "{} icons starting at {:#X} do not fit the private use area ({} lands on {:#X})",
            glyphs.len(),
            start,
            glyph.name,
            glyph.codepoint
        )));
    }
    Ok(glyphs)
}

/// JSON object of glyph name to decimal codepoint, read by the font generator
pub fn codepoint_map_json(glyphs: &[Glyph]) -> Result<String, PipelineError> {
    let map: BTreeMap<&str, u32> = glyphs
        .iter()
        .map(|glyph| (glyph.name.as_str(), glyph.codepoint))
        .collect();
    serde_json::to_string_pretty(&map)
        .map_err(|e| PipelineError::IconFont(format!("cannot encode codepoints: {}", e)))
}

/// Render the stylesheet partial. The `{{#glyphs}}...{{/glyphs}}` block is
/// repeated once per glyph, then the font placeholders are filled in.
pub fn render_stylesheet(
    template: &str,
    font_name: &str,
    font_path: &str,
    glyphs: &[Glyph],
) -> Result<String, PipelineError> {
    let block = Regex::new(r"(?s)\{\{#glyphs\}\}\n?(.*?)\{\{/glyphs\}\}\n?")
        .map_err(|e| PipelineError::Template(e.to_string()))?;

    let expanded = block.replace_all(template, |caps: &regex::Captures| {
        let body = &caps[1];
        glyphs
            .iter()
            .map(|glyph| {
                let vars = HashMap::from([
                    ("name".to_string(), glyph.name.clone()),
                    ("codepoint".to_string(), glyph.hex()),
                ]);
                render_template(body, &vars)
            })
            .collect::<String>()
    });

    let vars = HashMap::from([
        ("font_name".to_string(), font_name.to_string()),
        ("font_path".to_string(), font_path.to_string()),
    ]);
    Ok(render_template(&expanded, &vars))
}
