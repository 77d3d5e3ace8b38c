//! Command rasterizer – drives an external HTML-to-PNG tool.
//!
//! The command comes from `export.rasterizer` in the project config, e.g.
//!
//! ```json
//! ["wkhtmltoimage", "--width", "{css_width}", "--zoom", "{zoom}", "{input}", "{output}"]
//! ```
//!
//! Recognised substitutions: `{input}`, `{output}`, `{width}`, `{height}`
//! (device pixels), `{css_width}`, `{css_height}` (CSS pixels) and `{zoom}`.
//! One scratch HTML/PNG pair in the output directory is reused for every
//! card and cleared by [`Rasterizer::reset`]. The tool is expected to wait
//! for embedded images and fonts before capturing.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::export::Rasterizer;
use crate::fs::{FileSystem, StdFileSystem};

const SCRATCH_STEM: &str = ".cardforge-render";

pub struct CommandRasterizer {
    program: String,
    args: Vec<String>,
    scratch_html: PathBuf,
    scratch_png: PathBuf,
}

impl CommandRasterizer {
    /// `command[0]` is the program, the rest its argument templates.
    pub fn new(command: &[String], scratch_dir: &Path) -> Result<Self, String> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| "No rasterizer command configured (export.rasterizer)".to_string())?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            scratch_html: scratch_dir.join(format!("{SCRATCH_STEM}.html")),
            scratch_png: scratch_dir.join(format!("{SCRATCH_STEM}.png")),
        })
    }

    fn expand(&self, arg: &str, width_px: u32, height_px: u32, dpi_scale: f32) -> String {
        let css_width = (width_px as f32 / dpi_scale).round() as u32;
        let css_height = (height_px as f32 / dpi_scale).round() as u32;
        arg.replace("{input}", &self.scratch_html.to_string_lossy())
            .replace("{output}", &self.scratch_png.to_string_lossy())
            .replace("{css_width}", &css_width.to_string())
            .replace("{css_height}", &css_height.to_string())
            .replace("{width}", &width_px.to_string())
            .replace("{height}", &height_px.to_string())
            .replace("{zoom}", &format!("{dpi_scale:.4}"))
    }
}

/// Wrap a card fragment in a standalone page sized to the card.
pub fn wrap_document(html: &str, width_px: u32, height_px: u32, dpi_scale: f32) -> String {
    let css_width = width_px as f32 / dpi_scale;
    let css_height = height_px as f32 / dpi_scale;
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <style>html, body {{ margin: 0; padding: 0; width: {css_width:.2}px; \
         height: {css_height:.2}px; overflow: hidden; }}</style>\n\
         </head>\n<body>\n{html}\n</body>\n</html>\n"
    )
}

impl Rasterizer for CommandRasterizer {
    fn render(
        &mut self,
        html: &str,
        width_px: u32,
        height_px: u32,
        dpi_scale: f32,
    ) -> Result<Vec<u8>, String> {
        let fs = StdFileSystem;
        let page = wrap_document(html, width_px, height_px, dpi_scale);
        fs.write_binary(&self.scratch_html, page.as_bytes())
            .map_err(|e| e.to_string())?;

        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| self.expand(a, width_px, height_px, dpi_scale))
            .collect();
        log::debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| format!("Could not run '{}': {e}", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        fs.read_binary(&self.scratch_png)
            .map_err(|e| format!("Rasterizer produced no image: {e}"))
    }

    fn reset(&mut self) {
        let fs = StdFileSystem;
        for path in [&self.scratch_html, &self.scratch_png] {
            if let Err(e) = fs.remove_file(path) {
                log::warn!("Could not clear {}: {e}", path.display());
            }
        }
    }
}
