use crate::controller::{CHAIN_MARKER, Editor, TRIPLES_MARKER};
use crate::view::RenderOptions;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const RC_FILE_NAME: &str = ".semicoderc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcConfig {
    pub functions: bool,
    pub builtins: bool,
    pub handle_bytes: usize,
    pub color: bool,
    pub show_whitespace: bool,
    pub labels: bool,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            functions: true,
            builtins: true,
            handle_bytes: 16,
            color: true,
            show_whitespace: false,
            labels: true,
        }
    }
}

pub struct RcLoader;

impl RcLoader {
    /// Get the path to the RC file
    /// Looks for .semicoderc in:
    /// 1. Current directory
    /// 2. Home directory (~/.semicoderc)
    pub fn get_rc_path() -> Option<PathBuf> {
        let current_rc = Path::new(RC_FILE_NAME);
        if current_rc.exists() {
            return Some(current_rc.to_path_buf());
        }

        if let Ok(home) = env::var("HOME") {
            let home_rc = Path::new(&home).join(RC_FILE_NAME);
            if home_rc.exists() {
                return Some(home_rc);
            }
        }

        None
    }

    /// Load the RC file found by [`RcLoader::get_rc_path`], or defaults.
    pub fn load_config() -> RcConfig {
        match Self::get_rc_path() {
            Some(rc_path) => Self::load_from(&rc_path),
            None => RcConfig::default(),
        }
    }

    /// Load a specific RC file. An unreadable file yields the defaults.
    pub fn load_from(path: &Path) -> RcConfig {
        let mut config = RcConfig::default();
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading rc file");
                Self::parse_config_content(&content, &mut config);
            }
            Err(err) => warn!(path = %path.display(), %err, "cannot read rc file"),
        }
        config
    }

    pub fn parse_config_content(content: &str, config: &mut RcConfig) {
        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with('"') {
                continue;
            }

            Self::parse_config_line(line, config);
        }
    }

    fn parse_config_line(line: &str, config: &mut RcConfig) {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();

        // `set name`, `set noname`, `set name=value` or plain `name = value`
        let (key, value) = if let Some(setting) = line.strip_prefix("set ") {
            let setting = setting.trim();
            match setting.split_once('=') {
                Some((key, value)) => (key.trim(), value.trim()),
                None => match setting.strip_prefix("no") {
                    Some(key) if Self::is_flag(key) => (key, "false"),
                    _ => (setting, "true"),
                },
            }
        } else if let Some((key, value)) = line.split_once('=') {
            (key.trim(), value.trim())
        } else {
            warn!(line, "unrecognized rc line");
            return;
        };

        Self::apply_setting(key, value, config);
    }

    fn is_flag(key: &str) -> bool {
        matches!(
            key,
            "functions" | "builtins" | "color" | "list" | "show_whitespace" | "labels"
        )
    }

    fn apply_setting(key: &str, value: &str, config: &mut RcConfig) {
        let flag = match key {
            "functions" => &mut config.functions,
            "builtins" => &mut config.builtins,
            "color" => &mut config.color,
            "list" | "show_whitespace" => &mut config.show_whitespace,
            "labels" => &mut config.labels,
            "handlebytes" | "handle_bytes" => {
                match value.parse::<usize>() {
                    Ok(bytes) if (1..=64).contains(&bytes) => config.handle_bytes = bytes,
                    _ => warn!(key, value, "handle payload length must be 1..=64"),
                }
                return;
            }
            _ => {
                warn!(key, "unknown rc setting");
                return;
            }
        };

        match value {
            "true" | "1" | "yes" | "on" => *flag = true,
            "false" | "0" | "no" | "off" => *flag = false,
            _ => warn!(key, value, "expected a boolean"),
        }
    }

    /// Push the editor-side settings into `editor`.
    pub fn apply_config(editor: &mut Editor, config: &RcConfig) {
        editor.set_functions_enabled(config.functions);
        if !config.builtins {
            editor.unregister_function(TRIPLES_MARKER);
            editor.unregister_function(CHAIN_MARKER);
        }
        editor.registry_mut().set_payload_len(config.handle_bytes);
    }

    pub fn render_options(config: &RcConfig) -> RenderOptions {
        RenderOptions {
            color: config.color,
            show_whitespace: config.show_whitespace,
            labels: config.labels,
        }
    }

    /// Generate a sample RC file content
    pub fn generate_sample_rc() -> String {
        r#"# semicode configuration file (.semicoderc)
# Lines starting with # or " are comments

# Reactive functions
set functions          # Recompute function targets after edits (or set nofunctions)
set builtins           # Register the triples and chain functions

# New nodes
set handlebytes=16     # Random payload length of inserted nodes (1-64)

# Display settings
set color              # Styled terminal output
set nolist             # Draw tabs and newlines as glyphs with `set list`
set labels             # Show labelled nodes by their label

# Alternative key=value syntax:
# functions=true
# handle_bytes=8
# show_whitespace=false
"#
        .to_string()
    }
}
