//! Output file naming templates.

use std::collections::BTreeMap;
use std::path::Path;

/// Template used for generated split segments.
pub const DEFAULT_SEGMENT_TEMPLATE: &str = "{basename} # {i}";

/// How many digits are needed to print every index from 1 to `count`.
///
/// ```
/// use mandolin_av::template::digits_needed;
///
/// assert_eq!(digits_needed(9), 1);
/// assert_eq!(digits_needed(10), 2);
/// assert_eq!(digits_needed(0), 1);
/// ```
pub fn digits_needed(count: usize) -> usize {
    count.max(1).to_string().len()
}

/// One-based `index` zero-padded to the width `count` needs.
pub fn padded_index(index: usize, count: usize) -> String {
    format!("{:0width$}", index, width = digits_needed(count))
}

/// Variables available to a naming template, written as `{name}`.
///
/// # Example
///
/// ```
/// use mandolin_av::TemplateVars;
/// use std::path::Path;
///
/// let vars = TemplateVars::for_source(Path::new("/films/Metropolis.mkv")).with("i", "03");
/// assert_eq!(vars.render("{basename} # {i}"), "Metropolis # 03");
/// assert_eq!(vars.render("{basename}.{extension}"), "Metropolis.mkv");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    vars: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables describing a source file:
    /// - `{basename}` - file name without extension
    /// - `{filename}` - file name with extension
    /// - `{extension}` - extension without the dot
    /// - `{dirname}` - parent directory
    pub fn for_source(src: &Path) -> Self {
        let mut vars = Self::new();
        if let Some(stem) = src.file_stem() {
            vars.set("basename", &stem.to_string_lossy());
        }
        if let Some(name) = src.file_name() {
            vars.set("filename", &name.to_string_lossy());
        }
        if let Some(ext) = src.extension() {
            vars.set("extension", &ext.to_string_lossy());
        }
        if let Some(parent) = src.parent() {
            vars.set("dirname", &parent.to_string_lossy());
        }
        vars
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Replace every known `{name}`; unknown placeholders are kept verbatim.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let key = &after[..close];
                    match self.vars.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
