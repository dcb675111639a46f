use crate::config::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const PLOT_STYLE_KINDS: &[&str] = &["line", "bar", "scatter", "heatmap", "general"];

/// House plot style sheet. A pure key-value lookup: the visualizer role asks
/// for one chart kind and gets the matching parameter set as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotStyleConfig {
    company_style: CompanyStyle,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct CompanyStyle {
    plot_types: BTreeMap<String, serde_yaml::Value>,
}

impl PlotStyleConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.company_style.plot_types.contains_key("basic") {
            return Err(ConfigError::PlotStyle(
                "company_style.plot_types must define `basic` (figsize/dpi)".to_string(),
            ));
        }
        Ok(())
    }

    /// Looks up the parameters for one chart kind. Unknown kinds come back
    /// as an error string naming the valid set; this is tool output, not a
    /// failure.
    pub fn lookup(&self, kind: &str) -> String {
        let kind = kind.trim().to_ascii_lowercase();
        let basic = self.company_style.plot_types.get("basic");

        match kind.as_str() {
            "general" => render_params(&[("basic", basic)]),
            "line" | "bar" | "scatter" | "heatmap" => {
                let params = self.company_style.plot_types.get(kind.as_str());
                render_params(&[("basic", basic), ("params", params)])
            }
            other => format!(
                "Error: Unknown chart type '{other}'. Available: line, bar, scatter, heatmap, general."
            ),
        }
    }
}

fn render_params(entries: &[(&str, Option<&serde_yaml::Value>)]) -> String {
    let mut object = serde_json::Map::new();
    for (key, value) in entries {
        let rendered = value
            .and_then(|v| serde_json::to_value(v).ok())
            .unwrap_or(serde_json::Value::Null);
        object.insert(key.to_string(), rendered);
    }
    serde_json::to_string(&serde_json::Value::Object(object))
        .unwrap_or_else(|err| format!("Error: failed to render style parameters: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlotStyleConfig {
        serde_yaml::from_str(
            r#"
company_style:
  plot_types:
    basic:
      figsize: [10, 6]
      dpi: 120
    line:
      linewidth: 2
      marker: o
"#,
        )
        .expect("parse")
    }

    #[test]
    fn lookup_returns_basic_and_kind_params() {
        let out = config().lookup("line");
        assert!(out.contains("figsize"));
        assert!(out.contains("linewidth"));
    }

    #[test]
    fn lookup_rejects_unknown_kind_as_text() {
        let out = config().lookup("sunburst");
        assert!(out.starts_with("Error: Unknown chart type 'sunburst'"));
    }
}
