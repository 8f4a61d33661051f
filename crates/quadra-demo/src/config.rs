use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Demo settings: defaults plus command-line overrides.
///
/// ```text
/// quadra-demo [--image PATH] [--shapes N] [--textures N] [--max-quads N]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    /// Image decoded into one extra texture.
    pub image: Option<PathBuf>,
    /// Grid shapes besides the two animated ones.
    pub shapes: usize,
    /// Procedural textures shared by the grid. Above the slot limit this
    /// forces slot-table flushes.
    pub textures: usize,
    pub max_quads: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            image: None,
            shapes: 2_500,
            textures: 40,
            max_quads: 1000,
        }
    }
}

impl DemoConfig {
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |name: &str| args.next().with_context(|| format!("{name} needs a value"));
            match arg.as_str() {
                "--image" => config.image = Some(PathBuf::from(value("--image")?)),
                "--shapes" => config.shapes = parse_count("--shapes", &value("--shapes")?)?,
                "--textures" => config.textures = parse_count("--textures", &value("--textures")?)?,
                "--max-quads" => config.max_quads = parse_count("--max-quads", &value("--max-quads")?)?,
                other => bail!("unknown argument {other:?}"),
            }
        }
        Ok(config)
    }
}

fn parse_count(name: &str, raw: &str) -> Result<usize> {
    raw.parse()
        .with_context(|| format!("{name}: expected a number, got {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_gives_defaults() {
        assert_eq!(DemoConfig::from_args(args(&[])).unwrap(), DemoConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let c = DemoConfig::from_args(args(&["--shapes", "10", "--image", "a.png", "--max-quads", "4"])).unwrap();
        assert_eq!(c.shapes, 10);
        assert_eq!(c.max_quads, 4);
        assert_eq!(c.image, Some(PathBuf::from("a.png")));
        assert_eq!(c.textures, DemoConfig::default().textures);
    }

    #[test]
    fn bad_input_is_an_error() {
        assert!(DemoConfig::from_args(args(&["--shapes"])).is_err());
        assert!(DemoConfig::from_args(args(&["--shapes", "many"])).is_err());
        assert!(DemoConfig::from_args(args(&["--fast"])).is_err());
    }
}
