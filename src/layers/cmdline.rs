//! Command-line value source.
//!
//! Understands the three common flag spellings: `--key=value`,
//! `--key value`, and a bare `--flag` (which yields `"true"`). Keys are
//! lowercased; a bare `--` ends flag parsing; positional arguments are
//! ignored — this source only answers "which keys did the user set".

use std::collections::BTreeMap;

use crate::error::StrataError;
use crate::layer::LayerIdentity;
use crate::layers::{SourceEntry, ValueSource};

pub struct CmdlineSource {
    args: Vec<String>,
}

impl CmdlineSource {
    /// Snapshot `std::env::args()` (without the program name).
    pub fn new() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    /// Use the given arguments instead of the process arguments.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        CmdlineSource {
            args: args.into_iter().collect(),
        }
    }
}

impl Default for CmdlineSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueSource for CmdlineSource {
    fn name(&self) -> String {
        "cmdline".to_string()
    }

    fn identity(&self) -> LayerIdentity {
        LayerIdentity::Cmdline
    }

    fn entries(&self) -> Result<BTreeMap<String, SourceEntry>, StrataError> {
        let mut out = BTreeMap::new();
        let mut i = 0;

        while i < self.args.len() {
            let arg = &self.args[i];
            i += 1;

            let Some(flag) = arg.strip_prefix("--") else {
                continue;
            };
            if flag.is_empty() {
                // "--" terminates flag parsing
                break;
            }

            let (raw_key, value) = match flag.split_once('=') {
                Some((k, v)) => (k, v.to_string()),
                None => {
                    if let Some(next) = self.args.get(i)
                        && !next.starts_with("--")
                    {
                        i += 1;
                        (flag, next.clone())
                    } else {
                        (flag, "true".to_string())
                    }
                }
            };

            out.insert(
                raw_key.to_lowercase(),
                SourceEntry {
                    value,
                    external_key: format!("--{raw_key}"),
                    location: format!("cmdline[--{raw_key}]"),
                },
            );
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(args: &[&str]) -> BTreeMap<String, SourceEntry> {
        CmdlineSource::from_args(args.iter().map(|a| a.to_string()))
            .entries()
            .unwrap()
    }

    #[test]
    fn equals_form() {
        let map = entries(&["--host=0.0.0.0"]);
        assert_eq!(map["host"].value, "0.0.0.0");
        assert_eq!(map["host"].location, "cmdline[--host]");
    }

    #[test]
    fn space_form() {
        let map = entries(&["--port", "8080"]);
        assert_eq!(map["port"].value, "8080");
    }

    #[test]
    fn bare_flag_is_true() {
        let map = entries(&["--debug", "--host=x"]);
        assert_eq!(map["debug"].value, "true");
        assert_eq!(map["host"].value, "x");
    }

    #[test]
    fn trailing_bare_flag_is_true() {
        let map = entries(&["--debug"]);
        assert_eq!(map["debug"].value, "true");
    }

    #[test]
    fn nested_key_spelling() {
        let map = entries(&["--database-pool_size=20"]);
        assert_eq!(map["database-pool_size"].value, "20");
    }

    #[test]
    fn keys_lowercased() {
        let map = entries(&["--HOST=x"]);
        assert_eq!(map["host"].external_key, "--HOST");
    }

    #[test]
    fn double_dash_ends_parsing() {
        let map = entries(&["--host=x", "--", "--port=1"]);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("host"));
    }

    #[test]
    fn positional_args_ignored() {
        let map = entries(&["input.txt", "--host=x"]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn later_occurrence_wins() {
        let map = entries(&["--host=a", "--host=b"]);
        assert_eq!(map["host"].value, "b");
    }
}
